//! Error types for the Extractor

use thiserror::Error;

/// Errors raised by the extractor outside the cascade itself
///
/// Cascade outcomes are values ([`ParseResult`](crate::ParseResult)); these
/// cover configuration and typed decoding.
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The cascade produced no value
    #[error("No value extracted: {0}")]
    NoValue(String),

    /// Value parsed but does not match the target type
    #[error("Typed decode failed: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::Decode(e.to_string())
    }
}

/// Errors from the repair escalator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepairError {
    /// The generation call itself failed
    #[error("Repair generation failed: {0}")]
    Generation(String),

    /// The client answered without any text
    #[error("Repair call returned no response")]
    NoResponse,

    /// The client answered with blank text
    #[error("Repair call returned empty content")]
    EmptyResponse,

    /// Repaired text still does not parse
    #[error("Repaired text is not valid JSON: {0}")]
    Unparseable(String),

    /// The repair call exceeded its deadline
    #[error("Repair call timed out after {0}s")]
    Timeout(u64),

    /// Input exceeds the configured repair limit
    #[error("Input too long for repair: {0} chars (max: {1})")]
    InputTooLong(usize, usize),
}
