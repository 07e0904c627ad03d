//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pipeline error
    #[error(transparent)]
    Pipeline(#[from] sparkmill_pipeline::PipelineError),

    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] sparkmill_store::StoreError),

    /// Generation provider error
    #[error("Provider error: {0}")]
    Llm(#[from] sparkmill_llm::LlmError),

    /// Extractor error
    #[error("Extractor error: {0}")]
    Extractor(#[from] sparkmill_extractor::ExtractorError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No job with this id
    #[error("Job not found: {0}")]
    JobNotFound(String),
}
