//! Request and result types for extraction

use crate::error::ExtractorError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One strategy of the extraction cascade, in cascade order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Parse the raw text verbatim
    Direct,
    /// Strip fences, preambles and commentary
    Cleanup,
    /// First `{` to last `}` of mixed prose and data
    MixedContent,
    /// Syntactic repair of near-JSON
    Heuristic,
    /// Repair through the generation client
    Escalated,
    /// Caller-supplied default
    Fallback,
}

impl Strategy {
    /// Every strategy in cascade order
    pub const ALL: [Strategy; 6] = [
        Strategy::Direct,
        Strategy::Cleanup,
        Strategy::MixedContent,
        Strategy::Heuristic,
        Strategy::Escalated,
        Strategy::Fallback,
    ];

    /// Stable name for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Direct => "direct",
            Strategy::Cleanup => "cleanup",
            Strategy::MixedContent => "mixed_content",
            Strategy::Heuristic => "heuristic",
            Strategy::Escalated => "escalated",
            Strategy::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single strategy
#[derive(Debug, Clone, PartialEq)]
pub struct ParseAttempt {
    /// Strategy tried
    pub strategy: Strategy,
    /// Whether it produced a valid value
    pub success: bool,
    /// Transformed text the strategy parsed, if it changed anything
    pub cleaned: Option<String>,
    /// Why it failed
    pub error: Option<String>,
}

impl ParseAttempt {
    pub(crate) fn succeeded(strategy: Strategy, cleaned: Option<String>) -> Self {
        Self {
            strategy,
            success: true,
            cleaned,
            error: None,
        }
    }

    pub(crate) fn failed(
        strategy: Strategy,
        cleaned: Option<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            strategy,
            success: false,
            cleaned,
            error: Some(error.into()),
        }
    }
}

/// Final result of the cascade
///
/// `success == true` always means `value` passed required-field validation,
/// whether it was parsed or substituted from the fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    /// Whether a valid value was produced
    pub success: bool,
    /// The validated value
    pub value: Option<Value>,
    /// Original input
    pub raw: String,
    /// Text that finally parsed, when it differs from `raw`
    pub cleaned: Option<String>,
    /// Summary of the failure
    pub error: Option<String>,
    /// Strategy that produced `value`
    pub strategy: Option<Strategy>,
    /// `value` is the caller's fallback, not parsed content
    pub used_fallback: bool,
    /// Every strategy tried, in order
    pub attempts: Vec<ParseAttempt>,
}

impl ParseResult {
    /// Success that required no fallback
    pub fn is_parsed(&self) -> bool {
        self.success && !self.used_fallback
    }

    /// Success only through fallback substitution
    pub fn is_degraded(&self) -> bool {
        self.success && self.used_fallback
    }

    /// Decode the validated value into a typed payload
    pub fn into_typed<T: DeserializeOwned>(&self) -> Result<T, ExtractorError> {
        let value = self.value.as_ref().ok_or_else(|| {
            ExtractorError::NoValue(self.error.clone().unwrap_or_else(|| "no value".to_string()))
        })?;
        Ok(T::deserialize(value)?)
    }

    /// One line per attempt, for operational logs
    pub fn diagnostics(&self) -> String {
        self.attempts
            .iter()
            .map(|a| match &a.error {
                Some(e) => format!("{}: {}", a.strategy, e),
                None => format!("{}: ok", a.strategy),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Shape hint for schema repair
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaHint {
    /// Expected top-level keys
    Keys(Vec<String>),
    /// An example object of the target shape
    Example(Value),
}

impl SchemaHint {
    /// Hint listing the expected top-level keys
    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SchemaHint::Keys(keys.into_iter().map(Into::into).collect())
    }
}

/// What the caller needs from one extraction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionSpec {
    /// Dotted paths that must be present
    pub required_fields: Vec<String>,
    /// Default returned when every strategy fails
    pub fallback: Option<Value>,
    /// Shape hint; selects schema repair when escalating
    pub schema_hint: Option<SchemaHint>,
    /// Short description of what the text should contain
    pub context: Option<String>,
}

impl ExtractionSpec {
    /// Spec requiring the given dotted paths
    pub fn new<I, S>(required_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required_fields: required_fields.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Attach a fallback value
    pub fn with_fallback(mut self, fallback: Value) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Attach a schema hint
    pub fn with_schema_hint(mut self, hint: SchemaHint) -> Self {
        self.schema_hint = Some(hint);
        self
    }

    /// Attach a context description for repair prompts
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}
