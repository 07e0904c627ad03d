//! Request and response shapes at the generation client boundary

use serde::{Deserialize, Serialize};

/// How the generation client should answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// Cheap, fast structuring calls
    #[default]
    Fast,

    /// Slower, internet-grounded calls that also return citations
    Research,
}

/// Sampling configuration for a single call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Creativity, usually 0.0 - 1.0
    pub temperature: f32,

    /// Upper bound on generated tokens
    pub max_output_tokens: u32,

    /// Fast or research mode
    #[serde(default)]
    pub mode: GenerationMode,
}

impl SamplingConfig {
    /// Fast-mode configuration
    pub fn fast(temperature: f32, max_output_tokens: u32) -> Self {
        Self {
            temperature,
            max_output_tokens,
            mode: GenerationMode::Fast,
        }
    }

    /// Research-mode configuration
    pub fn research(temperature: f32, max_output_tokens: u32) -> Self {
        Self {
            temperature,
            max_output_tokens,
            mode: GenerationMode::Research,
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self::fast(0.7, 2048)
    }
}

/// A single call to the generation client
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// User prompt
    pub prompt: String,

    /// System instruction, if any
    pub system_instruction: Option<String>,

    /// Sampling settings
    pub sampling: SamplingConfig,
}

impl GenerationRequest {
    /// Create a request with default sampling and no system instruction
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_instruction: None,
            sampling: SamplingConfig::default(),
        }
    }

    /// Attach a system instruction
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Replace the sampling configuration
    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }
}

/// Why the generator stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of output
    #[default]
    Stop,

    /// Hit the output token limit; text may be truncated
    Length,

    /// Blocked by a content filter
    Safety,

    /// Anything the provider reports that we do not model
    Other,
}

/// Token accounting for a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt
    pub prompt_tokens: u32,

    /// Tokens produced
    pub completion_tokens: u32,
}

impl Usage {
    /// Prompt plus completion tokens
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// A citation returned by a research-mode call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    /// Page title
    pub title: String,

    /// Link to the page
    pub uri: String,
}

/// Raw result of a generation call
///
/// `text` is `None` when the client produced no response at all, and
/// `Some("")` when it responded with empty content. Callers treat both as
/// generation failure but log them differently.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerationResponse {
    /// Generated text
    pub text: Option<String>,

    /// Why generation stopped
    pub finish_reason: FinishReason,

    /// Token accounting
    pub usage: Usage,

    /// Citations (research mode only)
    pub sources: Vec<Source>,
}

impl GenerationResponse {
    /// A response carrying text and nothing else
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// A response with no text at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// Text if present and not blank
    pub fn usable_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}
