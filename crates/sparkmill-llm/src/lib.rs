//! Sparkmill LLM Provider Layer
//!
//! Implementations of the `GenerationClient` trait from `sparkmill-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic, scriptable mock for testing
//! - `OllamaProvider`: Local Ollama chat API (fast mode only)
//! - `GeminiProvider`: Gemini API with search grounding for research mode
//!
//! # Examples
//!
//! ```
//! use sparkmill_llm::MockProvider;
//! use sparkmill_domain::traits::GenerationClient;
//! use sparkmill_domain::GenerationRequest;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let provider = MockProvider::new("Hello from LLM!");
//! let response = provider.generate(&GenerationRequest::new("test prompt")).await.unwrap();
//! assert_eq!(response.text.as_deref(), Some("Hello from LLM!"));
//! # }
//! ```

#![warn(missing_docs)]

mod backoff;
pub mod config;
pub mod gemini;
pub mod ollama;

use async_trait::async_trait;
use sparkmill_domain::traits::GenerationClient;
use sparkmill_domain::{GenerationRequest, GenerationResponse, Source};
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use config::{AnyProvider, LlmConfig, ProviderKind, MAX_RETRIES_LIMIT};
pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Request took longer than the configured timeout
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// Provider misconfigured (missing key, bad endpoint)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl LlmError {
    /// Whether retrying the same request could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::Communication(_) | LlmError::RateLimitExceeded | LlmError::Timeout(_)
        )
    }
}

#[derive(Debug, Clone)]
enum MockReply {
    Text(String, Vec<Source>),
    NoResponse,
    Error,
}

/// Mock LLM provider for deterministic testing
///
/// Replies are chosen by the first registered pattern that occurs in the
/// request's system instruction or prompt; otherwise the default response is
/// returned. Every request is recorded so tests can assert on prompts.
///
/// # Examples
///
/// ```
/// use sparkmill_llm::MockProvider;
///
/// let mut provider = MockProvider::default();
/// provider.add_response("Task: trend_research", r#"{"summary": "..."}"#);
/// provider.add_no_response("Task: critique");
/// assert_eq!(provider.call_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: Option<String>,
    replies: Arc<Mutex<Vec<(String, MockReply)>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl MockProvider {
    /// Create a MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: Some(response.into()),
            replies: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a MockProvider that answers unmatched prompts with no text
    pub fn silent() -> Self {
        Self {
            default_response: None,
            ..Self::new("")
        }
    }

    fn push(&self, pattern: String, reply: MockReply) {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((pattern, reply));
    }

    /// Reply with `response` when `pattern` occurs in the request
    pub fn add_response(&mut self, pattern: impl Into<String>, response: impl Into<String>) {
        self.push(pattern.into(), MockReply::Text(response.into(), Vec::new()));
    }

    /// Reply with `response` and research citations
    pub fn add_research_response(
        &mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
        sources: Vec<Source>,
    ) {
        self.push(pattern.into(), MockReply::Text(response.into(), sources));
    }

    /// Answer without any text when `pattern` occurs
    pub fn add_no_response(&mut self, pattern: impl Into<String>) {
        self.push(pattern.into(), MockReply::NoResponse);
    }

    /// Fail the call when `pattern` occurs
    pub fn add_error(&mut self, pattern: impl Into<String>) {
        self.push(pattern.into(), MockReply::Error);
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Number of recorded calls whose prompt contained `pattern`
    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| r.prompt.contains(pattern))
            .count()
    }

    /// Snapshot of every request received so far
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Reset the call log
    pub fn reset_call_count(&self) {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn reply_for(&self, request: &GenerationRequest) -> Option<MockReply> {
        let haystack = format!(
            "{}\n{}",
            request.system_instruction.as_deref().unwrap_or(""),
            request.prompt
        );
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|(pattern, _)| haystack.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl GenerationClient for MockProvider {
    type Error = LlmError;

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        match self.reply_for(request) {
            Some(MockReply::Text(text, sources)) => Ok(GenerationResponse {
                text: Some(text),
                sources,
                ..Default::default()
            }),
            Some(MockReply::NoResponse) => Ok(GenerationResponse::empty()),
            Some(MockReply::Error) => Err(LlmError::Other("Mock error".to_string())),
            None => Ok(GenerationResponse {
                text: self.default_response.clone(),
                ..Default::default()
            }),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(prompt: &str) -> GenerationRequest {
        GenerationRequest::new(prompt)
    }

    #[tokio::test]
    async fn test_mock_provider_default() {
        let provider = MockProvider::new("Test response");
        let result = provider.generate(&req("any prompt")).await.unwrap();
        assert_eq!(result.text.as_deref(), Some("Test response"));
    }

    #[tokio::test]
    async fn test_mock_provider_pattern_responses() {
        let mut provider = MockProvider::default();
        provider.add_response("hello", "world");
        provider.add_response("foo", "bar");

        let a = provider.generate(&req("say hello please")).await.unwrap();
        let b = provider.generate(&req("foo")).await.unwrap();
        let c = provider.generate(&req("unknown")).await.unwrap();
        assert_eq!(a.text.as_deref(), Some("world"));
        assert_eq!(b.text.as_deref(), Some("bar"));
        assert_eq!(c.text.as_deref(), Some("Default mock response"));
    }

    #[tokio::test]
    async fn test_mock_provider_matches_system_instruction() {
        let mut provider = MockProvider::default();
        provider.add_response("You repair JSON", "{}");
        let request = req("broken").with_system_instruction("You repair JSON.");
        let result = provider.generate(&request).await.unwrap();
        assert_eq!(result.text.as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_mock_provider_call_count() {
        let provider = MockProvider::new("test");
        assert_eq!(provider.call_count(), 0);

        provider.generate(&req("prompt1")).await.unwrap();
        provider.generate(&req("prompt2")).await.unwrap();
        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.calls_matching("prompt1"), 1);

        provider.reset_call_count();
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_provider_error_and_silence() {
        let mut provider = MockProvider::default();
        provider.add_error("bad prompt");
        provider.add_no_response("quiet prompt");

        let err = provider.generate(&req("bad prompt")).await;
        assert!(matches!(err, Err(LlmError::Other(_))));

        let silent = provider.generate(&req("quiet prompt")).await.unwrap();
        assert!(silent.text.is_none());

        let fully_silent = MockProvider::silent();
        assert!(fully_silent.generate(&req("x")).await.unwrap().text.is_none());
    }

    #[tokio::test]
    async fn test_mock_provider_clone_shares_log() {
        let provider1 = MockProvider::new("test");
        let provider2 = provider1.clone();

        provider1.generate(&req("test")).await.unwrap();
        assert_eq!(provider1.call_count(), 1);
        assert_eq!(provider2.call_count(), 1);
    }

    #[tokio::test]
    async fn test_research_response_carries_sources() {
        let mut provider = MockProvider::default();
        provider.add_research_response(
            "trends",
            "{}",
            vec![Source { title: "Report".into(), uri: "https://example.com".into() }],
        );
        let result = provider.generate(&req("trends")).await.unwrap();
        assert_eq!(result.sources.len(), 1);
    }

    #[test]
    fn test_retryable_errors() {
        assert!(LlmError::Timeout(30).is_retryable());
        assert!(LlmError::RateLimitExceeded.is_retryable());
        assert!(!LlmError::ModelNotAvailable("x".into()).is_retryable());
        assert!(!LlmError::Config("x".into()).is_retryable());
    }
}
