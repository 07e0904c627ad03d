//! Ollama Provider Implementation
//!
//! Integration with Ollama's local chat API. Useful for the fast structuring
//! calls and for running the whole pipeline offline.
//!
//! # Features
//!
//! - Async HTTP communication with the Ollama chat endpoint
//! - Configurable endpoint and model
//! - Retry logic with exponential backoff
//! - Timeout handling
//!
//! Ollama cannot search the web, so research-mode requests are answered in
//! fast mode and carry no sources.
//!
//! # Examples
//!
//! ```no_run
//! use sparkmill_llm::OllamaProvider;
//!
//! let provider = OllamaProvider::new("http://localhost:11434", "llama3.1").unwrap();
//! ```

use crate::backoff::{classify_send_error, with_backoff};
use crate::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sparkmill_domain::traits::GenerationClient;
use sparkmill_domain::{FinishReason, GenerationMode, GenerationRequest, GenerationResponse, Usage};
use std::time::Duration;

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default timeout for LLM requests (120 seconds; local models are slow)
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default number of retry attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Ollama API provider for local LLM inference
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: reqwest::Client,
    timeout_secs: u64,
    max_retries: u32,
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Request body for the Ollama chat API
#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Deserialize)]
struct OllamaChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Response from the Ollama chat API
#[derive(Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<OllamaChatMessage>,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: Model to use (e.g., "llama3.1", "mistral")
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Self::with_timeout(endpoint, model, DEFAULT_TIMEOUT_SECS)
    }

    /// Create a provider with a custom request timeout
    pub fn with_timeout(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
            timeout_secs,
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Create a new Ollama provider on `http://localhost:11434`
    pub fn default_endpoint(model: impl Into<String>) -> Result<Self, LlmError> {
        Self::new(DEFAULT_ENDPOINT, model)
    }

    /// Set the maximum number of retry attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    async fn send_once(&self, request: &GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let url = format!("{}/api/chat", self.endpoint);

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system_instruction.as_deref() {
            messages.push(OllamaMessage { role: "system", content: system });
        }
        messages.push(OllamaMessage { role: "user", content: &request.prompt });

        let body = OllamaChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: OllamaOptions {
                temperature: request.sampling.temperature,
                num_predict: request.sampling.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_send_error(e, self.timeout_secs))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LlmError::ModelNotAvailable(self.model.clone()));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimitExceeded);
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::Communication(format!("HTTP {}: {}", status, error_text)));
        }

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        Ok(into_generation_response(parsed))
    }
}

fn into_generation_response(parsed: OllamaChatResponse) -> GenerationResponse {
    let finish_reason = match parsed.done_reason.as_deref() {
        None | Some("stop") => FinishReason::Stop,
        Some("length") => FinishReason::Length,
        Some(_) => FinishReason::Other,
    };

    GenerationResponse {
        text: parsed.message.and_then(|m| m.content),
        finish_reason,
        usage: Usage {
            prompt_tokens: parsed.prompt_eval_count.unwrap_or(0),
            completion_tokens: parsed.eval_count.unwrap_or(0),
        },
        sources: Vec::new(),
    }
}

#[async_trait]
impl GenerationClient for OllamaProvider {
    type Error = LlmError;

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, LlmError> {
        if request.sampling.mode == GenerationMode::Research {
            tracing::debug!("Ollama has no search grounding; answering research request in fast mode");
        }
        with_backoff(self.max_retries, move || self.send_once(request)).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
