//! Gemini Provider Implementation
//!
//! Talks to the Gemini `generateContent` REST API. Research-mode requests
//! enable the Google Search tool and surface the grounding chunks as
//! [`Source`] citations.

use crate::backoff::{classify_send_error, with_backoff};
use crate::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sparkmill_domain::traits::GenerationClient;
use sparkmill_domain::{
    FinishReason, GenerationMode, GenerationRequest, GenerationResponse, Source, Usage,
};
use std::time::Duration;

/// Public Gemini API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Default timeout; grounded calls routinely take tens of seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 90;

/// Default number of retry attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Gemini API provider
pub struct GeminiProvider {
    endpoint: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
    timeout_secs: u64,
    max_retries: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize, Default)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct WebChunk {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebChunk>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

impl GeminiProvider {
    /// Create a provider against the public endpoint
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Result<Self, LlmError> {
        Self::with_endpoint(DEFAULT_ENDPOINT, model, api_key, DEFAULT_TIMEOUT_SECS)
    }

    /// Create a provider against a custom endpoint (proxies, tests)
    pub fn with_endpoint(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::Config("Gemini API key is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            client,
            timeout_secs,
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Set the maximum number of retry attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn build_body(request: &GenerationRequest) -> serde_json::Value {
        let mut body = json!({
            "contents": [{"role": "user", "parts": [{"text": request.prompt}]}],
            "generationConfig": GenerationConfig {
                temperature: request.sampling.temperature,
                max_output_tokens: request.sampling.max_output_tokens,
            },
        });

        if let Some(system) = request.system_instruction.as_deref() {
            body["systemInstruction"] = json!({"parts": [{"text": system}]});
        }
        if request.sampling.mode == GenerationMode::Research {
            body["tools"] = json!([{"googleSearch": {}}]);
        }
        body
    }

    async fn send_once(&self, request: &GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::build_body(request))
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

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        Ok(into_generation_response(parsed))
    }
}

fn into_generation_response(parsed: GenerateContentResponse) -> GenerationResponse {
    let usage = parsed
        .usage_metadata
        .map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
        })
        .unwrap_or_default();

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        return GenerationResponse {
            usage,
            ..Default::default()
        };
    };

    let finish_reason = match candidate.finish_reason.as_deref() {
        None | Some("STOP") => FinishReason::Stop,
        Some("MAX_TOKENS") => FinishReason::Length,
        Some("SAFETY") | Some("BLOCKLIST") | Some("PROHIBITED_CONTENT") => FinishReason::Safety,
        Some(_) => FinishReason::Other,
    };

    let text = candidate.content.and_then(|content| {
        let pieces: Vec<String> = content.parts.into_iter().filter_map(|p| p.text).collect();
        if pieces.is_empty() {
            None
        } else {
            Some(pieces.concat())
        }
    });

    let mut sources: Vec<Source> = Vec::new();
    for chunk in candidate
        .grounding_metadata
        .map(|g| g.grounding_chunks)
        .unwrap_or_default()
    {
        if let Some(WebChunk { uri: Some(uri), title }) = chunk.web {
            if !sources.iter().any(|s| s.uri == uri) {
                sources.push(Source {
                    title: title.unwrap_or_else(|| uri.clone()),
                    uri,
                });
            }
        }
    }

    GenerationResponse {
        text,
        finish_reason,
        usage,
        sources,
    }
}

#[async_trait]
impl GenerationClient for GeminiProvider {
    type Error = LlmError;

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, LlmError> {
        with_backoff(self.max_retries, move || self.send_once(request)).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
