//! Provider selection and configuration

use crate::{GeminiProvider, LlmError, MockProvider, OllamaProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sparkmill_domain::traits::GenerationClient;
use sparkmill_domain::{GenerationRequest, GenerationResponse};

/// Which backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Deterministic mock; answers every prompt with `{}`
    Mock,
    /// Local Ollama server
    Ollama,
    /// Gemini API
    #[default]
    Gemini,
}

/// Configuration for the generation client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Backend
    #[serde(default)]
    pub provider: ProviderKind,

    /// Endpoint override; each provider has its own default
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per request for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Upper bound for `max_retries`
pub const MAX_RETRIES_LIMIT: u32 = 10;

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    90
}

fn default_max_retries() -> u32 {
    3
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            endpoint: None,
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl LlmConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("model must not be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        if self.max_retries == 0 {
            return Err("max_retries must be greater than 0".to_string());
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(format!("max_retries must be at most {}", MAX_RETRIES_LIMIT));
        }
        Ok(())
    }

    /// Build the configured provider
    pub fn build(&self) -> Result<AnyProvider, LlmError> {
        self.validate().map_err(LlmError::Config)?;

        match self.provider {
            ProviderKind::Mock => Ok(AnyProvider::Mock(MockProvider::new("{}"))),
            ProviderKind::Ollama => {
                let endpoint = self
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| crate::ollama::DEFAULT_ENDPOINT.to_string());
                let provider = OllamaProvider::with_timeout(endpoint, &self.model, self.timeout_secs)?
                    .with_max_retries(self.max_retries);
                Ok(AnyProvider::Ollama(provider))
            }
            ProviderKind::Gemini => {
                let api_key = std::env::var(&self.api_key_env).map_err(|_| {
                    LlmError::Config(format!("Environment variable {} is not set", self.api_key_env))
                })?;
                let endpoint = self
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| crate::gemini::DEFAULT_ENDPOINT.to_string());
                let provider =
                    GeminiProvider::with_endpoint(endpoint, &self.model, api_key, self.timeout_secs)?
                        .with_max_retries(self.max_retries);
                Ok(AnyProvider::Gemini(provider))
            }
        }
    }
}

/// A provider chosen at runtime from configuration
pub enum AnyProvider {
    /// Mock backend
    Mock(MockProvider),
    /// Ollama backend
    Ollama(OllamaProvider),
    /// Gemini backend
    Gemini(GeminiProvider),
}

#[async_trait]
impl GenerationClient for AnyProvider {
    type Error = LlmError;

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, LlmError> {
        match self {
            AnyProvider::Mock(p) => p.generate(request).await,
            AnyProvider::Ollama(p) => p.generate(request).await,
            AnyProvider::Gemini(p) => p.generate(request).await,
        }
    }

    fn model_name(&self) -> &str {
        match self {
            AnyProvider::Mock(p) => p.model_name(),
            AnyProvider::Ollama(p) => p.model_name(),
            AnyProvider::Gemini(p) => p.model_name(),
        }
    }
}
