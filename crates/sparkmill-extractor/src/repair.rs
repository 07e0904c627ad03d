//! Escalated repair through the generation client
//!
//! The only extraction strategy that performs a network call. One call per
//! invocation; retrying is the caller's business.

use crate::cleanup::{braced_span, clean_markdown};
use crate::config::RepairConfig;
use crate::error::RepairError;
use crate::prompt::{repair_request, RepairMode};
use crate::types::SchemaHint;
use async_trait::async_trait;
use serde_json::Value;
use sparkmill_domain::traits::GenerationClient;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Successfully repaired output
#[derive(Debug, Clone, PartialEq)]
pub struct Repaired {
    /// Cleaned text that parsed
    pub text: String,
    /// Parsed value (not yet validated against required fields)
    pub value: Value,
    /// Which prompt produced it
    pub mode: RepairMode,
}

/// Seam between the cascade and whatever performs escalated repair
#[async_trait]
pub trait Repairer: Send + Sync {
    /// Turn malformed text into parseable JSON
    async fn repair(
        &self,
        malformed: &str,
        context: Option<&str>,
        hint: Option<&SchemaHint>,
    ) -> Result<Repaired, RepairError>;
}

/// [`Repairer`] backed by a generation client
pub struct RepairEscalator<G> {
    client: G,
    config: RepairConfig,
}

impl<G: GenerationClient> RepairEscalator<G> {
    /// Create an escalator over `client`
    pub fn new(client: G, config: RepairConfig) -> Self {
        Self { client, config }
    }

    /// Repair configuration
    pub fn config(&self) -> &RepairConfig {
        &self.config
    }
}

/// Run repaired output through the same cleanup as the cascade and parse it
pub(crate) fn parse_repaired(text: &str) -> Result<(String, Value), RepairError> {
    let cleaned = clean_markdown(text);
    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Ok((cleaned, value));
    }
    let span = braced_span(&cleaned).ok_or_else(|| {
        RepairError::Unparseable("no JSON object in repaired output".to_string())
    })?;
    serde_json::from_str::<Value>(span)
        .map(|value| (span.to_string(), value))
        .map_err(|e| RepairError::Unparseable(e.to_string()))
}

#[async_trait]
impl<G: GenerationClient> Repairer for RepairEscalator<G> {
    async fn repair(
        &self,
        malformed: &str,
        context: Option<&str>,
        hint: Option<&SchemaHint>,
    ) -> Result<Repaired, RepairError> {
        let mode = RepairMode::select(hint);
        let request = repair_request(mode, malformed, context, hint, &self.config);

        debug!(
            "Escalating to {:?} repair via {} ({} chars)",
            mode,
            self.client.model_name(),
            malformed.len()
        );

        let response = timeout(self.config.timeout(), self.client.generate(&request))
            .await
            .map_err(|_| RepairError::Timeout(self.config.timeout_secs))?
            .map_err(|e| RepairError::Generation(e.to_string()))?;

        let text = match response.text {
            None => return Err(RepairError::NoResponse),
            Some(text) if text.trim().is_empty() => return Err(RepairError::EmptyResponse),
            Some(text) => text,
        };

        match parse_repaired(&text) {
            Ok((text, value)) => Ok(Repaired { text, value, mode }),
            Err(e) => {
                warn!("Repair output did not parse: {}", e);
                Err(e)
            }
        }
    }
}
