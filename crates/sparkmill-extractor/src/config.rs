//! Configuration for the Extractor and the repair escalator

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the extraction cascade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Longest candidate (characters) handed to escalated repair
    pub max_input_chars: usize,

    /// Run the heuristic repair strategy
    pub enable_heuristic_repair: bool,

    /// Run the escalated (network) repair strategy when a repairer is attached
    pub enable_escalated_repair: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_input_chars: 20_000,
            enable_heuristic_repair: true,
            enable_escalated_repair: true,
        }
    }
}

impl ExtractorConfig {
    /// Offline preset: every syntactic strategy, never a network call
    pub fn offline() -> Self {
        Self {
            enable_escalated_repair: false,
            ..Self::default()
        }
    }

    /// Strict preset: only parse, cleanup and span extraction
    pub fn strict() -> Self {
        Self {
            max_input_chars: 20_000,
            enable_heuristic_repair: false,
            enable_escalated_repair: false,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_input_chars == 0 {
            return Err("max_input_chars must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

/// Sampling and deadline for repair calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Repair is a structuring task; keep this low
    pub temperature: f32,

    /// Upper bound on the repaired output
    pub max_output_tokens: u32,

    /// Deadline for one repair call (seconds)
    pub timeout_secs: u64,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_output_tokens: 4096,
            timeout_secs: 60,
        }
    }
}

impl RepairConfig {
    /// Get the repair timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            ));
        }
        if self.max_output_tokens == 0 {
            return Err("max_output_tokens must be greater than 0".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}
