//! Configuration for pipeline runs and batches

use serde::{Deserialize, Serialize};
use sparkmill_domain::SamplingConfig;
use sparkmill_extractor::{ExtractorConfig, RepairConfig};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the orchestrator and batch triggers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Deadline for one generation call inside a stage (seconds)
    pub stage_timeout_secs: u64,

    /// Attempts per stage before the fatal/advisory policy applies
    pub stage_attempts: u32,

    /// Runs per scheduled batch, one job each
    pub scheduled_batch_size: usize,

    /// Runs per on-demand batch, sharing one job
    pub on_demand_batch_size: usize,

    /// Pause between consecutive runs of a batch (seconds)
    pub inter_run_delay_secs: u64,

    /// Ceiling for the pause after failed runs (seconds)
    pub max_backoff_secs: u64,

    /// Recent titles fed to synthesis as "do not repeat"
    pub previous_titles_limit: usize,

    /// How long loaded prompts stay fresh (seconds)
    pub prompt_cache_ttl_secs: u64,

    /// TOML file with per-stage system instructions
    pub prompts_path: Option<PathBuf>,

    /// Substitute stage fallbacks when generation or extraction fails
    pub use_stage_fallbacks: bool,

    /// Sampling overrides keyed by stage name
    pub sampling: HashMap<String, SamplingConfig>,

    /// Extraction cascade settings
    pub extractor: ExtractorConfig,

    /// Escalated repair settings
    pub repair: RepairConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_timeout_secs: 120,
            stage_attempts: 1,
            scheduled_batch_size: 4,
            on_demand_batch_size: 3,
            inter_run_delay_secs: 5,
            max_backoff_secs: 60,
            previous_titles_limit: 20,
            prompt_cache_ttl_secs: 300,
            prompts_path: None,
            use_stage_fallbacks: true,
            sampling: HashMap::new(),
            extractor: ExtractorConfig::default(),
            repair: RepairConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Test preset: no delays, no fallbacks hidden behind long timeouts
    pub fn fast() -> Self {
        Self {
            stage_timeout_secs: 10,
            inter_run_delay_secs: 0,
            max_backoff_secs: 0,
            prompt_cache_ttl_secs: 1,
            ..Self::default()
        }
    }

    /// Get the stage timeout as a Duration
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }

    /// Get the inter-run delay as a Duration
    pub fn inter_run_delay(&self) -> Duration {
        Duration::from_secs(self.inter_run_delay_secs)
    }

    /// Get the backoff ceiling as a Duration
    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }

    /// Get the prompt cache TTL as a Duration
    pub fn prompt_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.prompt_cache_ttl_secs)
    }

    /// Sampling for `stage`, falling back to the stage's own default
    pub fn sampling_for(&self, stage: &str, default: &SamplingConfig) -> SamplingConfig {
        self.sampling.get(stage).cloned().unwrap_or_else(|| default.clone())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.stage_timeout_secs == 0 {
            return Err("stage_timeout_secs must be greater than 0".to_string());
        }
        if self.stage_attempts == 0 {
            return Err("stage_attempts must be greater than 0".to_string());
        }
        if self.scheduled_batch_size == 0 || self.on_demand_batch_size == 0 {
            return Err("batch sizes must be greater than 0".to_string());
        }
        if self.max_backoff_secs < self.inter_run_delay_secs {
            return Err("max_backoff_secs cannot be less than inter_run_delay_secs".to_string());
        }
        for (stage, sampling) in &self.sampling {
            if sampling.max_output_tokens == 0 {
                return Err(format!("sampling.{}.max_output_tokens must be greater than 0", stage));
            }
        }
        self.extractor.validate()?;
        self.repair.validate()?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use sparkmill_domain::GenerationMode;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scheduled_batch_size, 4);
        assert_eq!(config.on_demand_batch_size, 3);
        assert_eq!(config.stage_attempts, 1);
    }

    #[test]
    fn test_fast_config_is_valid() {
        assert!(PipelineConfig::fast().validate().is_ok());
    }

    #[test]
    fn test_backoff_below_delay_rejected() {
        let config = PipelineConfig {
            inter_run_delay_secs: 10,
            max_backoff_secs: 5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nested_extractor_config_validated() {
        let mut config = PipelineConfig::default();
        config.extractor.max_input_chars = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sampling_override_from_toml() {
        let config = PipelineConfig::from_toml(
            r#"
            stage_attempts = 2

            [sampling.trend_research]
            temperature = 0.2
            max_output_tokens = 900
            mode = "research"
            "#,
        )
        .unwrap();
        assert_eq!(config.stage_attempts, 2);

        let default = SamplingConfig::fast(0.7, 2048);
        let trend = config.sampling_for("trend_research", &default);
        assert_eq!(trend.mode, GenerationMode::Research);
        assert_eq!(trend.max_output_tokens, 900);
        assert_eq!(config.sampling_for("synthesis", &default), default);
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = PipelineConfig::default();
        config.prompts_path = Some(PathBuf::from("/etc/sparkmill/prompts.toml"));
        let toml_str = config.to_toml().unwrap();
        assert_eq!(PipelineConfig::from_toml(&toml_str).unwrap(), config);
    }
}
