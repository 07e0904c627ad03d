//! Stage definitions and the unit that executes one stage

use crate::config::PipelineConfig;
use crate::context::{ContextField, PipelineContext};
use crate::prompts::PromptLibrary;
use serde_json::Value;
use sparkmill_domain::traits::GenerationClient;
use sparkmill_domain::{
    BuildRecommendation, CompetitiveSummary, FinishReason, GenerationRequest, IdeaDraft,
    MonetizationPlan, ProblemAnalysis, SamplingConfig, Source, TrendSummary,
};
use sparkmill_extractor::cleanup::looks_structured;
use sparkmill_extractor::{ExtractionSpec, SchemaHint, Strategy, StructuredExtractor};
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// What a missing result means for the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagePolicy {
    /// Missing result aborts the run
    LoadBearing,
    /// Missing result is left absent; later stages degrade
    Advisory,
}

/// Shape of a stage's output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON object run through the extraction cascade
    Json,
    /// Free text used verbatim
    Prose,
}

/// Static descriptor of one pipeline step
#[derive(Clone)]
pub struct StageDefinition {
    /// Stable stage name; prompts start with `Task: <name>`
    pub name: &'static str,
    /// Progress message written to the job record
    pub step_message: &'static str,
    /// Context fields the prompt may read
    pub inputs: &'static [ContextField],
    /// Context field this stage fills
    pub output: ContextField,
    /// Dotted paths the output must contain
    pub required_fields: &'static [&'static str],
    /// Fatal or advisory
    pub policy: StagePolicy,
    /// JSON or prose
    pub format: OutputFormat,
    /// Default sampling; overridable per stage in config
    pub sampling: SamplingConfig,
    /// Deterministic prompt builder
    pub build_prompt: fn(&StageInputs<'_>) -> String,
    /// Placeholder used when generation and repair both fail
    pub fallback: Option<fn() -> Value>,
    /// What the output describes, for repair prompts
    pub describes: &'static str,
}

impl std::fmt::Debug for StageDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageDefinition")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("output", &self.output)
            .field("policy", &self.policy)
            .field("format", &self.format)
            .finish()
    }
}

impl StageDefinition {
    /// Whether the output goes through the extractor
    pub fn structured(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Extraction requirements for this stage's output
    pub fn extraction_spec(&self, with_fallback: bool) -> ExtractionSpec {
        let mut spec = ExtractionSpec::new(self.required_fields.iter().copied())
            .with_context(self.describes)
            .with_schema_hint(SchemaHint::keys(top_level_keys(self.required_fields)));
        if with_fallback {
            if let Some(fallback) = self.fallback {
                spec = spec.with_fallback(fallback());
            }
        }
        spec
    }
}

fn top_level_keys(paths: &[&str]) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for path in paths {
        let key = path.split('.').next().unwrap_or(path);
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    }
    keys
}

/// Read-only view of the context limited to a stage's declared inputs
pub struct StageInputs<'a> {
    ctx: &'a PipelineContext,
    allowed: &'a [ContextField],
}

impl<'a> StageInputs<'a> {
    /// View of `ctx` exposing only `allowed`
    pub fn new(ctx: &'a PipelineContext, allowed: &'a [ContextField]) -> Self {
        Self { ctx, allowed }
    }

    fn allows(&self, field: ContextField) -> bool {
        self.allowed.contains(&field)
    }

    /// User directive
    pub fn directive(&self) -> Option<&'a str> {
        self.allows(ContextField::Directive)
            .then(|| self.ctx.directive())
            .flatten()
    }

    /// Recent artifact titles
    pub fn previous_titles(&self) -> &'a [String] {
        if self.allows(ContextField::PreviousTitles) {
            self.ctx.previous_titles()
        } else {
            &[]
        }
    }

    /// Trend research
    pub fn trend(&self) -> Option<&'a TrendSummary> {
        self.allows(ContextField::Trend).then(|| self.ctx.trend()).flatten()
    }

    /// Problem analysis
    pub fn problems(&self) -> Option<&'a ProblemAnalysis> {
        self.allows(ContextField::Problems)
            .then(|| self.ctx.problems())
            .flatten()
    }

    /// Competitive landscape
    pub fn competition(&self) -> Option<&'a CompetitiveSummary> {
        self.allows(ContextField::Competition)
            .then(|| self.ctx.competition())
            .flatten()
    }

    /// Monetization plan
    pub fn monetization(&self) -> Option<&'a MonetizationPlan> {
        self.allows(ContextField::Monetization)
            .then(|| self.ctx.monetization())
            .flatten()
    }

    /// Build recommendation
    pub fn build(&self) -> Option<&'a BuildRecommendation> {
        self.allows(ContextField::Build).then(|| self.ctx.build()).flatten()
    }

    /// First synthesis pass
    pub fn draft(&self) -> Option<&'a IdeaDraft> {
        self.allows(ContextField::Draft).then(|| self.ctx.draft()).flatten()
    }

    /// Refinement guidance
    pub fn critique(&self) -> Option<&'a str> {
        self.allows(ContextField::Critique)
            .then(|| self.ctx.critique())
            .flatten()
    }
}

/// Result of executing one stage
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    /// Output parsed and validated
    Parsed {
        /// Validated value
        value: Value,
        /// Cascade strategy that succeeded (`None` for prose)
        strategy: Option<Strategy>,
        /// Research citations
        sources: Vec<Source>,
    },
    /// Generation or extraction failed; the stage placeholder stands in
    Fallback {
        /// Placeholder value
        value: Value,
        /// What went wrong
        reason: String,
    },
    /// No usable value
    Failed {
        /// What went wrong
        reason: String,
    },
}

impl StageOutcome {
    /// The usable value, if any
    pub fn value(&self) -> Option<&Value> {
        match self {
            StageOutcome::Parsed { value, .. } | StageOutcome::Fallback { value, .. } => Some(value),
            StageOutcome::Failed { .. } => None,
        }
    }

    /// Short label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            StageOutcome::Parsed { .. } => "parsed",
            StageOutcome::Fallback { .. } => "fallback",
            StageOutcome::Failed { .. } => "failed",
        }
    }

    /// Whether the value is a placeholder
    pub fn is_degraded(&self) -> bool {
        matches!(self, StageOutcome::Fallback { .. })
    }
}

/// Executes one stage: prompt, generate, extract
pub struct StageUnit<G> {
    client: Arc<G>,
    extractor: StructuredExtractor,
    config: PipelineConfig,
}

impl<G: GenerationClient> StageUnit<G> {
    /// Create a unit over `client`
    pub fn new(client: Arc<G>, extractor: StructuredExtractor, config: PipelineConfig) -> Self {
        Self {
            client,
            extractor,
            config,
        }
    }

    /// The request this unit would send for `def` against `ctx`
    pub fn request_for(
        &self,
        def: &StageDefinition,
        ctx: &PipelineContext,
        prompts: &PromptLibrary,
    ) -> GenerationRequest {
        let inputs = StageInputs::new(ctx, def.inputs);
        GenerationRequest::new((def.build_prompt)(&inputs))
            .with_system_instruction(prompts.system_instruction(def.name, def.structured()))
            .with_sampling(self.config.sampling_for(def.name, &def.sampling))
    }

    fn without_output(&self, def: &StageDefinition, reason: String) -> StageOutcome {
        match def.fallback {
            Some(fallback) if self.config.use_stage_fallbacks => {
                warn!("Stage '{}' using fallback: {}", def.name, reason);
                StageOutcome::Fallback {
                    value: fallback(),
                    reason,
                }
            }
            _ => StageOutcome::Failed { reason },
        }
    }

    /// Run `def` against the current context
    pub async fn execute(
        &self,
        def: &StageDefinition,
        ctx: &PipelineContext,
        prompts: &PromptLibrary,
    ) -> StageOutcome {
        let request = self.request_for(def, ctx, prompts);
        debug!(
            "Stage '{}' prompt: {} chars, mode {:?}",
            def.name,
            request.prompt.len(),
            request.sampling.mode
        );

        let response = match timeout(self.config.stage_timeout(), self.client.generate(&request)).await
        {
            Err(_) => {
                warn!(
                    "Stage '{}' generation timed out after {}s",
                    def.name, self.config.stage_timeout_secs
                );
                return self.without_output(
                    def,
                    format!("generation timed out after {}s", self.config.stage_timeout_secs),
                );
            }
            Ok(Err(e)) => {
                warn!("Stage '{}' generation failed: {}", def.name, e);
                return self.without_output(def, format!("generation failed: {}", e));
            }
            Ok(Ok(response)) => response,
        };

        let text = match response.text.as_deref() {
            None => {
                warn!("Stage '{}' got no response from {}", def.name, self.client.model_name());
                return self.without_output(def, "no response".to_string());
            }
            Some(text) if text.trim().is_empty() => {
                warn!("Stage '{}' got an empty response", def.name);
                return self.without_output(def, "empty response".to_string());
            }
            Some(text) => text,
        };

        match response.finish_reason {
            FinishReason::Length => warn!("Stage '{}' output was truncated", def.name),
            FinishReason::Safety => warn!("Stage '{}' output was filtered", def.name),
            FinishReason::Stop | FinishReason::Other => {}
        }
        debug!(
            "Stage '{}' response: {} chars, {} tokens, {} sources, structured: {}",
            def.name,
            text.len(),
            response.usage.total(),
            response.sources.len(),
            looks_structured(text)
        );

        if def.format == OutputFormat::Prose {
            return StageOutcome::Parsed {
                value: Value::String(text.trim().to_string()),
                strategy: None,
                sources: response.sources,
            };
        }

        let spec = def.extraction_spec(self.config.use_stage_fallbacks);
        let result = self.extractor.extract(text, &spec).await;

        let Some(value) = result.value.clone().filter(|_| result.success) else {
            return StageOutcome::Failed {
                reason: format!("malformed output: {}", result.diagnostics()),
            };
        };

        if let Err(e) = PipelineContext::check_payload(def.output, &value) {
            // Valid JSON of the wrong shape counts as malformed
            warn!("Stage '{}' output failed typed decoding: {}", def.name, e);
            if result.used_fallback {
                return StageOutcome::Failed { reason: e };
            }
            return self.without_output(def, e);
        }

        if result.used_fallback {
            return StageOutcome::Fallback {
                value,
                reason: format!("extraction degraded: {}", result.diagnostics()),
            };
        }

        info!(
            "Stage '{}' parsed via {}",
            def.name,
            result.strategy.map(|s| s.as_str()).unwrap_or("unknown")
        );
        StageOutcome::Parsed {
            value,
            strategy: result.strategy,
            sources: response.sources,
        }
    }
}
