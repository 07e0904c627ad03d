//! Monetization: business model, pricing and unit economics

use super::{header, push_competition, push_format, push_problems};
use crate::context::ContextField;
use crate::stage::{OutputFormat, StageDefinition, StageInputs, StagePolicy};
use serde_json::{json, Value};
use sparkmill_domain::SamplingConfig;

/// Stage name
pub const NAME: &str = "monetization";

const SHAPE: &str = r#"{
  "model": "subscription | marketplace | usage-based | ...",
  "pricing": [{"name": "tier name", "price": "$12/month"}],
  "keyMetrics": {"ltv": 240, "cac": 60},
  "revenuePotential": "rough revenue in year two"
}"#;

/// Definition of the monetization stage
pub fn definition() -> StageDefinition {
    StageDefinition {
        name: NAME,
        step_message: "Designing the business model",
        inputs: &[ContextField::Problems, ContextField::Competition],
        output: ContextField::Monetization,
        required_fields: &["model", "keyMetrics.ltv", "keyMetrics.cac"],
        policy: StagePolicy::LoadBearing,
        format: OutputFormat::Json,
        sampling: SamplingConfig::fast(0.4, 1536),
        build_prompt,
        fallback: Some(fallback),
        describes: "a monetization plan with pricing tiers and LTV/CAC in dollars",
    }
}

/// Prompt for the monetization stage
pub fn build_prompt(inputs: &StageInputs<'_>) -> String {
    let mut prompt = header(
        NAME,
        "Propose how a startup solving these problems makes money. LTV and CAC are plain numbers in US dollars.",
    );
    push_problems(&mut prompt, inputs.problems());
    push_competition(&mut prompt, inputs.competition());
    push_format(&mut prompt, SHAPE);
    prompt
}

/// Placeholder when the plan cannot be produced
pub fn fallback() -> Value {
    json!({
        "model": "unknown",
        "pricing": [],
        "keyMetrics": {"ltv": 0.0, "cac": 0.0},
        "revenuePotential": null
    })
}
