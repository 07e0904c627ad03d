//! Trend research: internet-grounded scan of the market

use super::{header, push_directive, push_format};
use crate::context::ContextField;
use crate::stage::{OutputFormat, StageDefinition, StageInputs, StagePolicy};
use serde_json::{json, Value};
use sparkmill_domain::SamplingConfig;

/// Stage name
pub const NAME: &str = "trend_research";

const SHAPE: &str = r#"{
  "summary": "two or three sentences on what is changing and why",
  "trends": [{"name": "short label", "description": "one sentence", "evidence": "statistic or source"}],
  "focus": "the market segment these trends point to"
}"#;

/// Definition of the trend research stage
pub fn definition() -> StageDefinition {
    StageDefinition {
        name: NAME,
        step_message: "Researching market trends",
        inputs: &[ContextField::Directive],
        output: ContextField::Trend,
        required_fields: &["summary", "trends"],
        policy: StagePolicy::LoadBearing,
        format: OutputFormat::Json,
        sampling: SamplingConfig::research(0.4, 2048),
        build_prompt,
        fallback: Some(fallback),
        describes: "a summary of current market trends",
    }
}

/// Prompt for the trend research stage
pub fn build_prompt(inputs: &StageInputs<'_>) -> String {
    let mut prompt = header(
        NAME,
        "Identify three to five current, evidence-backed trends that open room for a new startup.",
    );
    push_directive(&mut prompt, inputs.directive());
    push_format(&mut prompt, SHAPE);
    prompt
}

/// Placeholder when research fails
pub fn fallback() -> Value {
    json!({
        "summary": "Trend research unavailable",
        "trends": [],
        "focus": null
    })
}
