//! Competitive analysis: who already solves these problems

use super::{header, push_directive, push_format, push_problems, push_trend};
use crate::context::ContextField;
use crate::stage::{OutputFormat, StageDefinition, StageInputs, StagePolicy};
use serde_json::{json, Value};
use sparkmill_domain::SamplingConfig;

/// Stage name
pub const NAME: &str = "competitive_analysis";

const SHAPE: &str = r#"{
  "summary": "how crowded the space is",
  "competitors": [{"name": "company", "weakness": "where it falls short"}],
  "differentiation": "the gap a newcomer can own"
}"#;

/// Definition of the competitive analysis stage
pub fn definition() -> StageDefinition {
    StageDefinition {
        name: NAME,
        step_message: "Mapping the competition",
        inputs: &[ContextField::Directive, ContextField::Trend, ContextField::Problems],
        output: ContextField::Competition,
        required_fields: &["summary", "competitors"],
        policy: StagePolicy::LoadBearing,
        format: OutputFormat::Json,
        sampling: SamplingConfig::research(0.3, 2048),
        build_prompt,
        fallback: Some(fallback),
        describes: "a competitive landscape summary with named competitors",
    }
}

/// Prompt for the competitive analysis stage
pub fn build_prompt(inputs: &StageInputs<'_>) -> String {
    let mut prompt = header(
        NAME,
        "Name the existing products that address these problems and where each falls short.",
    );
    push_directive(&mut prompt, inputs.directive());
    push_trend(&mut prompt, inputs.trend());
    push_problems(&mut prompt, inputs.problems());
    push_format(&mut prompt, SHAPE);
    prompt
}

/// Placeholder when research fails
pub fn fallback() -> Value {
    json!({
        "summary": "Competitive landscape unknown",
        "competitors": [],
        "differentiation": null
    })
}
