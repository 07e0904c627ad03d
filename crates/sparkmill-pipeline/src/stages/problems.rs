//! Problem analysis: painful problems and who has them

use super::{header, push_directive, push_format, push_trend};
use crate::context::ContextField;
use crate::stage::{OutputFormat, StageDefinition, StageInputs, StagePolicy};
use sparkmill_domain::SamplingConfig;

/// Stage name
pub const NAME: &str = "problem_analysis";

const SHAPE: &str = r#"{
  "problems": [{"title": "short name", "description": "who hurts and how", "severity": 7.5}],
  "targetAudience": "the specific people with these problems"
}"#;

/// Definition of the problem analysis stage
///
/// No placeholder: an idea without a real problem is not worth persisting.
pub fn definition() -> StageDefinition {
    StageDefinition {
        name: NAME,
        step_message: "Analyzing problems and gaps",
        inputs: &[ContextField::Directive, ContextField::Trend],
        output: ContextField::Problems,
        required_fields: &["problems", "targetAudience"],
        policy: StagePolicy::LoadBearing,
        format: OutputFormat::Json,
        sampling: SamplingConfig::fast(0.6, 2048),
        build_prompt,
        fallback: None,
        describes: "a list of customer problems and the target audience",
    }
}

/// Prompt for the problem analysis stage
pub fn build_prompt(inputs: &StageInputs<'_>) -> String {
    let mut prompt = header(
        NAME,
        "List the three most painful, underserved problems these trends create. Severity is 0-10.",
    );
    push_directive(&mut prompt, inputs.directive());
    push_trend(&mut prompt, inputs.trend());
    push_format(&mut prompt, SHAPE);
    prompt
}
