//! Build recommendation: what to build first (advisory)

use super::{header, push_competition, push_format, push_monetization, push_problems};
use crate::context::ContextField;
use crate::stage::{OutputFormat, StageDefinition, StageInputs, StagePolicy};
use sparkmill_domain::SamplingConfig;

/// Stage name
pub const NAME: &str = "build_recommendation";

const SHAPE: &str = r#"{
  "mvp": "the smallest product that proves demand",
  "techStack": ["component"],
  "milestones": ["first milestone"]
}"#;

/// Definition of the build recommendation stage
pub fn definition() -> StageDefinition {
    StageDefinition {
        name: NAME,
        step_message: "Scoping the first version",
        inputs: &[
            ContextField::Problems,
            ContextField::Competition,
            ContextField::Monetization,
        ],
        output: ContextField::Build,
        required_fields: &["mvp"],
        policy: StagePolicy::Advisory,
        format: OutputFormat::Json,
        sampling: SamplingConfig::fast(0.5, 1536),
        build_prompt,
        fallback: None,
        describes: "an MVP scope with tech stack and milestones",
    }
}

/// Prompt for the build recommendation stage
pub fn build_prompt(inputs: &StageInputs<'_>) -> String {
    let mut prompt = header(
        NAME,
        "Recommend the first version to build: scope, stack and three milestones.",
    );
    push_problems(&mut prompt, inputs.problems());
    push_competition(&mut prompt, inputs.competition());
    push_monetization(&mut prompt, inputs.monetization());
    push_format(&mut prompt, SHAPE);
    prompt
}
