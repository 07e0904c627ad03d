//! Critique of the first draft, as free-text guidance

use super::{header, push_competition, push_problems};
use crate::context::ContextField;
use crate::stage::{OutputFormat, StageDefinition, StageInputs, StagePolicy};
use sparkmill_domain::SamplingConfig;
use std::fmt::Write;

/// Stage name
pub const NAME: &str = "critique";

/// Definition of the critique stage
///
/// Prose output, no extraction. Advisory: without it the refined pass runs
/// unguided.
pub fn definition() -> StageDefinition {
    StageDefinition {
        name: NAME,
        step_message: "Critiquing the draft",
        inputs: &[ContextField::Draft, ContextField::Problems, ContextField::Competition],
        output: ContextField::Critique,
        required_fields: &[],
        policy: StagePolicy::Advisory,
        format: OutputFormat::Prose,
        sampling: SamplingConfig::fast(0.7, 1024),
        build_prompt,
        fallback: None,
        describes: "review notes on a startup idea",
    }
}

/// Prompt for the critique stage
pub fn build_prompt(inputs: &StageInputs<'_>) -> String {
    let mut prompt = header(
        NAME,
        "Review this startup idea. List its weakest points and concrete fixes in a few short paragraphs of plain text.",
    );
    if let Some(draft) = inputs.draft() {
        let _ = writeln!(prompt, "\nIdea: {}\n{}", draft.title, draft.description);
        let _ = writeln!(prompt, "Average score: {:.1}", draft.scores.average());
        if let Some(why_now) = &draft.why_now {
            let _ = writeln!(prompt, "Why now: {}", why_now);
        }
    }
    push_problems(&mut prompt, inputs.problems());
    push_competition(&mut prompt, inputs.competition());
    prompt
}
