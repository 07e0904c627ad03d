//! Idea synthesis, run twice around a critique
//!
//! The first pass feeds only the critique. The refined pass sees the same
//! context plus the critique text verbatim, and its output is the one that
//! becomes the artifact.

use super::{
    header, push_build, push_competition, push_directive, push_format, push_monetization,
    push_problems, push_trend,
};
use crate::context::ContextField;
use crate::stage::{OutputFormat, StageDefinition, StageInputs, StagePolicy};
use sparkmill_domain::SamplingConfig;
use std::fmt::Write;

/// First-pass stage name
pub const NAME: &str = "synthesis";

/// Refined-pass stage name
pub const REFINED_NAME: &str = "synthesis_refined";

const REQUIRED: &[&str] = &[
    "title",
    "description",
    "scores.opportunity",
    "scores.problemSeverity",
    "scores.feasibility",
    "scores.whyNow",
    "scores.marketSize",
    "scores.revenuePotential",
    "scores.executionDifficulty",
    "scores.goToMarket",
    "scores.defensibility",
    "scores.founderFit",
];

const INPUTS: &[ContextField] = &[
    ContextField::Directive,
    ContextField::PreviousTitles,
    ContextField::Trend,
    ContextField::Problems,
    ContextField::Competition,
    ContextField::Monetization,
    ContextField::Build,
];

const REFINED_INPUTS: &[ContextField] = &[
    ContextField::Directive,
    ContextField::PreviousTitles,
    ContextField::Trend,
    ContextField::Problems,
    ContextField::Competition,
    ContextField::Monetization,
    ContextField::Build,
    ContextField::Critique,
];

const SHAPE: &str = r#"{
  "title": "product name",
  "tagline": "one line",
  "description": "what it is, who it is for, how it makes money",
  "scores": {
    "opportunity": 0, "problemSeverity": 0, "feasibility": 0, "whyNow": 0,
    "marketSize": 0, "revenuePotential": 0, "executionDifficulty": 0,
    "goToMarket": 0, "defensibility": 0, "founderFit": 0
  },
  "tags": ["tag"],
  "whyNow": "why this is possible now"
}"#;

/// Definition of the first synthesis pass
pub fn definition() -> StageDefinition {
    StageDefinition {
        name: NAME,
        step_message: "Drafting the idea",
        inputs: INPUTS,
        output: ContextField::Draft,
        required_fields: REQUIRED,
        policy: StagePolicy::LoadBearing,
        format: OutputFormat::Json,
        sampling: SamplingConfig::fast(0.9, 3072),
        build_prompt,
        fallback: None,
        describes: "a startup idea with title, description and ten 0-10 scores",
    }
}

/// Definition of the authoritative synthesis pass
pub fn refined_definition() -> StageDefinition {
    StageDefinition {
        name: REFINED_NAME,
        step_message: "Refining the idea",
        inputs: REFINED_INPUTS,
        output: ContextField::FinalDraft,
        build_prompt: build_refined_prompt,
        sampling: SamplingConfig::fast(0.7, 3072),
        ..definition()
    }
}

fn render(task: &str, inputs: &StageInputs<'_>) -> String {
    let mut prompt = header(
        task,
        "Combine the research below into one specific startup idea and score it from 0 to 10 on each dimension.",
    );
    push_directive(&mut prompt, inputs.directive());
    push_trend(&mut prompt, inputs.trend());
    push_problems(&mut prompt, inputs.problems());
    push_competition(&mut prompt, inputs.competition());
    push_monetization(&mut prompt, inputs.monetization());
    push_build(&mut prompt, inputs.build());

    let previous = inputs.previous_titles();
    if !previous.is_empty() {
        prompt.push_str("\nDo not repeat any of these existing ideas:\n");
        for title in previous {
            let _ = writeln!(prompt, "- {}", title);
        }
    }
    prompt
}

/// Prompt for the first synthesis pass
pub fn build_prompt(inputs: &StageInputs<'_>) -> String {
    let mut prompt = render(NAME, inputs);
    push_format(&mut prompt, SHAPE);
    prompt
}

/// Prompt for the refined pass: same context plus the critique
pub fn build_refined_prompt(inputs: &StageInputs<'_>) -> String {
    let mut prompt = render(REFINED_NAME, inputs);
    if let Some(critique) = inputs.critique() {
        prompt.push_str("\nReviewer feedback on an earlier draft. Address every point:\n");
        prompt.push_str(critique);
        prompt.push('\n');
    }
    push_format(&mut prompt, SHAPE);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PipelineContext;
    use serde_json::json;
    use sparkmill_domain::SCORE_FIELDS;

    #[test]
    fn test_required_covers_every_score() {
        for field in SCORE_FIELDS {
            assert!(REQUIRED.contains(&format!("scores.{}", field).as_str()), "{}", field);
        }
    }

    #[test]
    fn test_refined_prompt_contains_critique_verbatim() {
        let mut ctx = PipelineContext::default();
        ctx.apply(ContextField::Critique, json!("The audience is too broad;\nfocus on nurses."))
            .unwrap();

        let refined = build_refined_prompt(&StageInputs::new(&ctx, REFINED_INPUTS));
        assert!(refined.contains("The audience is too broad;\nfocus on nurses."));

        let first = build_prompt(&StageInputs::new(&ctx, INPUTS));
        assert!(!first.contains("focus on nurses"));
    }

    #[test]
    fn test_previous_titles_rendered() {
        let ctx = PipelineContext::new(None, vec!["DeskChef".to_string()]);
        let prompt = build_prompt(&StageInputs::new(&ctx, INPUTS));
        assert!(prompt.contains("Do not repeat"));
        assert!(prompt.contains("- DeskChef"));
    }

    #[test]
    fn test_missing_build_section_is_omitted() {
        let ctx = PipelineContext::default();
        let prompt = build_prompt(&StageInputs::new(&ctx, INPUTS));
        assert!(!prompt.contains("MVP:"));
    }
}
