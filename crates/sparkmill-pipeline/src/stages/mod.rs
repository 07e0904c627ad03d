//! The stage catalogue
//!
//! One module per stage: its definition, prompt builder and placeholder.
//! Prompts are built only from the stage's declared inputs, in a fixed
//! order, so the same context always yields the same prompt.

pub mod build;
pub mod competition;
pub mod critique;
pub mod monetization;
pub mod problems;
pub mod synthesis;
pub mod trend;

use crate::context::ContextField;
use crate::error::PipelineError;
use crate::stage::StageDefinition;
use sparkmill_domain::{
    BuildRecommendation, CompetitiveSummary, MonetizationPlan, ProblemAnalysis, TrendSummary,
};
use std::collections::HashSet;
use std::fmt::Write;

/// Every stage in execution order
pub fn catalogue() -> Vec<StageDefinition> {
    vec![
        trend::definition(),
        problems::definition(),
        competition::definition(),
        monetization::definition(),
        build::definition(),
        synthesis::definition(),
        critique::definition(),
        synthesis::refined_definition(),
    ]
}

/// Check that the stages form a total order over their inputs
///
/// Every input must be initial or produced by a strictly earlier stage, and
/// no two stages may fill the same field.
pub fn validate_order(stages: &[StageDefinition]) -> Result<(), PipelineError> {
    let mut available: HashSet<ContextField> = ContextField::INITIAL.into_iter().collect();
    let mut names = HashSet::new();

    for stage in stages {
        if !names.insert(stage.name) {
            return Err(PipelineError::InvalidStageOrder(format!(
                "duplicate stage name '{}'",
                stage.name
            )));
        }
        if let Some(missing) = stage.inputs.iter().find(|f| !available.contains(*f)) {
            return Err(PipelineError::InvalidStageOrder(format!(
                "stage '{}' reads '{}' before any stage produces it",
                stage.name, missing
            )));
        }
        if !available.insert(stage.output) {
            return Err(PipelineError::InvalidStageOrder(format!(
                "stage '{}' writes '{}' which is already produced",
                stage.name, stage.output
            )));
        }
    }
    Ok(())
}

pub(crate) fn header(task: &str, instructions: &str) -> String {
    format!("Task: {}\n{}\n", task, instructions)
}

pub(crate) fn push_directive(prompt: &mut String, directive: Option<&str>) {
    match directive {
        Some(directive) => {
            let _ = writeln!(prompt, "\nFocus area requested by the user: {}", directive);
        }
        None => prompt.push_str("\nNo focus area was given; pick the most promising space.\n"),
    }
}

pub(crate) fn push_trend(prompt: &mut String, trend: Option<&TrendSummary>) {
    let Some(trend) = trend else { return };
    let _ = writeln!(prompt, "\nMarket trends:\n{}", trend.summary);
    for t in &trend.trends {
        let _ = writeln!(prompt, "- {}: {}", t.name, t.description);
    }
}

pub(crate) fn push_problems(prompt: &mut String, problems: Option<&ProblemAnalysis>) {
    let Some(problems) = problems else { return };
    let _ = writeln!(prompt, "\nTarget audience: {}\nProblems:", problems.target_audience);
    for p in &problems.problems {
        match p.severity {
            Some(severity) => {
                let _ = writeln!(prompt, "- {} (severity {:.1}): {}", p.title, severity, p.description);
            }
            None => {
                let _ = writeln!(prompt, "- {}: {}", p.title, p.description);
            }
        }
    }
}

pub(crate) fn push_competition(prompt: &mut String, competition: Option<&CompetitiveSummary>) {
    let Some(competition) = competition else { return };
    let _ = writeln!(prompt, "\nCompetitive landscape:\n{}", competition.summary);
    for c in &competition.competitors {
        match &c.weakness {
            Some(weakness) => {
                let _ = writeln!(prompt, "- {} (weakness: {})", c.name, weakness);
            }
            None => {
                let _ = writeln!(prompt, "- {}", c.name);
            }
        }
    }
    if let Some(diff) = &competition.differentiation {
        let _ = writeln!(prompt, "Differentiation opportunity: {}", diff);
    }
}

pub(crate) fn push_monetization(prompt: &mut String, plan: Option<&MonetizationPlan>) {
    let Some(plan) = plan else { return };
    let _ = writeln!(
        prompt,
        "\nMonetization: {} (LTV {:.0}, CAC {:.0})",
        plan.model, plan.key_metrics.ltv, plan.key_metrics.cac
    );
    for tier in &plan.pricing {
        let _ = writeln!(prompt, "- {}: {}", tier.name, tier.price);
    }
}

pub(crate) fn push_build(prompt: &mut String, build: Option<&BuildRecommendation>) {
    let Some(build) = build else { return };
    let _ = writeln!(prompt, "\nMVP: {}", build.mvp);
    if !build.tech_stack.is_empty() {
        let _ = writeln!(prompt, "Tech stack: {}", build.tech_stack.join(", "));
    }
}

pub(crate) fn push_format(prompt: &mut String, example: &str) {
    let _ = write!(prompt, "\nReturn JSON of exactly this shape:\n{}\n", example);
}
