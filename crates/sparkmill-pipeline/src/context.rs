//! Per-run accumulator of stage results

use crate::error::PipelineError;
use serde_json::Value;
use sparkmill_domain::{
    BuildRecommendation, CompetitiveSummary, IdeaDraft, MonetizationPlan, ProblemAnalysis,
    Source, TrendSummary,
};
use std::fmt;

/// A named slot of [`PipelineContext`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextField {
    /// Free-text user directive (set before the first stage)
    Directive,
    /// Titles of recent artifacts (set before the first stage)
    PreviousTitles,
    /// Trend research
    Trend,
    /// Problem and gap analysis
    Problems,
    /// Competitive landscape
    Competition,
    /// Monetization plan
    Monetization,
    /// Technical build recommendation
    Build,
    /// First synthesis pass
    Draft,
    /// Free-text refinement guidance
    Critique,
    /// Authoritative synthesis pass
    FinalDraft,
}

impl ContextField {
    /// Fields available before any stage runs
    pub const INITIAL: [ContextField; 2] = [ContextField::Directive, ContextField::PreviousTitles];

    /// Stable name for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextField::Directive => "directive",
            ContextField::PreviousTitles => "previous_titles",
            ContextField::Trend => "trend",
            ContextField::Problems => "problems",
            ContextField::Competition => "competition",
            ContextField::Monetization => "monetization",
            ContextField::Build => "build",
            ContextField::Draft => "draft",
            ContextField::Critique => "critique",
            ContextField::FinalDraft => "final_draft",
        }
    }
}

impl fmt::Display for ContextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Write-once optional value
#[derive(Debug, Clone, PartialEq)]
pub struct Slot<T>(Option<T>);

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot(None)
    }
}

impl<T> Slot<T> {
    /// Current value
    pub fn get(&self) -> Option<&T> {
        self.0.as_ref()
    }

    /// Whether the slot has been filled
    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    fn set(&mut self, field: ContextField, value: T) -> Result<(), PipelineError> {
        if self.0.is_some() {
            return Err(PipelineError::SlotAlreadySet(field.to_string()));
        }
        self.0 = Some(value);
        Ok(())
    }

    fn take(self) -> Option<T> {
        self.0
    }
}

/// Mutable accumulator for one pipeline run
///
/// Slots are filled progressively and never cleared within a run. Readers
/// must tolerate any slot being absent.
#[derive(Debug, Clone, Default)]
pub struct PipelineContext {
    directive: Option<String>,
    previous_titles: Vec<String>,
    trend: Slot<TrendSummary>,
    problems: Slot<ProblemAnalysis>,
    competition: Slot<CompetitiveSummary>,
    monetization: Slot<MonetizationPlan>,
    build: Slot<BuildRecommendation>,
    draft: Slot<IdeaDraft>,
    critique: Slot<String>,
    final_draft: Slot<IdeaDraft>,
    sources: Vec<Source>,
}

/// The filled slots at the end of a run
#[derive(Debug, Clone)]
pub(crate) struct ContextParts {
    pub directive: Option<String>,
    pub trend: Option<TrendSummary>,
    pub problems: Option<ProblemAnalysis>,
    pub competition: Option<CompetitiveSummary>,
    pub monetization: Option<MonetizationPlan>,
    pub build: Option<BuildRecommendation>,
    pub final_draft: Option<IdeaDraft>,
    pub sources: Vec<Source>,
}

fn decode<T: serde::de::DeserializeOwned>(field: ContextField, value: Value) -> Result<T, String> {
    serde_json::from_value(value).map_err(|e| format!("{} payload does not decode: {}", field, e))
}

impl PipelineContext {
    /// Context seeded with the trigger's directive and recent titles
    pub fn new(directive: Option<String>, previous_titles: Vec<String>) -> Self {
        Self {
            directive: directive.filter(|d| !d.trim().is_empty()),
            previous_titles,
            ..Default::default()
        }
    }

    /// User directive
    pub fn directive(&self) -> Option<&str> {
        self.directive.as_deref()
    }

    /// Recent artifact titles
    pub fn previous_titles(&self) -> &[String] {
        &self.previous_titles
    }

    /// Trend research
    pub fn trend(&self) -> Option<&TrendSummary> {
        self.trend.get()
    }

    /// Problem analysis
    pub fn problems(&self) -> Option<&ProblemAnalysis> {
        self.problems.get()
    }

    /// Competitive landscape
    pub fn competition(&self) -> Option<&CompetitiveSummary> {
        self.competition.get()
    }

    /// Monetization plan
    pub fn monetization(&self) -> Option<&MonetizationPlan> {
        self.monetization.get()
    }

    /// Build recommendation
    pub fn build(&self) -> Option<&BuildRecommendation> {
        self.build.get()
    }

    /// First synthesis pass
    pub fn draft(&self) -> Option<&IdeaDraft> {
        self.draft.get()
    }

    /// Refinement guidance
    pub fn critique(&self) -> Option<&str> {
        self.critique.get().map(String::as_str)
    }

    /// Authoritative synthesis pass
    pub fn final_draft(&self) -> Option<&IdeaDraft> {
        self.final_draft.get()
    }

    /// Citations gathered from research-mode stages
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Whether `field` currently holds a value
    pub fn has(&self, field: ContextField) -> bool {
        match field {
            ContextField::Directive => self.directive.is_some(),
            ContextField::PreviousTitles => !self.previous_titles.is_empty(),
            ContextField::Trend => self.trend.is_set(),
            ContextField::Problems => self.problems.is_set(),
            ContextField::Competition => self.competition.is_set(),
            ContextField::Monetization => self.monetization.is_set(),
            ContextField::Build => self.build.is_set(),
            ContextField::Draft => self.draft.is_set(),
            ContextField::Critique => self.critique.is_set(),
            ContextField::FinalDraft => self.final_draft.is_set(),
        }
    }

    /// Check that `value` decodes into the payload type of `field`
    pub fn check_payload(field: ContextField, value: &Value) -> Result<(), String> {
        let value = value.clone();
        match field {
            ContextField::Trend => decode::<TrendSummary>(field, value).map(drop),
            ContextField::Problems => decode::<ProblemAnalysis>(field, value).map(drop),
            ContextField::Competition => decode::<CompetitiveSummary>(field, value).map(drop),
            ContextField::Monetization => decode::<MonetizationPlan>(field, value).map(drop),
            ContextField::Build => decode::<BuildRecommendation>(field, value).map(drop),
            ContextField::Draft | ContextField::FinalDraft => {
                decode::<IdeaDraft>(field, value).map(drop)
            }
            ContextField::Critique => match value {
                Value::String(_) => Ok(()),
                _ => Err("critique must be text".to_string()),
            },
            ContextField::Directive | ContextField::PreviousTitles => {
                Err(format!("{} is not a stage output", field))
            }
        }
    }

    /// Store a stage's validated value in `field`
    pub fn apply(&mut self, field: ContextField, value: Value) -> Result<(), PipelineError> {
        let invalid = |reason: String| PipelineError::StageFailed {
            stage: field.to_string(),
            reason,
        };
        match field {
            ContextField::Trend => self.trend.set(field, decode(field, value).map_err(invalid)?),
            ContextField::Problems => {
                self.problems.set(field, decode(field, value).map_err(invalid)?)
            }
            ContextField::Competition => {
                self.competition.set(field, decode(field, value).map_err(invalid)?)
            }
            ContextField::Monetization => {
                self.monetization.set(field, decode(field, value).map_err(invalid)?)
            }
            ContextField::Build => self.build.set(field, decode(field, value).map_err(invalid)?),
            ContextField::Draft => self.draft.set(field, decode(field, value).map_err(invalid)?),
            ContextField::FinalDraft => {
                self.final_draft.set(field, decode(field, value).map_err(invalid)?)
            }
            ContextField::Critique => match value {
                Value::String(text) => self.critique.set(field, text),
                _ => Err(invalid("critique must be text".to_string())),
            },
            ContextField::Directive | ContextField::PreviousTitles => {
                Err(invalid(format!("{} is not a stage output", field)))
            }
        }
    }

    /// Add research citations, skipping duplicates
    pub fn add_sources(&mut self, sources: impl IntoIterator<Item = Source>) {
        for source in sources {
            if !self.sources.iter().any(|s| s.uri == source.uri) {
                self.sources.push(source);
            }
        }
    }

    pub(crate) fn into_parts(self) -> ContextParts {
        ContextParts {
            directive: self.directive,
            trend: self.trend.take(),
            problems: self.problems.take(),
            competition: self.competition.take(),
            monetization: self.monetization.take(),
            build: self.build.take(),
            final_draft: self.final_draft.take(),
            sources: self.sources,
        }
    }
}
