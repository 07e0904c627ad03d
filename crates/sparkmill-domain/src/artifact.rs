//! The synthesized idea a pipeline run produces

use crate::generation::Source;
use crate::payload::{
    BuildRecommendation, CompetitiveSummary, MonetizationPlan, ProblemAnalysis, TrendSummary,
};
use serde::{Deserialize, Serialize};

/// JSON keys of the ten sub-scores, in declaration order
pub const SCORE_FIELDS: [&str; 10] = [
    "opportunity",
    "problemSeverity",
    "feasibility",
    "whyNow",
    "marketSize",
    "revenuePotential",
    "executionDifficulty",
    "goToMarket",
    "defensibility",
    "founderFit",
];

/// Ten 0-10 sub-scores attached to every idea
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scores {
    /// Overall size of the opportunity
    pub opportunity: f64,
    /// How painful the problem is
    pub problem_severity: f64,
    /// How buildable it is with current technology
    pub feasibility: f64,
    /// Timeliness
    pub why_now: f64,
    /// Addressable market
    pub market_size: f64,
    /// Revenue ceiling
    pub revenue_potential: f64,
    /// Higher means harder to execute
    pub execution_difficulty: f64,
    /// Ease of reaching customers
    pub go_to_market: f64,
    /// Moat strength
    pub defensibility: f64,
    /// How well a small team fits the idea
    pub founder_fit: f64,
}

impl Scores {
    /// Scores in [`SCORE_FIELDS`] order
    pub fn values(&self) -> [f64; 10] {
        [
            self.opportunity,
            self.problem_severity,
            self.feasibility,
            self.why_now,
            self.market_size,
            self.revenue_potential,
            self.execution_difficulty,
            self.go_to_market,
            self.defensibility,
            self.founder_fit,
        ]
    }

    /// Mean of all sub-scores
    pub fn average(&self) -> f64 {
        self.values().iter().sum::<f64>() / SCORE_FIELDS.len() as f64
    }

    /// Clamp every sub-score into 0-10
    pub fn clamped(mut self) -> Self {
        for v in [
            &mut self.opportunity,
            &mut self.problem_severity,
            &mut self.feasibility,
            &mut self.why_now,
            &mut self.market_size,
            &mut self.revenue_potential,
            &mut self.execution_difficulty,
            &mut self.go_to_market,
            &mut self.defensibility,
            &mut self.founder_fit,
        ] {
            *v = v.clamp(0.0, 10.0);
        }
        self
    }
}

/// Final artifact assembled from a complete pipeline context
///
/// Owned by the orchestrator until handed to an `ArtifactSink`; after that
/// the pipeline never touches it again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedArtifact {
    /// Idea name
    pub title: String,
    /// One-line pitch
    pub tagline: Option<String>,
    /// Narrative description
    pub description: String,
    /// Ten sub-scores
    pub scores: Scores,
    /// Free-form tags
    pub tags: Vec<String>,
    /// Why now
    pub why_now: Option<String>,
    /// Trend research this idea rests on
    pub trend: TrendSummary,
    /// Problems and audience
    pub problems: ProblemAnalysis,
    /// Competitive landscape
    pub competition: CompetitiveSummary,
    /// Monetization plan
    pub monetization: MonetizationPlan,
    /// Advisory build plan; absent when that stage produced nothing
    pub build: Option<BuildRecommendation>,
    /// Research citations gathered along the way
    pub sources: Vec<Source>,
    /// Free-text directive from an on-demand request
    pub directive: Option<String>,
    /// Requesting user for on-demand runs
    pub user_id: Option<String>,
    /// Creation time (seconds since epoch)
    pub created_at: u64,
}
