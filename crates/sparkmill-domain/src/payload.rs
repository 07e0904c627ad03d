//! Typed stage payloads accumulated by a pipeline run
//!
//! Each stage's validated JSON is decoded into one of these. Field names
//! follow the camelCase keys the prompts ask the generator to produce.

use serde::{Deserialize, Serialize};

/// One market trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trend {
    /// Short name of the trend
    pub name: String,

    /// What is happening and why it matters
    #[serde(default)]
    pub description: String,

    /// Evidence of momentum (growth figures, search volume, funding)
    #[serde(default)]
    pub evidence: Option<String>,
}

/// Output of trend research
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSummary {
    /// One-paragraph overview
    pub summary: String,

    /// Individual trends
    #[serde(default)]
    pub trends: Vec<Trend>,

    /// Trend the pipeline should build around
    #[serde(default)]
    pub focus: Option<String>,
}

/// One unmet need or market gap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    /// Short statement of the problem
    pub title: String,

    /// Who feels the pain and how
    #[serde(default)]
    pub description: String,

    /// 1-10 severity estimate
    #[serde(default)]
    pub severity: Option<f64>,
}

/// Output of problem analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemAnalysis {
    /// Problems and gaps found
    pub problems: Vec<Problem>,

    /// Who the problems affect
    pub target_audience: String,
}

/// One competitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competitor {
    /// Product or company name
    pub name: String,

    /// Where they fall short
    #[serde(default)]
    pub weakness: Option<String>,
}

/// Output of competitive analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitiveSummary {
    /// Landscape overview
    pub summary: String,

    /// Known competitors
    #[serde(default)]
    pub competitors: Vec<Competitor>,

    /// Where a newcomer could win
    #[serde(default)]
    pub differentiation: Option<String>,
}

/// One pricing tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingTier {
    /// Tier name
    pub name: String,

    /// Price as free text ("$9/mo")
    pub price: String,
}

/// Unit economics the monetization stage must report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyMetrics {
    /// Lifetime value estimate
    pub ltv: f64,

    /// Customer acquisition cost estimate
    pub cac: f64,
}

/// Output of the monetization stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonetizationPlan {
    /// Primary revenue model
    pub model: String,

    /// Pricing tiers
    #[serde(default)]
    pub pricing: Vec<PricingTier>,

    /// Unit economics
    pub key_metrics: KeyMetrics,

    /// Revenue potential narrative
    #[serde(default)]
    pub revenue_potential: Option<String>,
}

/// Output of the advisory "what to build" stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRecommendation {
    /// Smallest product that proves demand
    pub mvp: String,

    /// Suggested tech stack
    #[serde(default)]
    pub tech_stack: Vec<String>,

    /// Ordered build steps
    #[serde(default)]
    pub milestones: Vec<String>,
}

/// Output of an idea synthesis pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaDraft {
    /// Idea name
    pub title: String,

    /// One-line pitch
    #[serde(default)]
    pub tagline: Option<String>,

    /// Narrative description
    pub description: String,

    /// Sub-scores
    pub scores: crate::artifact::Scores,

    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Why now
    #[serde(default)]
    pub why_now: Option<String>,
}
