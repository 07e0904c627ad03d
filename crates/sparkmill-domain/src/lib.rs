//! Sparkmill Domain Layer
//!
//! Core model for the idea-generation pipeline. Everything here is pure data
//! plus the trait boundaries that infrastructure crates implement.
//!
//! ## Key Concepts
//!
//! - **Job**: the durable, pollable record of one pipeline run or batch
//! - **Stage payloads**: the typed slots a pipeline run accumulates
//! - **Artifact**: the synthesized idea handed to persistence
//! - **Generation client**: the external, unreliable text generator
//!
//! ## Architecture
//!
//! - No I/O in this crate
//! - Infrastructure implementations live in `sparkmill-llm` and `sparkmill-store`
//! - Trait definitions for all external interactions live in [`traits`]

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod artifact;
pub mod generation;
pub mod ids;
pub mod job;
pub mod payload;
pub mod traits;

// Re-exports for convenience
pub use artifact::{GeneratedArtifact, Scores, SCORE_FIELDS};
pub use generation::{
    FinishReason, GenerationMode, GenerationRequest, GenerationResponse, SamplingConfig, Source,
    Usage,
};
pub use ids::{ArtifactId, JobId};
pub use job::{JobRecord, JobStatus, JobTransitionError};
pub use payload::{
    BuildRecommendation, CompetitiveSummary, Competitor, IdeaDraft, KeyMetrics,
    MonetizationPlan, PricingTier, Problem, ProblemAnalysis, Trend, TrendSummary,
};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current timestamp in seconds since Unix epoch
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
