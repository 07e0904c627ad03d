//! Sparkmill Pipeline
//!
//! Turns a trigger into one persisted idea by running a fixed sequence of
//! generation stages over a shared, write-once context.
//!
//! # Pipeline
//!
//! ```text
//! trend → problems → competition → monetization → build
//!       → synthesis → critique → synthesis (refined) → persist
//! ```
//!
//! Every JSON stage goes through the extractor cascade. Load-bearing stages
//! abort the run when they produce nothing usable; advisory stages are
//! skipped and later prompts degrade. Stages with a placeholder fallback
//! never abort.
//!
//! # Triggers
//!
//! - [`Orchestrator::run`]: one run against a pending job
//! - [`Orchestrator::run_scheduled`]: a paced batch, one job per run
//! - [`Orchestrator::run_on_demand`]: a paced batch reporting into the
//!   caller's job, completing with every artifact produced

#![warn(missing_docs)]

mod batch;
pub mod cache;
mod config;
pub mod context;
mod error;
mod metrics;
mod orchestrator;
pub mod prompts;
pub mod stage;
pub mod stages;

pub use batch::{BatchReport, RunPacer};
pub use cache::RefreshCache;
pub use config::PipelineConfig;
pub use context::{ContextField, PipelineContext};
pub use error::PipelineError;
pub use metrics::{PipelineMetrics, StageCounts};
pub use orchestrator::{Orchestrator, PipelineRun, Trigger};
pub use prompts::{PromptLibrary, PromptSource};
pub use stage::{OutputFormat, StageDefinition, StageInputs, StageOutcome, StagePolicy, StageUnit};
pub use tokio_util::sync::CancellationToken;
