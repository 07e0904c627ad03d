//! Error types for the pipeline

use thiserror::Error;

/// Errors that end a pipeline run
///
/// `Display` carries the full diagnostic for operational logs;
/// [`user_message`](PipelineError::user_message) is what a failed job shows.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A load-bearing stage produced neither a result nor a usable fallback
    #[error("Stage '{stage}' failed: {reason}")]
    StageFailed {
        /// Stage name
        stage: String,
        /// Diagnostic detail
        reason: String,
    },

    /// Stage list reads a field no earlier stage produces
    #[error("Invalid stage order: {0}")]
    InvalidStageOrder(String),

    /// A context slot was written twice in one run
    #[error("Context slot '{0}' is already set")]
    SlotAlreadySet(String),

    /// A field the artifact needs is absent after all stages ran
    #[error("Pipeline finished without '{0}'")]
    Incomplete(String),

    /// The artifact sink rejected the artifact
    #[error("Persistence failed: {0}")]
    Persistence(String),

    /// The job tracker could not create or finish a record
    #[error("Job tracker error: {0}")]
    Tracker(String),

    /// The run was cancelled between stages
    #[error("Pipeline run cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Short, non-technical message for the job record
    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineError::StageFailed { .. } | PipelineError::Incomplete(_) => {
                "We couldn't generate an idea this time. Please try again."
            }
            PipelineError::Persistence(_) => "Your idea was generated but could not be saved.",
            PipelineError::Cancelled => "Generation was cancelled",
            PipelineError::InvalidStageOrder(_)
            | PipelineError::SlotAlreadySet(_)
            | PipelineError::Tracker(_)
            | PipelineError::Config(_) => "Something went wrong on our side. Please try again later.",
        }
    }
}
