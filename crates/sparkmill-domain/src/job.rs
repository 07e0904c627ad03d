//! Job records - the pollable status of one pipeline run or batch
//!
//! A job moves `Pending -> Running -> Completed | Failed`. Progress updates
//! while running change the step and message but never the status. Both
//! terminal states freeze the record: every further mutation is rejected
//! with [`JobTransitionError::Terminal`].

use crate::ids::{ArtifactId, JobId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Created by a trigger, not yet picked up
    Pending,

    /// The orchestrator is advancing through stages
    Running,

    /// Finished with at least one artifact
    Completed,

    /// Aborted; see the record's error message
    Failed,
}

impl JobStatus {
    /// Get the status name as stored and displayed
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    /// Parse a status from its stored name
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(JobStatus::Pending),
            "RUNNING" => Some(JobStatus::Running),
            "COMPLETED" => Some(JobStatus::Completed),
            "FAILED" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Whether the status ends the record's mutation lifetime
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected job state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobTransitionError {
    /// The record is already `Completed` or `Failed`
    Terminal {
        /// Job that was addressed
        job_id: JobId,
        /// Its frozen status
        status: JobStatus,
    },

    /// The transition is not allowed from the current status
    InvalidTransition {
        /// Job that was addressed
        job_id: JobId,
        /// Current status
        from: JobStatus,
        /// Requested status
        to: JobStatus,
    },
}

impl fmt::Display for JobTransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobTransitionError::Terminal { job_id, status } => {
                write!(f, "job {} is already {} and can no longer change", job_id, status)
            }
            JobTransitionError::InvalidTransition { job_id, from, to } => {
                write!(f, "job {} cannot move from {} to {}", job_id, from, to)
            }
        }
    }
}

impl std::error::Error for JobTransitionError {}

/// Durable record of one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Job identifier (caller request id or generated)
    pub id: JobId,

    /// Lifecycle status
    pub status: JobStatus,

    /// Name of the stage most recently reported
    pub current_step: Option<String>,

    /// Human-readable progress message
    pub message: Option<String>,

    /// Artifacts produced, set on completion
    pub artifact_ids: Vec<ArtifactId>,

    /// Short user-facing failure message, set on failure
    pub error: Option<String>,

    /// Creation time (seconds since epoch)
    pub created_at: u64,

    /// Last mutation time (seconds since epoch)
    pub updated_at: u64,
}

impl JobRecord {
    /// Create a new pending record
    pub fn new(id: JobId, now: u64) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            current_step: None,
            message: Some("Queued".to_string()),
            artifact_ids: Vec::new(),
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn ensure_mutable(&self) -> Result<(), JobTransitionError> {
        if self.status.is_terminal() {
            return Err(JobTransitionError::Terminal {
                job_id: self.id.clone(),
                status: self.status,
            });
        }
        Ok(())
    }

    /// `Pending -> Running`
    pub fn start(&mut self, now: u64) -> Result<(), JobTransitionError> {
        self.ensure_mutable()?;
        if self.status != JobStatus::Pending {
            return Err(JobTransitionError::InvalidTransition {
                job_id: self.id.clone(),
                from: self.status,
                to: JobStatus::Running,
            });
        }
        self.status = JobStatus::Running;
        self.message = Some("Starting".to_string());
        self.updated_at = now;
        Ok(())
    }

    /// Record progress; status is left untouched
    pub fn record_progress(
        &mut self,
        step: impl Into<String>,
        message: impl Into<String>,
        now: u64,
    ) -> Result<(), JobTransitionError> {
        self.ensure_mutable()?;
        self.current_step = Some(step.into());
        self.message = Some(message.into());
        self.updated_at = now;
        Ok(())
    }

    /// Terminal transition to `Completed`
    pub fn complete(
        &mut self,
        artifact_ids: Vec<ArtifactId>,
        now: u64,
    ) -> Result<(), JobTransitionError> {
        self.ensure_mutable()?;
        self.status = JobStatus::Completed;
        self.artifact_ids = artifact_ids;
        self.message = Some("Completed".to_string());
        self.updated_at = now;
        Ok(())
    }

    /// Terminal transition to `Failed`
    pub fn fail(&mut self, error: impl Into<String>, now: u64) -> Result<(), JobTransitionError> {
        self.ensure_mutable()?;
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.message = Some("Failed".to_string());
        self.updated_at = now;
        Ok(())
    }
}
