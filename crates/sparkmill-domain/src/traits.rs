//! Trait definitions for external interactions
//!
//! These traits define the boundaries between pipeline logic and
//! infrastructure. Implementations live in other crates.

use crate::{ArtifactId, GeneratedArtifact, GenerationRequest, GenerationResponse, JobId, JobRecord};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Trait for the external text-generation service
///
/// Implemented by the infrastructure layer (sparkmill-llm). Every call is a
/// potential long-latency suspension point.
///
/// `Ok` with `text: None` means the service answered without content;
/// `Err` means the call itself failed (transport, timeout, HTTP status).
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Error type for transport-level failures
    type Error: fmt::Display + Send;

    /// Run one generation call
    async fn generate(&self, request: &GenerationRequest)
        -> Result<GenerationResponse, Self::Error>;

    /// Short model name for logs and metadata
    fn model_name(&self) -> &str {
        "unknown"
    }
}

#[async_trait]
impl<T: GenerationClient + ?Sized> GenerationClient for Arc<T> {
    type Error = T::Error;

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, Self::Error> {
        (**self).generate(request).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Trait for durable, pollable job records
///
/// Implemented by the infrastructure layer (sparkmill-store). Only the
/// orchestrator running a job writes to it; pollers only call [`read`].
/// Mutating a terminal record is an error.
///
/// [`read`]: JobTracker::read
pub trait JobTracker: Send + Sync {
    /// Error type for tracker operations
    type Error: fmt::Display + Send;

    /// Create a `Pending` record
    fn create(&self, id: &JobId) -> Result<JobRecord, Self::Error>;

    /// Move a record to `Running`
    fn start(&self, id: &JobId) -> Result<(), Self::Error>;

    /// Record progress without changing status
    fn update(&self, id: &JobId, step: &str, message: &str) -> Result<(), Self::Error>;

    /// Terminal transition to `Completed`
    fn complete(&self, id: &JobId, artifact_ids: &[ArtifactId]) -> Result<(), Self::Error>;

    /// Terminal transition to `Failed` with a short user-facing message
    fn fail(&self, id: &JobId, message: &str) -> Result<(), Self::Error>;

    /// Read the current record
    fn read(&self, id: &JobId) -> Result<Option<JobRecord>, Self::Error>;
}

impl<T: JobTracker + ?Sized> JobTracker for Arc<T> {
    type Error = T::Error;

    fn create(&self, id: &JobId) -> Result<JobRecord, Self::Error> {
        (**self).create(id)
    }

    fn start(&self, id: &JobId) -> Result<(), Self::Error> {
        (**self).start(id)
    }

    fn update(&self, id: &JobId, step: &str, message: &str) -> Result<(), Self::Error> {
        (**self).update(id, step, message)
    }

    fn complete(&self, id: &JobId, artifact_ids: &[ArtifactId]) -> Result<(), Self::Error> {
        (**self).complete(id, artifact_ids)
    }

    fn fail(&self, id: &JobId, message: &str) -> Result<(), Self::Error> {
        (**self).fail(id, message)
    }

    fn read(&self, id: &JobId) -> Result<Option<JobRecord>, Self::Error> {
        (**self).read(id)
    }
}

/// Trait for the persistence collaborator that takes finished artifacts
///
/// Implemented by the infrastructure layer (sparkmill-store). A call may be
/// multi-step internally; it either stores everything or nothing.
pub trait ArtifactSink: Send + Sync {
    /// Error type for persistence operations
    type Error: fmt::Display + Send;

    /// Persist an artifact and its sub-records, returning a stable id
    fn persist(&self, artifact: &GeneratedArtifact) -> Result<ArtifactId, Self::Error>;

    /// Titles of the most recent artifacts, newest first
    fn recent_titles(&self, limit: usize) -> Result<Vec<String>, Self::Error>;

    /// Load a stored artifact
    fn load(&self, id: ArtifactId) -> Result<Option<GeneratedArtifact>, Self::Error>;
}

impl<T: ArtifactSink + ?Sized> ArtifactSink for Arc<T> {
    type Error = T::Error;

    fn persist(&self, artifact: &GeneratedArtifact) -> Result<ArtifactId, Self::Error> {
        (**self).persist(artifact)
    }

    fn recent_titles(&self, limit: usize) -> Result<Vec<String>, Self::Error> {
        (**self).recent_titles(limit)
    }

    fn load(&self, id: ArtifactId) -> Result<Option<GeneratedArtifact>, Self::Error> {
        (**self).load(id)
    }
}
