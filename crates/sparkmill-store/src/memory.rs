//! In-memory stores for tests and dry runs

use crate::StoreError;
use sparkmill_domain::traits::{ArtifactSink, JobTracker};
use sparkmill_domain::{
    current_timestamp, ArtifactId, GeneratedArtifact, JobId, JobRecord, JobStatus,
    JobTransitionError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

struct JobEntry {
    record: JobRecord,
    statuses: Vec<JobStatus>,
    steps: Vec<String>,
    updates: Vec<(String, String)>,
}

/// Job tracker kept in a map, with the status history of every job
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<JobId, JobEntry>>,
    failing_starts: AtomicUsize,
    failing_completions: AtomicUsize,
}

impl MemoryJobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn jobs(&self) -> Result<MutexGuard<'_, HashMap<JobId, JobEntry>>, StoreError> {
        self.jobs.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Make the next `count` calls to `start` fail
    pub fn fail_next_starts(&self, count: usize) {
        self.failing_starts.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` calls to `complete` fail
    pub fn fail_next_completions(&self, count: usize) {
        self.failing_completions.store(count, Ordering::SeqCst);
    }

    fn injected_failure(counter: &AtomicUsize, op: &str) -> Result<(), StoreError> {
        let armed = counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if armed {
            return Err(StoreError::Unavailable(format!("{} rejected", op)));
        }
        Ok(())
    }

    fn mutate(
        &self,
        id: &JobId,
        f: impl FnOnce(&mut JobRecord, u64) -> Result<(), JobTransitionError>,
    ) -> Result<(), StoreError> {
        let mut jobs = self.jobs()?;
        let entry = jobs
            .get_mut(id)
            .ok_or_else(|| StoreError::JobNotFound(id.to_string()))?;
        let record = &mut entry.record;

        f(record, current_timestamp())?;

        let status = record.status;
        if let Some(step) = record.current_step.clone() {
            if entry.steps.last() != Some(&step) {
                entry.steps.push(step);
            }
        }
        if entry.statuses.last() != Some(&status) {
            entry.statuses.push(status);
        }
        Ok(())
    }

    /// Every status the job has been in, oldest first
    pub fn status_history(&self, id: &JobId) -> Vec<JobStatus> {
        self.jobs()
            .ok()
            .and_then(|jobs| jobs.get(id).map(|e| e.statuses.clone()))
            .unwrap_or_default()
    }

    /// Distinct progress steps the job reported, in order
    pub fn step_history(&self, id: &JobId) -> Vec<String> {
        self.jobs()
            .ok()
            .and_then(|jobs| jobs.get(id).map(|e| e.steps.clone()))
            .unwrap_or_default()
    }

    /// Every `(step, message)` progress update, in order
    pub fn progress_history(&self, id: &JobId) -> Vec<(String, String)> {
        self.jobs()
            .ok()
            .and_then(|jobs| jobs.get(id).map(|e| e.updates.clone()))
            .unwrap_or_default()
    }

    /// Number of jobs created
    pub fn len(&self) -> usize {
        self.jobs().map(|jobs| jobs.len()).unwrap_or_default()
    }

    /// Whether no job was created yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All job records
    pub fn records(&self) -> Vec<JobRecord> {
        self.jobs()
            .map(|jobs| jobs.values().map(|e| e.record.clone()).collect())
            .unwrap_or_default()
    }
}

impl JobTracker for MemoryJobStore {
    type Error = StoreError;

    fn create(&self, id: &JobId) -> Result<JobRecord, StoreError> {
        let mut jobs = self.jobs()?;
        if jobs.contains_key(id) {
            return Err(StoreError::DuplicateJob(id.to_string()));
        }
        let record = JobRecord::new(id.clone(), current_timestamp());
        jobs.insert(
            id.clone(),
            JobEntry {
                record: record.clone(),
                statuses: vec![record.status],
                steps: Vec::new(),
                updates: Vec::new(),
            },
        );
        Ok(record)
    }

    fn start(&self, id: &JobId) -> Result<(), StoreError> {
        Self::injected_failure(&self.failing_starts, "start")?;
        self.mutate(id, |record, now| record.start(now))
    }

    fn update(&self, id: &JobId, step: &str, message: &str) -> Result<(), StoreError> {
        self.mutate(id, |record, now| record.record_progress(step, message, now))?;
        if let Some(entry) = self.jobs()?.get_mut(id) {
            entry.updates.push((step.to_string(), message.to_string()));
        }
        Ok(())
    }

    fn complete(&self, id: &JobId, artifact_ids: &[ArtifactId]) -> Result<(), StoreError> {
        Self::injected_failure(&self.failing_completions, "complete")?;
        self.mutate(id, |record, now| record.complete(artifact_ids.to_vec(), now))
    }

    fn fail(&self, id: &JobId, message: &str) -> Result<(), StoreError> {
        self.mutate(id, |record, now| record.fail(message, now))
    }

    fn read(&self, id: &JobId) -> Result<Option<JobRecord>, StoreError> {
        Ok(self.jobs()?.get(id).map(|e| e.record.clone()))
    }
}

/// Artifact sink kept in a vector, with switchable write failure
#[derive(Default)]
pub struct MemoryArtifactStore {
    artifacts: Mutex<Vec<(ArtifactId, GeneratedArtifact)>>,
    reject_writes: AtomicBool,
}

impl MemoryArtifactStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `persist` fail
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    fn artifacts(
        &self,
    ) -> Result<MutexGuard<'_, Vec<(ArtifactId, GeneratedArtifact)>>, StoreError> {
        self.artifacts.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Persisted artifacts, oldest first
    pub fn all(&self) -> Vec<(ArtifactId, GeneratedArtifact)> {
        self.artifacts().map(|a| a.clone()).unwrap_or_default()
    }

    /// Number of persisted artifacts
    pub fn len(&self) -> usize {
        self.artifacts().map(|a| a.len()).unwrap_or_default()
    }

    /// Whether nothing was persisted
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArtifactSink for MemoryArtifactStore {
    type Error = StoreError;

    fn persist(&self, artifact: &GeneratedArtifact) -> Result<ArtifactId, StoreError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes are disabled".to_string()));
        }
        let id = ArtifactId::new();
        self.artifacts()?.push((id, artifact.clone()));
        Ok(id)
    }

    fn recent_titles(&self, limit: usize) -> Result<Vec<String>, StoreError> {
        Ok(self
            .artifacts()?
            .iter()
            .rev()
            .take(limit)
            .map(|(_, a)| a.title.clone())
            .collect())
    }

    fn load(&self, id: ArtifactId) -> Result<Option<GeneratedArtifact>, StoreError> {
        Ok(self
            .artifacts()?
            .iter()
            .find(|(stored, _)| *stored == id)
            .map(|(_, a)| a.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_history_tracks_transitions() {
        let store = MemoryJobStore::new();
        let id = JobId::from("job-1");
        store.create(&id).unwrap();
        store.start(&id).unwrap();
        store.update(&id, "trend_research", "Researching").unwrap();
        store.update(&id, "problem_analysis", "Analysing").unwrap();
        store.complete(&id, &[ArtifactId::new()]).unwrap();

        assert_eq!(
            store.status_history(&id),
            vec![JobStatus::Pending, JobStatus::Running, JobStatus::Completed]
        );
        assert_eq!(store.step_history(&id), vec!["trend_research", "problem_analysis"]);
    }

    #[test]
    fn test_injected_completion_failures_run_out() {
        let store = MemoryJobStore::new();
        let id = JobId::from("job-flaky");
        store.create(&id).unwrap();
        store.start(&id).unwrap();
        store.update(&id, "trend_research", "Researching").unwrap();
        store.fail_next_completions(1);

        assert!(matches!(store.complete(&id, &[]), Err(StoreError::Unavailable(_))));
        assert_eq!(store.read(&id).unwrap().unwrap().status, JobStatus::Running);
        store.complete(&id, &[]).unwrap();
        assert_eq!(store.read(&id).unwrap().unwrap().status, JobStatus::Completed);
        assert_eq!(
            store.progress_history(&id),
            vec![("trend_research".to_string(), "Researching".to_string())]
        );
    }

    #[test]
    fn test_terminal_record_is_frozen() {
        let store = MemoryJobStore::new();
        let id = JobId::from("job-2");
        store.create(&id).unwrap();
        store.start(&id).unwrap();
        store.fail(&id, "boom").unwrap();

        assert!(matches!(
            store.update(&id, "late", "too late"),
            Err(StoreError::Transition(JobTransitionError::Terminal { .. }))
        ));
        assert_eq!(store.read(&id).unwrap().unwrap().error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_duplicate_create_rejected() {
        let store = MemoryJobStore::new();
        let id = JobId::from("job-3");
        store.create(&id).unwrap();
        assert!(matches!(store.create(&id), Err(StoreError::DuplicateJob(_))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unknown_job() {
        let store = MemoryJobStore::new();
        assert!(store.read(&JobId::from("nope")).unwrap().is_none());
        assert!(matches!(
            store.start(&JobId::from("nope")),
            Err(StoreError::JobNotFound(_))
        ));
    }
}
