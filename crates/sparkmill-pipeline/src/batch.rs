//! Scheduled and on-demand batch triggers
//!
//! Consecutive runs in a batch are paced: a fixed delay after a success,
//! doubling after each failure up to the configured ceiling.

use crate::error::PipelineError;
use crate::orchestrator::{Orchestrator, Trigger};
use sparkmill_domain::traits::{ArtifactSink, GenerationClient, JobTracker};
use sparkmill_domain::{ArtifactId, JobId};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Delay policy between consecutive runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPacer {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl RunPacer {
    /// Pacer starting at `base`, never exceeding `max`
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            current: base,
        }
    }

    /// Delay before the next run
    pub fn next_delay(&self) -> Duration {
        self.current
    }

    /// Adjust after a run
    pub fn record(&mut self, success: bool) {
        self.current = if success {
            self.base
        } else {
            self.current
                .saturating_mul(2)
                .max(Duration::from_secs(1))
                .min(self.max)
        };
    }

    /// Sleep for the current delay; `false` if cancelled meanwhile
    pub async fn wait(&self, cancel: &CancellationToken) -> bool {
        if self.current.is_zero() {
            return !cancel.is_cancelled();
        }
        tokio::select! {
            _ = tokio::time::sleep(self.current) => true,
            _ = cancel.cancelled() => false,
        }
    }
}

/// Outcome of a batch
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Jobs the batch wrote to
    pub job_ids: Vec<JobId>,
    /// Artifacts produced, in order
    pub artifact_ids: Vec<ArtifactId>,
    /// Diagnostics of failed runs
    pub failures: Vec<String>,
    /// Whether the batch stopped early on cancellation
    pub cancelled: bool,
}

impl BatchReport {
    /// Runs attempted
    pub fn attempted(&self) -> usize {
        self.artifact_ids.len() + self.failures.len()
    }
}

impl<G, T, S> Orchestrator<G, T, S>
where
    G: GenerationClient + 'static,
    T: JobTracker,
    S: ArtifactSink,
{
    fn pacer(&self) -> RunPacer {
        RunPacer::new(self.config().inter_run_delay(), self.config().max_backoff())
    }

    /// Scheduled batch: one fresh job per run, no user input
    pub async fn run_scheduled(&self, cancel: &CancellationToken) -> BatchReport {
        let size = self.config().scheduled_batch_size;
        let mut pacer = self.pacer();
        let mut report = BatchReport::default();

        info!("Scheduled batch started ({} runs)", size);

        for index in 0..size {
            if index > 0 && !pacer.wait(cancel).await {
                report.cancelled = true;
                break;
            }
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let job_id = JobId::generate();
            if let Err(e) = self.tracker().create(&job_id) {
                error!("Could not create job for scheduled run {}: {}", index + 1, e);
                report.failures.push(format!("job creation failed: {}", e));
                pacer.record(false);
                continue;
            }
            report.job_ids.push(job_id.clone());

            match self.run(&job_id, &Trigger::scheduled(), cancel).await {
                Ok(run) => {
                    report.artifact_ids.push(run.artifact_id);
                    pacer.record(true);
                }
                Err(PipelineError::Cancelled) => {
                    report.cancelled = true;
                    break;
                }
                Err(e) => {
                    report.failures.push(e.to_string());
                    pacer.record(false);
                }
            }
        }

        info!(
            "Scheduled batch finished: {} produced, {} failed",
            report.artifact_ids.len(),
            report.failures.len()
        );
        report
    }

    /// On-demand batch: every run reports into the caller's job
    ///
    /// The job completes with every artifact produced and fails only when no
    /// run succeeded.
    pub async fn run_on_demand(
        &self,
        request_id: &JobId,
        trigger: &Trigger,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, PipelineError> {
        let size = self.config().on_demand_batch_size;
        let tracker_err = |e: T::Error| PipelineError::Tracker(e.to_string());

        self.tracker().create(request_id).map_err(tracker_err)?;
        if let Err(e) = self.tracker().start(request_id) {
            let err = tracker_err(e);
            error!("On-demand batch {} could not start: {}", request_id, err);
            self.fail_job(request_id, &err);
            return Err(err);
        }

        let mut pacer = self.pacer();
        let mut report = BatchReport {
            job_ids: vec![request_id.clone()],
            ..Default::default()
        };
        let mut last_error = None;

        info!("On-demand batch {} started ({} runs)", request_id, size);

        for index in 0..size {
            if index > 0 && !pacer.wait(cancel).await {
                report.cancelled = true;
                break;
            }
            self.progress(
                request_id,
                "batch",
                &format!("Generating idea {} of {}", index + 1, size),
            );

            match self.execute(request_id, trigger, cancel).await {
                Ok(run) => {
                    report.artifact_ids.push(run.artifact_id);
                    pacer.record(true);
                }
                Err(PipelineError::Cancelled) => {
                    report.cancelled = true;
                    break;
                }
                Err(e) => {
                    warn!("Run {}/{} of {} failed: {}", index + 1, size, request_id, e);
                    report.failures.push(e.to_string());
                    last_error = Some(e);
                    pacer.record(false);
                }
            }
        }

        if report.artifact_ids.is_empty() {
            let err = if report.cancelled {
                PipelineError::Cancelled
            } else {
                last_error.unwrap_or_else(|| PipelineError::Incomplete("artifacts".to_string()))
            };
            error!("On-demand batch {} produced nothing: {}", request_id, err);
            self.fail_job(request_id, &err);
            return Err(err);
        }

        self.complete_job(request_id, &report.artifact_ids)?;
        info!(
            "On-demand batch {} completed: {} of {} runs produced an idea",
            request_id,
            report.artifact_ids.len(),
            size
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pacer_doubles_and_resets() {
        let mut pacer = RunPacer::new(Duration::from_secs(5), Duration::from_secs(30));
        assert_eq!(pacer.next_delay(), Duration::from_secs(5));
        pacer.record(false);
        assert_eq!(pacer.next_delay(), Duration::from_secs(10));
        pacer.record(false);
        pacer.record(false);
        assert_eq!(pacer.next_delay(), Duration::from_secs(30));
        pacer.record(true);
        assert_eq!(pacer.next_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_doubling_saturates_at_huge_ceiling() {
        let mut pacer = RunPacer::new(Duration::from_secs(u64::MAX / 2 + 1), Duration::MAX);
        pacer.record(false);
        assert_eq!(pacer.next_delay(), Duration::MAX);
        pacer.record(false);
        assert_eq!(pacer.next_delay(), Duration::MAX);
    }

    #[test]
    fn test_zero_ceiling_never_sleeps() {
        let mut pacer = RunPacer::new(Duration::ZERO, Duration::ZERO);
        pacer.record(false);
        assert_eq!(pacer.next_delay(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_sleeps_for_delay() {
        let pacer = RunPacer::new(Duration::from_secs(5), Duration::from_secs(5));
        let start = tokio::time::Instant::now();
        assert!(pacer.wait(&CancellationToken::new()).await);
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_stops_on_cancel() {
        let pacer = RunPacer::new(Duration::from_secs(600), Duration::from_secs(600));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });
        assert!(!pacer.wait(&cancel).await);
    }
}
