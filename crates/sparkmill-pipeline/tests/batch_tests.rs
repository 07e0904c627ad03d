//! Integration tests for scheduled and on-demand batches

mod common;

use common::*;
use sparkmill_domain::traits::JobTracker;
use sparkmill_domain::{JobId, JobStatus};
use sparkmill_pipeline::{CancellationToken, PipelineConfig, PipelineError, Trigger};
use std::time::Duration;

fn batch_config(scheduled: usize, on_demand: usize) -> PipelineConfig {
    PipelineConfig {
        scheduled_batch_size: scheduled,
        on_demand_batch_size: on_demand,
        ..PipelineConfig::fast()
    }
}

#[tokio::test]
async fn test_scheduled_batch_creates_one_job_per_run() {
    let h = harness(scripted_mock(), batch_config(2, 3));

    let report = h.orchestrator.run_scheduled(&CancellationToken::new()).await;

    assert_eq!(report.artifact_ids.len(), 2);
    assert_eq!(report.job_ids.len(), 2);
    assert!(report.failures.is_empty());
    assert!(!report.cancelled);
    assert_eq!(h.jobs.len(), 2);
    for id in &report.job_ids {
        let job = h.jobs.read(id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.artifact_ids.len(), 1);
    }
    assert_eq!(h.artifacts.len(), 2);
}

#[tokio::test]
async fn test_scheduled_batch_continues_after_failure() {
    let h = harness(
        mock_with_override("Task: problem_analysis", None),
        batch_config(2, 3),
    );

    let report = h.orchestrator.run_scheduled(&CancellationToken::new()).await;
    assert!(report.artifact_ids.is_empty());
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.attempted(), 2);
    for id in &report.job_ids {
        assert_eq!(h.jobs.read(id).unwrap().unwrap().status, JobStatus::Failed);
    }
}

#[tokio::test]
async fn test_on_demand_batch_completes_single_job() {
    let h = harness(scripted_mock(), batch_config(4, 3));
    let request_id = JobId::from("req-42");
    let trigger = Trigger::on_demand("vegan meal planning for office workers", None);

    let report = h
        .orchestrator
        .run_on_demand(&request_id, &trigger, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.artifact_ids.len(), 3);
    assert_eq!(h.jobs.len(), 1);

    let job = h.jobs.read(&request_id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.artifact_ids, report.artifact_ids);
    assert_eq!(
        h.jobs.status_history(&request_id),
        vec![JobStatus::Pending, JobStatus::Running, JobStatus::Completed]
    );
    assert!(h.jobs.step_history(&request_id).contains(&"batch".to_string()));
}

#[tokio::test]
async fn test_on_demand_batch_fails_when_nothing_produced() {
    let h = harness(
        mock_with_override("Task: competitive_analysis", Some("no idea")),
        PipelineConfig {
            use_stage_fallbacks: false,
            ..batch_config(4, 2)
        },
    );
    let request_id = JobId::from("req-empty");

    let err = h
        .orchestrator
        .run_on_demand(&request_id, &Trigger::scheduled(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::StageFailed { .. }));

    let job = h.jobs.read(&request_id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some(err.user_message()));
    assert_eq!(h.mock.calls_matching("Task: competitive_analysis"), 2);
}

#[tokio::test]
async fn test_on_demand_batch_cancelled_before_start() {
    let h = harness(scripted_mock(), batch_config(4, 3));
    let request_id = JobId::from("req-cancelled");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = h
        .orchestrator
        .run_on_demand(&request_id, &Trigger::scheduled(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Cancelled));
    assert_eq!(h.mock.call_count(), 0);
    let job = h.jobs.read(&request_id).unwrap().unwrap();
    assert_eq!(job.error.as_deref(), Some("Generation was cancelled"));
}

#[tokio::test]
async fn test_on_demand_reuses_existing_request_id_rejected() {
    let h = harness(scripted_mock(), batch_config(4, 1));
    let request_id = JobId::from("req-dup");
    h.jobs.create(&request_id).unwrap();

    let err = h
        .orchestrator
        .run_on_demand(&request_id, &Trigger::scheduled(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Tracker(_)));
    assert_eq!(h.mock.call_count(), 0);
}

#[tokio::test]
async fn test_on_demand_start_failure_fails_job() {
    let h = harness(scripted_mock(), batch_config(4, 2));
    h.jobs.fail_next_starts(1);
    let request_id = JobId::from("req-nostart");

    let err = h
        .orchestrator
        .run_on_demand(&request_id, &Trigger::scheduled(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Tracker(_)));
    assert_eq!(h.mock.call_count(), 0);

    let job = h.jobs.read(&request_id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some(err.user_message()));
}

#[tokio::test]
async fn test_on_demand_unrecordable_completion_fails_job() {
    let h = harness(scripted_mock(), batch_config(4, 2));
    h.jobs.fail_next_completions(2);
    let request_id = JobId::from("req-nocomplete");

    let err = h
        .orchestrator
        .run_on_demand(&request_id, &Trigger::scheduled(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Tracker(_)));

    let job = h.jobs.read(&request_id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(h.artifacts.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_runs_are_paced() {
    let config = PipelineConfig {
        inter_run_delay_secs: 5,
        max_backoff_secs: 60,
        ..batch_config(3, 3)
    };
    let h = harness(scripted_mock(), config);

    let start = tokio::time::Instant::now();
    let report = h.orchestrator.run_scheduled(&CancellationToken::new()).await;

    assert_eq!(report.artifact_ids.len(), 3);
    assert!(start.elapsed() >= Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_pacing_stops_batch() {
    let config = PipelineConfig {
        inter_run_delay_secs: 30,
        max_backoff_secs: 60,
        ..batch_config(3, 3)
    };
    let h = harness(scripted_mock(), config);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        trigger.cancel();
    });

    let report = h.orchestrator.run_scheduled(&cancel).await;
    assert!(report.cancelled);
    assert_eq!(report.artifact_ids.len(), 1);
}
