//! Integration tests for single pipeline runs

mod common;

use common::*;
use sparkmill_domain::traits::JobTracker;
use sparkmill_domain::{JobId, JobStatus, Source};
use sparkmill_extractor::Strategy;
use sparkmill_llm::MockProvider;
use sparkmill_pipeline::{stages, CancellationToken, PipelineConfig, PipelineError, Trigger};

const DIRECTIVE: &str = "vegan meal planning for office workers";

async fn run_job(
    h: &Harness,
    id: &str,
    trigger: &Trigger,
) -> Result<sparkmill_pipeline::PipelineRun, PipelineError> {
    let job_id = JobId::from(id);
    h.jobs.create(&job_id).unwrap();
    h.orchestrator
        .run(&job_id, trigger, &CancellationToken::new())
        .await
}

#[tokio::test]
async fn test_end_to_end_directive_run() {
    let h = harness(scripted_mock(), PipelineConfig::fast());
    let trigger = Trigger::on_demand(DIRECTIVE, Some("user-7".to_string()));

    let run = run_job(&h, "req-1", &trigger).await.unwrap();

    let job = h.jobs.read(&JobId::from("req-1")).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.artifact_ids, vec![run.artifact_id]);
    assert_eq!(
        h.jobs.status_history(&JobId::from("req-1")),
        vec![JobStatus::Pending, JobStatus::Running, JobStatus::Completed]
    );

    let artifact = &run.artifact;
    assert_eq!(artifact.title, "LunchLoop");
    assert_eq!(artifact.scores.values(), [8.0, 7.0, 9.0, 6.0, 7.0, 6.0, 4.0, 7.0, 3.0, 8.0]);
    assert_eq!(artifact.directive.as_deref(), Some(DIRECTIVE));
    assert_eq!(artifact.user_id.as_deref(), Some("user-7"));
    assert_eq!(artifact.problems.target_audience, "Office workers");
    assert_eq!(artifact.monetization.key_metrics.ltv, 480.0);
    assert!(artifact.build.is_some());

    assert_eq!(h.artifacts.len(), 1);
    assert!(run.degraded_stages.is_empty());
    assert!(run.skipped_stages.is_empty());

    // One call per stage, no repair
    assert_eq!(h.mock.call_count(), 8);
    assert!(prompt_for(&h.mock, "trend_research").unwrap().contains(DIRECTIVE));
}

#[tokio::test]
async fn test_progress_steps_follow_stage_order() {
    let h = harness(scripted_mock(), PipelineConfig::fast());
    run_job(&h, "req-steps", &Trigger::scheduled()).await.unwrap();

    let mut expected: Vec<String> = h
        .orchestrator
        .stage_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    expected.push("persist".to_string());
    let job_id = JobId::from("req-steps");
    assert_eq!(h.jobs.step_history(&job_id), expected);

    // Each stage reports once when it starts and once when it finishes
    let updates = h.jobs.progress_history(&job_id);
    let total = h.orchestrator.stage_names().len();
    for (index, name) in h.orchestrator.stage_names().into_iter().enumerate() {
        let for_stage: Vec<&String> = updates
            .iter()
            .filter(|(step, _)| step == name)
            .map(|(_, message)| message)
            .collect();
        assert_eq!(for_stage.len(), 2, "stage {}", name);
        assert_eq!(
            for_stage[1],
            &format!("{} done ({}/{})", name, index + 1, total)
        );
    }

    // The last stage's completion lands before the persist step
    let persist_at = updates.iter().position(|(step, _)| step == "persist").unwrap();
    assert!(updates[persist_at - 1].1.starts_with("synthesis_refined done"));
}

#[tokio::test]
async fn test_load_bearing_failure_aborts_run() {
    let h = harness(
        mock_with_override("Task: problem_analysis", None),
        PipelineConfig::fast(),
    );

    let err = run_job(&h, "req-abort", &Trigger::scheduled()).await.unwrap_err();
    assert!(matches!(err, PipelineError::StageFailed { ref stage, .. } if stage == "problem_analysis"));

    // Nothing after the failed stage was asked for
    assert_eq!(h.mock.calls_matching("Task: trend_research"), 1);
    assert_eq!(h.mock.calls_matching("Task: competitive_analysis"), 0);
    assert_eq!(h.mock.calls_matching("Task: synthesis"), 0);

    let job = h.jobs.read(&JobId::from("req-abort")).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some(err.user_message()));
    assert!(!job.error.unwrap().contains("problem_analysis"));
    assert!(h.artifacts.is_empty());
}

#[tokio::test]
async fn test_advisory_failure_degrades_gracefully() {
    let h = harness(
        mock_with_error("Task: build_recommendation"),
        PipelineConfig::fast(),
    );

    let run = run_job(&h, "req-advisory", &Trigger::scheduled()).await.unwrap();
    assert!(run.artifact.build.is_none());
    assert_eq!(run.skipped_stages, vec!["build_recommendation"]);

    let job = h.jobs.read(&JobId::from("req-advisory")).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);

    let synthesis = prompt_for(&h.mock, "synthesis").unwrap();
    assert!(!synthesis.contains("MVP:"));
}

#[tokio::test]
async fn test_missing_trend_uses_placeholder() {
    let h = harness(
        mock_with_override("Task: trend_research", None),
        PipelineConfig::fast(),
    );

    let run = run_job(&h, "req-fallback", &Trigger::scheduled()).await.unwrap();
    assert_eq!(run.degraded_stages, vec!["trend_research"]);
    assert_eq!(run.artifact.trend.summary, "Trend research unavailable");
    assert!(run.artifact.trend.trends.is_empty());

    let metrics = h.orchestrator.metrics();
    assert_eq!(metrics.total_fallbacks(), 1);
    assert_eq!(metrics.stages["trend_research"].fallback, 1);
}

#[tokio::test]
async fn test_fallbacks_disabled_make_trend_fatal() {
    let config = PipelineConfig {
        use_stage_fallbacks: false,
        ..PipelineConfig::fast()
    };
    let h = harness(mock_with_override("Task: trend_research", None), config);

    let err = run_job(&h, "req-nofallback", &Trigger::scheduled()).await.unwrap_err();
    assert!(matches!(err, PipelineError::StageFailed { .. }));
    assert_eq!(h.mock.call_count(), 1);
}

#[tokio::test]
async fn test_typed_decode_failure_counts_as_malformed() {
    // Required paths exist, but ltv is not a number
    let h = harness(
        mock_with_override(
            "Task: monetization",
            Some(r#"{"model": "ads", "keyMetrics": {"ltv": "high", "cac": 10}}"#),
        ),
        PipelineConfig::fast(),
    );

    let run = run_job(&h, "req-typed", &Trigger::scheduled()).await.unwrap();
    assert_eq!(run.degraded_stages, vec!["monetization"]);
    assert_eq!(run.artifact.monetization.model, "unknown");
}

#[tokio::test]
async fn test_prose_output_is_repaired_by_escalation() {
    let mock = mock_with(&[
        (
            "Task: repair_schema",
            Some(r#"{"problems": [{"title": "Lunch fatigue"}], "targetAudience": "Office workers"}"#),
        ),
        (
            "Task: problem_analysis",
            Some("The main problems are lunch fatigue and a lack of planning time."),
        ),
    ]);
    let h = harness(mock, PipelineConfig::fast());

    let run = run_job(&h, "req-repair", &Trigger::scheduled()).await.unwrap();
    assert_eq!(run.artifact.problems.problems[0].title, "Lunch fatigue");
    assert!(run.degraded_stages.is_empty());
    assert_eq!(h.mock.calls_matching("Task: repair_schema"), 1);
    assert_eq!(h.orchestrator.metrics().strategies.get(&Strategy::Escalated), Some(&1));
}

#[tokio::test]
async fn test_two_pass_synthesis_persists_refined_draft() {
    let h = harness(scripted_mock(), PipelineConfig::fast());
    let run = run_job(&h, "req-two-pass", &Trigger::on_demand(DIRECTIVE, None))
        .await
        .unwrap();

    let refined = prompt_for(&h.mock, "synthesis_refined").unwrap();
    assert!(refined.contains(CRITIQUE), "critique must reach the refined pass verbatim");
    let first = prompt_for(&h.mock, "synthesis").unwrap();
    assert!(!first.contains(CRITIQUE));

    // The critique reviewed the first draft
    assert!(prompt_for(&h.mock, "critique").unwrap().contains("LunchDraft"));

    assert_eq!(run.artifact.title, "LunchLoop");
    let stored = h.artifacts.all();
    assert_eq!(stored.len(), 1);
    assert!(stored.iter().all(|(_, a)| a.title != "LunchDraft"));
}

#[tokio::test]
async fn test_failed_critique_leaves_refined_pass_unguided() {
    let h = harness(mock_with_override("Task: critique", None), PipelineConfig::fast());

    let run = run_job(&h, "req-no-critique", &Trigger::scheduled()).await.unwrap();
    assert_eq!(run.skipped_stages, vec!["critique"]);
    assert_eq!(run.artifact.title, "LunchLoop");
    assert!(!prompt_for(&h.mock, "synthesis_refined")
        .unwrap()
        .contains("Reviewer feedback"));
}

#[tokio::test]
async fn test_invalid_refined_draft_is_fatal() {
    let h = harness(
        mock_with_override("Task: synthesis_refined", Some(r#"{"title": "Half an idea"}"#)),
        PipelineConfig::fast(),
    );

    let err = run_job(&h, "req-bad-final", &Trigger::scheduled()).await.unwrap_err();
    assert!(matches!(err, PipelineError::StageFailed { ref stage, .. } if stage == "synthesis_refined"));
    assert!(h.artifacts.is_empty());
}

#[tokio::test]
async fn test_research_sources_reach_the_artifact() {
    let mut mock = MockProvider::silent();
    mock.add_research_response(
        "Task: trend_research",
        TREND,
        vec![
            Source {
                title: "Food report".to_string(),
                uri: "https://example.org/food".to_string(),
            },
            Source {
                title: "Food report (dup)".to_string(),
                uri: "https://example.org/food".to_string(),
            },
        ],
    );
    register_defaults(&mut mock);

    let h = harness(mock, PipelineConfig::fast());
    let run = run_job(&h, "req-sources", &Trigger::scheduled()).await.unwrap();
    assert_eq!(run.artifact.sources.len(), 1);
    assert_eq!(run.artifact.sources[0].uri, "https://example.org/food");
}

#[tokio::test]
async fn test_previous_titles_reach_synthesis() {
    let h = harness(scripted_mock(), PipelineConfig::fast());
    run_job(&h, "req-first", &Trigger::scheduled()).await.unwrap();
    h.mock.reset_call_count();

    run_job(&h, "req-second", &Trigger::scheduled()).await.unwrap();
    let prompt = prompt_for(&h.mock, "synthesis").unwrap();
    assert!(prompt.contains("Do not repeat any of these existing ideas:"));
    assert!(prompt.contains("- LunchLoop"));
}

#[tokio::test]
async fn test_persistence_failure_fails_job() {
    let h = harness(scripted_mock(), PipelineConfig::fast());
    h.artifacts.set_reject_writes(true);

    let err = run_job(&h, "req-persist", &Trigger::scheduled()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Persistence(_)));

    let job = h.jobs.read(&JobId::from("req-persist")).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(
        job.error.as_deref(),
        Some("Your idea was generated but could not be saved.")
    );
}

#[tokio::test]
async fn test_completion_write_is_retried_once() {
    let h = harness(scripted_mock(), PipelineConfig::fast());
    h.jobs.fail_next_completions(1);

    let run = run_job(&h, "req-retry", &Trigger::scheduled()).await.unwrap();

    let job = h.jobs.read(&JobId::from("req-retry")).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.artifact_ids, vec![run.artifact_id]);
}

#[tokio::test]
async fn test_unrecordable_completion_fails_job() {
    let h = harness(scripted_mock(), PipelineConfig::fast());
    h.jobs.fail_next_completions(2);

    let err = run_job(&h, "req-stuck", &Trigger::scheduled()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Tracker(_)));

    let job_id = JobId::from("req-stuck");
    let job = h.jobs.read(&job_id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some(err.user_message()));
    assert_eq!(
        h.jobs.status_history(&job_id),
        vec![JobStatus::Pending, JobStatus::Running, JobStatus::Failed]
    );
    assert_eq!(h.artifacts.len(), 1);
}

#[tokio::test]
async fn test_cancelled_run_fails_job_without_calls() {
    let h = harness(scripted_mock(), PipelineConfig::fast());
    let job_id = JobId::from("req-cancel");
    h.jobs.create(&job_id).unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = h
        .orchestrator
        .run(&job_id, &Trigger::scheduled(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Cancelled));
    assert_eq!(h.mock.call_count(), 0);
    let job = h.jobs.read(&job_id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("Generation was cancelled"));
}

#[tokio::test]
async fn test_metrics_count_runs_and_stages() {
    let h = harness(scripted_mock(), PipelineConfig::fast());
    run_job(&h, "req-m1", &Trigger::scheduled()).await.unwrap();

    let metrics = h.orchestrator.metrics();
    assert_eq!(metrics.runs, 1);
    assert_eq!(metrics.completed, 1);
    assert_eq!(metrics.total_stage_runs(), 8);
    assert_eq!(metrics.strategies.get(&Strategy::Cleanup), Some(&1));
    assert_eq!(metrics.degradation_rate(), 0.0);
}

#[tokio::test]
async fn test_reordered_stages_rejected() {
    let h = harness(scripted_mock(), PipelineConfig::fast());
    let mut reordered = stages::catalogue();
    reordered.swap(0, 1);
    assert!(matches!(
        h.orchestrator.with_stages(reordered),
        Err(PipelineError::InvalidStageOrder(_))
    ));
}
