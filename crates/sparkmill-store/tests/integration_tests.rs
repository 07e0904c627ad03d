//! Integration tests for sparkmill-store
//!
//! These tests verify job lifecycles and idea persistence against SQLite.

use sparkmill_domain::traits::{ArtifactSink, JobTracker};
use sparkmill_domain::{
    ArtifactId, CompetitiveSummary, GeneratedArtifact, JobId, JobStatus, KeyMetrics,
    MonetizationPlan, ProblemAnalysis, Scores, Source, TrendSummary,
};
use sparkmill_store::{SqliteStore, StoreError};

fn scores(value: f64) -> Scores {
    Scores {
        opportunity: value,
        problem_severity: value,
        feasibility: value,
        why_now: value,
        market_size: value,
        revenue_potential: value,
        execution_difficulty: value,
        go_to_market: value,
        defensibility: value,
        founder_fit: value,
    }
}

fn artifact(title: &str, created_at: u64) -> GeneratedArtifact {
    GeneratedArtifact {
        title: title.to_string(),
        tagline: Some("Lunch, solved".to_string()),
        description: "Weekly vegan meal plans for office teams".to_string(),
        scores: scores(7.0),
        tags: vec!["food".to_string(), "b2b".to_string()],
        why_now: None,
        trend: TrendSummary {
            summary: "Plant-based lunches are growing".to_string(),
            trends: Vec::new(),
            focus: None,
        },
        problems: ProblemAnalysis {
            problems: Vec::new(),
            target_audience: "Office workers".to_string(),
        },
        competition: CompetitiveSummary {
            summary: "Fragmented".to_string(),
            competitors: Vec::new(),
            differentiation: None,
        },
        monetization: MonetizationPlan {
            model: "subscription".to_string(),
            pricing: Vec::new(),
            key_metrics: KeyMetrics { ltv: 240.0, cac: 40.0 },
            revenue_potential: None,
        },
        build: None,
        sources: vec![Source {
            title: "Report".to_string(),
            uri: "https://example.org/report".to_string(),
        }],
        directive: Some("vegan meal planning for office workers".to_string()),
        user_id: Some("user-7".to_string()),
        created_at,
    }
}

#[test]
fn test_store_initialization() {
    let store = SqliteStore::new(":memory:");
    assert!(store.is_ok(), "Store should initialize successfully");
}

#[test]
fn test_job_lifecycle() {
    let store = SqliteStore::new(":memory:").unwrap();
    let id = JobId::from("req-1");

    let created = store.create(&id).unwrap();
    assert_eq!(created.status, JobStatus::Pending);

    store.start(&id).unwrap();
    store.update(&id, "trend_research", "Researching market trends (1/8)").unwrap();

    let running = store.read(&id).unwrap().unwrap();
    assert_eq!(running.status, JobStatus::Running);
    assert_eq!(running.current_step.as_deref(), Some("trend_research"));

    let artifact_id = ArtifactId::new();
    store.complete(&id, &[artifact_id]).unwrap();

    let done = store.read(&id).unwrap().unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.artifact_ids, vec![artifact_id]);
}

#[test]
fn test_terminal_job_rejects_mutation() {
    let store = SqliteStore::new(":memory:").unwrap();
    let id = JobId::from("req-2");
    store.create(&id).unwrap();
    store.start(&id).unwrap();
    store.fail(&id, "We couldn't generate an idea this time.").unwrap();

    assert!(matches!(store.update(&id, "x", "y"), Err(StoreError::Transition(_))));
    assert!(matches!(store.complete(&id, &[]), Err(StoreError::Transition(_))));

    let failed = store.read(&id).unwrap().unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("We couldn't generate an idea this time."));
}

#[test]
fn test_start_requires_pending() {
    let store = SqliteStore::new(":memory:").unwrap();
    let id = JobId::from("req-3");
    store.create(&id).unwrap();
    store.start(&id).unwrap();
    assert!(matches!(store.start(&id), Err(StoreError::Transition(_))));
}

#[test]
fn test_duplicate_and_missing_jobs() {
    let store = SqliteStore::new(":memory:").unwrap();
    let id = JobId::from("req-4");
    store.create(&id).unwrap();
    assert!(matches!(store.create(&id), Err(StoreError::DuplicateJob(_))));
    assert!(store.read(&JobId::from("missing")).unwrap().is_none());
    assert!(matches!(
        store.fail(&JobId::from("missing"), "x"),
        Err(StoreError::JobNotFound(_))
    ));
}

#[test]
fn test_jobs_with_status() {
    let store = SqliteStore::new(":memory:").unwrap();
    for name in ["a", "b", "c"] {
        store.create(&JobId::from(name)).unwrap();
    }
    store.start(&JobId::from("b")).unwrap();

    let pending = store.jobs_with_status(JobStatus::Pending).unwrap();
    assert_eq!(pending.len(), 2);
    let running = store.jobs_with_status(JobStatus::Running).unwrap();
    assert_eq!(running[0].id, JobId::from("b"));
}

#[test]
fn test_persist_and_load_artifact() {
    let store = SqliteStore::new(":memory:").unwrap();
    let original = artifact("LunchLeaf", 1_000);

    let id = store.persist(&original).unwrap();
    let loaded = store.load(id).unwrap().unwrap();

    assert_eq!(loaded, original);
    assert_eq!(store.artifact_count().unwrap(), 1);
    assert!(store.load(ArtifactId::new()).unwrap().is_none());
}

#[test]
fn test_recent_titles_newest_first() {
    let store = SqliteStore::new(":memory:").unwrap();
    store.persist(&artifact("First", 1_000)).unwrap();
    store.persist(&artifact("Second", 2_000)).unwrap();
    store.persist(&artifact("Third", 3_000)).unwrap();

    assert_eq!(store.recent_titles(2).unwrap(), vec!["Third", "Second"]);
    assert_eq!(store.recent_titles(10).unwrap().len(), 3);
}

#[test]
fn test_persistence_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ideas.db");

    let id = {
        let store = SqliteStore::new(&path).unwrap();
        store.create(&JobId::from("req-9")).unwrap();
        store.persist(&artifact("Durable", 5_000)).unwrap()
    };

    let store = SqliteStore::new(&path).unwrap();
    assert_eq!(store.load(id).unwrap().unwrap().title, "Durable");
    assert_eq!(
        store.read(&JobId::from("req-9")).unwrap().unwrap().status,
        JobStatus::Pending
    );
}
