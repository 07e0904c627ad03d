//! Shared fixtures for pipeline integration tests

#![allow(dead_code)]

use sparkmill_llm::MockProvider;
use sparkmill_pipeline::{Orchestrator, PipelineConfig};
use sparkmill_store::{MemoryArtifactStore, MemoryJobStore};
use std::sync::Arc;

pub type TestOrchestrator =
    Orchestrator<MockProvider, Arc<MemoryJobStore>, Arc<MemoryArtifactStore>>;

pub const TREND: &str = r#"{"summary": "Plant-based lunches are moving into offices", "trends": [{"name": "Hybrid work", "description": "Fewer canteen days"}], "focus": "food"}"#;

pub const PROBLEMS: &str = r#"Here is the analysis:
```json
{"problems": [{"title": "No time to plan", "description": "Weekly planning takes hours", "severity": 8}], "targetAudience": "Office workers"}
```"#;

pub const COMPETITION: &str = r#"{"summary": "Meal-kit services dominate", "competitors": [{"name": "KitCo", "weakness": "Not vegan-first"}], "differentiation": "Office-first"}"#;

pub const MONETIZATION: &str = r#"{"model": "subscription", "pricing": [{"name": "Team", "price": "$8/seat"}], "keyMetrics": {"ltv": 480, "cac": 60}}"#;

pub const BUILD: &str = r#"{"mvp": "Weekly plan generator with a grocery list", "techStack": ["Rust", "SQLite"], "milestones": ["Pilot with 3 offices"]}"#;

pub const CRITIQUE: &str = "The audience is too broad.\nFocus on teams that already order lunch together.";

pub fn draft(title: &str) -> String {
    format!(
        r#"{{"title": "{}", "tagline": "Vegan lunches, planned", "description": "Plans a week of vegan office lunches and orders the groceries.",
            "scores": {{"opportunity": 8, "problemSeverity": 7, "feasibility": 9, "whyNow": 6, "marketSize": 7,
                        "revenuePotential": 6, "executionDifficulty": 4, "goToMarket": 7, "defensibility": 3, "founderFit": 8}},
            "tags": ["food", "b2b"], "whyNow": "Hybrid offices"}}"#,
        title
    )
}

const STAGE_PATTERNS: [&str; 8] = [
    "Task: synthesis_refined",
    "Task: synthesis",
    "Task: critique",
    "Task: trend_research",
    "Task: problem_analysis",
    "Task: competitive_analysis",
    "Task: monetization",
    "Task: build_recommendation",
];

fn default_reply(pattern: &str) -> String {
    match pattern {
        "Task: synthesis_refined" => draft("LunchLoop"),
        "Task: synthesis" => draft("LunchDraft"),
        "Task: critique" => CRITIQUE.to_string(),
        "Task: trend_research" => TREND.to_string(),
        "Task: problem_analysis" => PROBLEMS.to_string(),
        "Task: competitive_analysis" => COMPETITION.to_string(),
        "Task: monetization" => MONETIZATION.to_string(),
        _ => BUILD.to_string(),
    }
}

/// Register a valid reply for every stage after any earlier patterns
pub fn register_defaults(mock: &mut MockProvider) {
    // The refined task line also contains the first-pass task name, so it
    // is registered first.
    for pattern in STAGE_PATTERNS {
        mock.add_response(pattern, default_reply(pattern));
    }
}

/// Mock answering every stage with valid output
pub fn scripted_mock() -> MockProvider {
    let mut mock = MockProvider::silent();
    register_defaults(&mut mock);
    mock
}

/// Scripted mock where each `(pattern, reply)` wins over the defaults
///
/// A `None` reply answers without any text.
pub fn mock_with(overrides: &[(&str, Option<&str>)]) -> MockProvider {
    let mut mock = MockProvider::silent();
    for (pattern, reply) in overrides {
        match reply {
            Some(text) => mock.add_response(*pattern, *text),
            None => mock.add_no_response(*pattern),
        }
    }
    register_defaults(&mut mock);
    mock
}

/// Scripted mock where `pattern` answers `reply`
pub fn mock_with_override(pattern: &str, reply: Option<&str>) -> MockProvider {
    mock_with(&[(pattern, reply)])
}

/// Scripted mock where calls matching `pattern` fail
pub fn mock_with_error(pattern: &str) -> MockProvider {
    let mut mock = MockProvider::silent();
    mock.add_error(pattern);
    register_defaults(&mut mock);
    mock
}

pub struct Harness {
    pub orchestrator: TestOrchestrator,
    pub mock: MockProvider,
    pub jobs: Arc<MemoryJobStore>,
    pub artifacts: Arc<MemoryArtifactStore>,
}

pub fn harness(mock: MockProvider, config: PipelineConfig) -> Harness {
    let jobs = Arc::new(MemoryJobStore::new());
    let artifacts = Arc::new(MemoryArtifactStore::new());
    let orchestrator = Orchestrator::new(
        mock.clone(),
        Arc::clone(&jobs),
        Arc::clone(&artifacts),
        config,
    )
    .unwrap();
    Harness {
        orchestrator,
        mock,
        jobs,
        artifacts,
    }
}

/// Prompt of the first recorded request whose task line is `task`
pub fn prompt_for(mock: &MockProvider, task: &str) -> Option<String> {
    let line = format!("Task: {}\n", task);
    mock.requests()
        .into_iter()
        .map(|r| r.prompt)
        .find(|p| p.starts_with(&line))
}
