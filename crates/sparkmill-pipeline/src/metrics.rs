//! Metrics collection for pipeline runs

use crate::stage::StageOutcome;
use sparkmill_extractor::Strategy;
use std::collections::BTreeMap;

/// Per-stage outcome counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageCounts {
    /// Parsed results
    pub parsed: usize,
    /// Fallback substitutions
    pub fallback: usize,
    /// Failures
    pub failed: usize,
}

impl StageCounts {
    /// Total executions
    pub fn total(&self) -> usize {
        self.parsed + self.fallback + self.failed
    }
}

/// Counters across pipeline runs
///
/// Tracks run outcomes, per-stage outcomes and which cascade strategy
/// produced each parsed value.
#[derive(Debug, Clone, Default)]
pub struct PipelineMetrics {
    /// Runs started
    pub runs: usize,

    /// Runs that persisted an artifact
    pub completed: usize,

    /// Runs that failed
    pub failed: usize,

    /// Outcomes per stage name
    pub stages: BTreeMap<String, StageCounts>,

    /// Successful parses per cascade strategy
    pub strategies: BTreeMap<Strategy, usize>,
}

impl PipelineMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of a run
    pub fn record_run_started(&mut self) {
        self.runs += 1;
    }

    /// Record the end of a run
    pub fn record_run_finished(&mut self, success: bool) {
        if success {
            self.completed += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Record one stage execution
    pub fn record_stage(&mut self, stage: &str, outcome: &StageOutcome) {
        let counts = self.stages.entry(stage.to_string()).or_default();
        match outcome {
            StageOutcome::Parsed { strategy, .. } => {
                counts.parsed += 1;
                if let Some(strategy) = strategy {
                    *self.strategies.entry(*strategy).or_insert(0) += 1;
                }
            }
            StageOutcome::Fallback { .. } => {
                counts.fallback += 1;
                *self.strategies.entry(Strategy::Fallback).or_insert(0) += 1;
            }
            StageOutcome::Failed { .. } => counts.failed += 1,
        }
    }

    /// Total stage executions
    pub fn total_stage_runs(&self) -> usize {
        self.stages.values().map(StageCounts::total).sum()
    }

    /// Total fallback substitutions
    pub fn total_fallbacks(&self) -> usize {
        self.stages.values().map(|c| c.fallback).sum()
    }

    /// Share of stage executions that ended in a fallback
    pub fn degradation_rate(&self) -> f64 {
        match self.total_stage_runs() {
            0 => 0.0,
            total => self.total_fallbacks() as f64 / total as f64,
        }
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Pipeline Metrics Summary".to_string(),
            "========================".to_string(),
            format!(
                "Runs: {} ({} completed, {} failed)",
                self.runs, self.completed, self.failed
            ),
            format!("Degradation rate: {:.1}%", self.degradation_rate() * 100.0),
            String::new(),
        ];

        if !self.stages.is_empty() {
            lines.push("Stages:".to_string());
            for (stage, counts) in &self.stages {
                lines.push(format!(
                    "  {}: {} parsed, {} fallback, {} failed",
                    stage, counts.parsed, counts.fallback, counts.failed
                ));
            }
            lines.push(String::new());
        }

        if !self.strategies.is_empty() {
            lines.push("Cascade strategies:".to_string());
            for (strategy, count) in &self.strategies {
                lines.push(format!("  {}: {}", strategy, count));
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parsed(strategy: Strategy) -> StageOutcome {
        StageOutcome::Parsed {
            value: json!({}),
            strategy: Some(strategy),
            sources: Vec::new(),
        }
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = PipelineMetrics::new();
        assert_eq!(metrics.runs, 0);
        assert_eq!(metrics.total_stage_runs(), 0);
        assert_eq!(metrics.degradation_rate(), 0.0);
    }

    #[test]
    fn test_record_stage_outcomes() {
        let mut metrics = PipelineMetrics::new();
        metrics.record_stage("trend_research", &parsed(Strategy::Direct));
        metrics.record_stage("trend_research", &parsed(Strategy::Cleanup));
        metrics.record_stage(
            "monetization",
            &StageOutcome::Fallback {
                value: json!({}),
                reason: "no response".to_string(),
            },
        );
        metrics.record_stage(
            "problem_analysis",
            &StageOutcome::Failed {
                reason: "malformed".to_string(),
            },
        );

        assert_eq!(metrics.stages["trend_research"].parsed, 2);
        assert_eq!(metrics.stages["monetization"].fallback, 1);
        assert_eq!(metrics.stages["problem_analysis"].failed, 1);
        assert_eq!(metrics.strategies[&Strategy::Fallback], 1);
        assert_eq!(metrics.total_stage_runs(), 4);
        assert!((metrics.degradation_rate() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_run_counts_and_summary() {
        let mut metrics = PipelineMetrics::new();
        metrics.record_run_started();
        metrics.record_run_finished(true);
        metrics.record_run_started();
        metrics.record_run_finished(false);
        metrics.record_stage("critique", &parsed(Strategy::Direct));

        let summary = metrics.summary();
        assert!(summary.contains("Runs: 2 (1 completed, 1 failed)"));
        assert!(summary.contains("critique: 1 parsed"));
        assert!(summary.contains("direct: 1"));

        metrics.reset();
        assert_eq!(metrics.runs, 0);
        assert!(metrics.stages.is_empty());
    }
}
