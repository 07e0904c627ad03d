//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use sparkmill_domain::{ArtifactId, GeneratedArtifact, JobRecord, JobStatus, SCORE_FIELDS};
use sparkmill_extractor::ParseResult;
use sparkmill_pipeline::{BatchReport, PipelineMetrics};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format a job record.
    pub fn format_job(&self, job: &JobRecord) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Ok(serde_json::to_string_pretty(job)?);
        }

        let status = match job.status {
            JobStatus::Completed => self.colorize(job.status.as_str(), "green"),
            JobStatus::Failed => self.colorize(job.status.as_str(), "red"),
            JobStatus::Running => self.colorize(job.status.as_str(), "cyan"),
            JobStatus::Pending => self.colorize(job.status.as_str(), "yellow"),
        };

        let mut lines = vec![format!("Job {}: {}", job.id, status)];
        if let Some(step) = &job.current_step {
            lines.push(format!("  step:    {}", step));
        }
        if let Some(message) = &job.message {
            lines.push(format!("  message: {}", message));
        }
        if let Some(error) = &job.error {
            lines.push(format!("  error:   {}", self.colorize(error, "red")));
        }
        for id in &job.artifact_ids {
            lines.push(format!("  idea:    {}", id));
        }
        Ok(lines.join("\n"))
    }

    /// Format persisted ideas.
    pub fn format_artifacts(&self, artifacts: &[(ArtifactId, GeneratedArtifact)]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let json: Vec<serde_json::Value> = artifacts
                    .iter()
                    .map(|(id, artifact)| {
                        serde_json::json!({
                            "id": id.to_string(),
                            "artifact": artifact,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&json)?)
            }
            OutputFormat::Table => Ok(self.format_artifacts_table(artifacts)),
        }
    }

    fn format_artifacts_table(&self, artifacts: &[(ArtifactId, GeneratedArtifact)]) -> String {
        if artifacts.is_empty() {
            return self.colorize("No ideas generated.", "yellow");
        }

        let mut sections = Vec::with_capacity(artifacts.len());
        for (id, artifact) in artifacts {
            let mut header = format!("{}  {}", self.colorize(&artifact.title, "cyan"), id);
            if let Some(tagline) = &artifact.tagline {
                header.push_str(&format!("\n{}", tagline));
            }

            let mut builder = Builder::default();
            builder.push_record(["Score", "Value"]);
            for (name, value) in SCORE_FIELDS.iter().zip(artifact.scores.values()) {
                builder.push_record([name.to_string(), format!("{:.1}", value)]);
            }
            builder.push_record(["average".to_string(), format!("{:.1}", artifact.scores.average())]);

            let mut table = builder.build();
            table
                .with(Style::rounded())
                .with(Modify::new(Rows::first()).with(Alignment::center()));

            let mut section = format!("{}\n\n{}\n\n{}", header, artifact.description, table);
            if artifact.build.is_none() {
                section.push_str(&format!("\n{}", self.warning("No build recommendation")));
            }
            if !artifact.sources.is_empty() {
                section.push_str("\nSources:");
                for source in &artifact.sources {
                    section.push_str(&format!("\n  - {} <{}>", source.title, source.uri));
                }
            }
            sections.push(section);
        }
        sections.join("\n\n")
    }

    /// Format a batch summary.
    pub fn batch_summary(&self, report: &BatchReport) -> String {
        let produced = report.artifact_ids.len();
        let failed = report.failures.len();
        let message = format!(
            "{} idea(s) generated, {} run(s) failed{}",
            produced,
            failed,
            if report.cancelled { " (cancelled)" } else { "" }
        );
        if produced == 0 {
            self.error(&message)
        } else if failed > 0 || report.cancelled {
            self.warning(&message)
        } else {
            self.success(&message)
        }
    }

    /// Format metrics.
    pub fn format_metrics(&self, metrics: &PipelineMetrics) -> String {
        self.info(&metrics.summary())
    }

    /// Format an extraction result.
    pub fn format_parse_result(&self, result: &ParseResult) -> Result<String> {
        let attempts: Vec<serde_json::Value> = result
            .attempts
            .iter()
            .map(|a| {
                serde_json::json!({
                    "strategy": a.strategy,
                    "success": a.success,
                    "error": a.error,
                })
            })
            .collect();

        if self.format == OutputFormat::Json {
            let json = serde_json::json!({
                "success": result.success,
                "strategy": result.strategy,
                "usedFallback": result.used_fallback,
                "value": result.value,
                "error": result.error,
                "attempts": attempts,
            });
            return Ok(serde_json::to_string_pretty(&json)?);
        }

        let mut builder = Builder::default();
        builder.push_record(["Strategy", "Result", "Detail"]);
        for attempt in &result.attempts {
            builder.push_record([
                attempt.strategy.to_string(),
                if attempt.success { "ok".to_string() } else { "failed".to_string() },
                attempt.error.clone().unwrap_or_default(),
            ]);
        }
        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        let headline = match (&result.value, result.strategy) {
            (Some(value), Some(strategy)) if result.success => format!(
                "{}\n{}",
                self.success(&format!("Parsed via {}", strategy)),
                serde_json::to_string_pretty(value)?
            ),
            _ => self.error(result.error.as_deref().unwrap_or("Extraction failed")),
        };
        Ok(format!("{}\n\n{}", headline, table))
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}
