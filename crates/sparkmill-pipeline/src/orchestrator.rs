//! Sequences stages, applies the fatal/advisory policy and persists results

use crate::config::PipelineConfig;
use crate::context::{ContextParts, PipelineContext};
use crate::error::PipelineError;
use crate::metrics::PipelineMetrics;
use crate::prompts::{PromptLibrary, PromptSource};
use crate::stage::{StageDefinition, StageOutcome, StagePolicy, StageUnit};
use crate::stages;
use sparkmill_domain::traits::{ArtifactSink, GenerationClient, JobTracker};
use sparkmill_domain::{current_timestamp, ArtifactId, GeneratedArtifact, JobId};
use sparkmill_extractor::{RepairEscalator, StructuredExtractor};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What started a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trigger {
    /// Free-text focus from the user
    pub directive: Option<String>,
    /// Requesting user
    pub user_id: Option<String>,
}

impl Trigger {
    /// Scheduled trigger: no user input
    pub fn scheduled() -> Self {
        Self::default()
    }

    /// On-demand trigger from a user
    pub fn on_demand(directive: impl Into<String>, user_id: Option<String>) -> Self {
        Self {
            directive: Some(directive.into()),
            user_id,
        }
    }
}

/// A successful run
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Id assigned by the artifact sink
    pub artifact_id: ArtifactId,
    /// The persisted artifact
    pub artifact: GeneratedArtifact,
    /// Stages whose value is a fallback placeholder
    pub degraded_stages: Vec<String>,
    /// Advisory stages that produced nothing
    pub skipped_stages: Vec<String>,
}

/// Runs the stage catalogue for one trigger at a time
///
/// Stages within a run are strictly sequential. Separate runs share nothing
/// but the prompt cache and the metrics, so one orchestrator can serve
/// concurrent runs.
pub struct Orchestrator<G, T, S> {
    unit: StageUnit<G>,
    stages: Vec<StageDefinition>,
    tracker: T,
    sink: S,
    prompts: PromptSource,
    config: PipelineConfig,
    metrics: Mutex<PipelineMetrics>,
}

impl<G, T, S> Orchestrator<G, T, S>
where
    G: GenerationClient + 'static,
    T: JobTracker,
    S: ArtifactSink,
{
    /// Create an orchestrator with the standard stage catalogue
    pub fn new(client: G, tracker: T, sink: S, config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate().map_err(PipelineError::Config)?;

        let client = Arc::new(client);
        let escalator = RepairEscalator::new(Arc::clone(&client), config.repair.clone());
        let extractor = StructuredExtractor::new(config.extractor.clone())
            .map_err(|e| PipelineError::Config(e.to_string()))?
            .with_repairer(Arc::new(escalator));

        let prompts = match &config.prompts_path {
            Some(path) => PromptSource::from_path(path, config.prompt_cache_ttl()),
            None => PromptSource::builtin(),
        };

        let stages = stages::catalogue();
        stages::validate_order(&stages)?;

        Ok(Self {
            unit: StageUnit::new(client, extractor, config.clone()),
            stages,
            tracker,
            sink,
            prompts,
            config,
            metrics: Mutex::new(PipelineMetrics::new()),
        })
    }

    /// Replace the stage list; rejected unless it is a valid total order
    pub fn with_stages(mut self, stages: Vec<StageDefinition>) -> Result<Self, PipelineError> {
        stages::validate_order(&stages)?;
        self.stages = stages;
        Ok(self)
    }

    /// The job tracker
    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    /// The artifact sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Pipeline configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stage names in execution order
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name).collect()
    }

    /// Snapshot of the metrics
    pub fn metrics(&self) -> PipelineMetrics {
        self.metrics.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn with_metrics(&self, f: impl FnOnce(&mut PipelineMetrics)) {
        f(&mut self.metrics.lock().unwrap_or_else(|e| e.into_inner()));
    }

    /// Write progress; failures are logged and never affect the run
    pub(crate) fn progress(&self, job_id: &JobId, step: &str, message: &str) {
        if let Err(e) = self.tracker.update(job_id, step, message) {
            warn!("Failed to record progress for job {}: {}", job_id, e);
        }
    }

    /// Mark `job_id` failed with the short message for `err`
    pub(crate) fn fail_job(&self, job_id: &JobId, err: &PipelineError) {
        if let Err(e) = self.tracker.fail(job_id, err.user_message()) {
            error!("Failed to mark job {} as failed: {}", job_id, e);
        }
    }

    /// Mark `job_id` completed, retrying once before failing it instead
    pub(crate) fn complete_job(
        &self,
        job_id: &JobId,
        artifact_ids: &[ArtifactId],
    ) -> Result<(), PipelineError> {
        let first = match self.tracker.complete(job_id, artifact_ids) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        warn!("Completing job {} failed, retrying: {}", job_id, first);

        match self.tracker.complete(job_id, artifact_ids) {
            Ok(()) => Ok(()),
            Err(e) => {
                let err = PipelineError::Tracker(e.to_string());
                error!("Job {} could not be completed: {}", job_id, err);
                self.fail_job(job_id, &err);
                Err(err)
            }
        }
    }

    /// Run a job created in `Pending` through to a terminal state
    pub async fn run(
        &self,
        job_id: &JobId,
        trigger: &Trigger,
        cancel: &CancellationToken,
    ) -> Result<PipelineRun, PipelineError> {
        self.tracker
            .start(job_id)
            .map_err(|e| PipelineError::Tracker(e.to_string()))?;

        match self.execute(job_id, trigger, cancel).await {
            Ok(run) => {
                self.complete_job(job_id, &[run.artifact_id])?;
                info!("Job {} completed with artifact {}", job_id, run.artifact_id);
                Ok(run)
            }
            Err(e) => {
                error!("Job {} failed: {}", job_id, e);
                self.fail_job(job_id, &e);
                Err(e)
            }
        }
    }

    /// Run every stage and persist the artifact, writing only progress
    ///
    /// The caller owns the job's status transitions.
    pub async fn execute(
        &self,
        job_id: &JobId,
        trigger: &Trigger,
        cancel: &CancellationToken,
    ) -> Result<PipelineRun, PipelineError> {
        self.with_metrics(|m| m.record_run_started());
        let result = self.execute_stages(job_id, trigger, cancel).await;
        let success = result.is_ok();
        self.with_metrics(|m| m.record_run_finished(success));
        result
    }

    async fn execute_stages(
        &self,
        job_id: &JobId,
        trigger: &Trigger,
        cancel: &CancellationToken,
    ) -> Result<PipelineRun, PipelineError> {
        let prompts = self.prompts.current().await;
        let previous_titles = match self.sink.recent_titles(self.config.previous_titles_limit) {
            Ok(titles) => titles,
            Err(e) => {
                warn!("Could not load recent titles, skipping novelty check: {}", e);
                Vec::new()
            }
        };

        let mut ctx = PipelineContext::new(trigger.directive.clone(), previous_titles);
        let mut degraded_stages = Vec::new();
        let mut skipped_stages = Vec::new();
        let total = self.stages.len();

        for (index, def) in self.stages.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!("Job {} cancelled before stage '{}'", job_id, def.name);
                return Err(PipelineError::Cancelled);
            }

            self.progress(
                job_id,
                def.name,
                &format!("{} ({}/{})", def.step_message, index + 1, total),
            );
            info!("Stage '{}' started", def.name);

            match self.run_stage(def, &ctx, &prompts).await {
                StageOutcome::Parsed { value, sources, .. } => {
                    ctx.add_sources(sources);
                    ctx.apply(def.output, value)?;
                }
                StageOutcome::Fallback { value, reason } => {
                    warn!("Stage '{}' degraded to fallback: {}", def.name, reason);
                    degraded_stages.push(def.name.to_string());
                    ctx.apply(def.output, value)?;
                }
                StageOutcome::Failed { reason } => match def.policy {
                    StagePolicy::Advisory => {
                        warn!("Advisory stage '{}' produced nothing: {}", def.name, reason);
                        skipped_stages.push(def.name.to_string());
                    }
                    StagePolicy::LoadBearing => {
                        error!("Stage '{}' failed, aborting run: {}", def.name, reason);
                        return Err(PipelineError::StageFailed {
                            stage: def.name.to_string(),
                            reason,
                        });
                    }
                },
            }
            self.progress(
                job_id,
                def.name,
                &format!("{} done ({}/{})", def.name, index + 1, total),
            );
            info!("Stage '{}' finished", def.name);
        }

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let artifact = assemble(ctx.into_parts(), trigger)?;

        self.progress(job_id, "persist", "Saving the idea");
        let artifact_id = self.sink.persist(&artifact).map_err(|e| {
            error!("Persisting artifact '{}' failed: {}", artifact.title, e);
            PipelineError::Persistence(e.to_string())
        })?;

        info!(
            "Artifact {} '{}' persisted ({} degraded, {} skipped)",
            artifact_id,
            artifact.title,
            degraded_stages.len(),
            skipped_stages.len()
        );

        Ok(PipelineRun {
            artifact_id,
            artifact,
            degraded_stages,
            skipped_stages,
        })
    }

    /// Execute one stage, retrying failures up to `stage_attempts`
    async fn run_stage(
        &self,
        def: &StageDefinition,
        ctx: &PipelineContext,
        prompts: &PromptLibrary,
    ) -> StageOutcome {
        let attempts = self.config.stage_attempts.max(1);
        let mut attempt = 1;
        loop {
            let outcome = self.unit.execute(def, ctx, prompts).await;
            self.with_metrics(|m| m.record_stage(def.name, &outcome));
            debug!("Stage '{}' attempt {}/{}: {}", def.name, attempt, attempts, outcome.label());

            if attempt >= attempts || !matches!(outcome, StageOutcome::Failed { .. }) {
                return outcome;
            }
            attempt += 1;
        }
    }
}

/// Build the artifact from the authoritative synthesis and the research
fn assemble(parts: ContextParts, trigger: &Trigger) -> Result<GeneratedArtifact, PipelineError> {
    let incomplete = |field: &str| PipelineError::Incomplete(field.to_string());

    let draft = parts.final_draft.ok_or_else(|| incomplete("final_draft"))?;
    if draft.title.trim().is_empty() {
        return Err(incomplete("title"));
    }
    if draft.description.trim().is_empty() {
        return Err(incomplete("description"));
    }

    Ok(GeneratedArtifact {
        title: draft.title.trim().to_string(),
        tagline: draft.tagline,
        description: draft.description,
        scores: draft.scores.clamped(),
        tags: draft.tags,
        why_now: draft.why_now,
        trend: parts.trend.ok_or_else(|| incomplete("trend"))?,
        problems: parts.problems.ok_or_else(|| incomplete("problems"))?,
        competition: parts.competition.ok_or_else(|| incomplete("competition"))?,
        monetization: parts.monetization.ok_or_else(|| incomplete("monetization"))?,
        build: parts.build,
        sources: parts.sources,
        directive: parts.directive,
        user_id: trigger.user_id.clone(),
        created_at: current_timestamp(),
    })
}
