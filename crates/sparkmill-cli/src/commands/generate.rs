//! Generate command implementation.

use super::{build_orchestrator, ctrl_c_token, open_store};
use crate::cli::GenerateArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use sparkmill_domain::traits::ArtifactSink;
use sparkmill_domain::JobId;
use sparkmill_pipeline::Trigger;

/// Execute the generate command.
pub async fn execute_generate(
    args: GenerateArgs,
    config: &Config,
    formatter: &Formatter,
) -> Result<()> {
    if args.directive.trim().is_empty() {
        return Err(CliError::InvalidInput("Directive must not be empty".to_string()));
    }

    let mut pipeline = config.pipeline.clone();
    if let Some(count) = args.count {
        if count == 0 {
            return Err(CliError::InvalidInput("Count must be at least 1".to_string()));
        }
        pipeline.on_demand_batch_size = count;
    }

    let store = open_store(config)?;
    let orchestrator = build_orchestrator(config, pipeline, &store)?;

    let request_id = args
        .request_id
        .map(JobId::new)
        .unwrap_or_else(JobId::generate);
    eprintln!("{}", formatter.info(&format!("Job {}", request_id)));

    let trigger = Trigger::on_demand(args.directive, args.user);
    let report = orchestrator
        .run_on_demand(&request_id, &trigger, &ctrl_c_token())
        .await?;

    let mut artifacts = Vec::with_capacity(report.artifact_ids.len());
    for id in &report.artifact_ids {
        if let Some(artifact) = store.load(*id)? {
            artifacts.push((*id, artifact));
        }
    }

    println!("{}", formatter.format_artifacts(&artifacts)?);
    eprintln!("{}", formatter.batch_summary(&report));
    tracing::debug!("{}", orchestrator.metrics().summary());
    Ok(())
}
