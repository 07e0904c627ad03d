//! Schedule command implementation.

use super::{build_orchestrator, ctrl_c_token, open_store};
use crate::cli::ScheduleArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use std::time::Duration;
use tracing::info;

/// Execute the schedule command.
///
/// Runs `cycles` scheduled batches, `every` seconds apart, stopping early on
/// Ctrl-C.
pub async fn execute_schedule(
    args: ScheduleArgs,
    config: &Config,
    formatter: &Formatter,
) -> Result<()> {
    if args.cycles == 0 {
        return Err(CliError::InvalidInput("Cycles must be at least 1".to_string()));
    }

    let store = open_store(config)?;
    let orchestrator = build_orchestrator(config, config.pipeline.clone(), &store)?;
    let cancel = ctrl_c_token();

    for cycle in 1..=args.cycles {
        info!("Scheduled cycle {}/{}", cycle, args.cycles);
        let report = orchestrator.run_scheduled(&cancel).await;
        for id in &report.job_ids {
            println!("{}", id);
        }
        eprintln!("{}", formatter.batch_summary(&report));

        if report.cancelled || cycle == args.cycles {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(args.every)) => {}
            _ = cancel.cancelled() => break,
        }
    }

    eprintln!("{}", formatter.format_metrics(&orchestrator.metrics()));
    Ok(())
}
