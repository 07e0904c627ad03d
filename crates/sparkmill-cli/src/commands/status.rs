//! Status command implementation.

use crate::cli::StatusArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use sparkmill_domain::traits::JobTracker;
use sparkmill_domain::{JobId, JobRecord};
use sparkmill_store::SqliteStore;
use std::time::Duration;

fn read_job(store: &SqliteStore, id: &JobId) -> Result<JobRecord> {
    store
        .read(id)?
        .ok_or_else(|| CliError::JobNotFound(id.to_string()))
}

/// Execute the status command.
pub async fn execute_status(args: StatusArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let store = super::open_store(config)?;
    let id = JobId::new(args.job_id);

    let mut job = read_job(&store, &id)?;
    println!("{}", formatter.format_job(&job)?);
    if !args.watch {
        return Ok(());
    }

    let mut interval = tokio::time::interval(Duration::from_millis(args.interval_ms.max(100)));
    while !job.status.is_terminal() {
        interval.tick().await;
        let latest = read_job(&store, &id)?;
        if latest != job {
            println!("{}", formatter.format_job(&latest)?);
            job = latest;
        }
    }
    Ok(())
}
