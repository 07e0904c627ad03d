//! Command implementations.

pub mod config;
pub mod extract;
pub mod generate;
pub mod schedule;
pub mod status;

pub use self::config::execute_config;
pub use self::extract::execute_extract;
pub use self::generate::execute_generate;
pub use self::schedule::execute_schedule;
pub use self::status::execute_status;

use crate::config::Config;
use crate::error::Result;
use sparkmill_llm::AnyProvider;
use sparkmill_pipeline::{CancellationToken, Orchestrator, PipelineConfig};
use sparkmill_store::SqliteStore;
use std::sync::Arc;
use tracing::warn;

/// Orchestrator wired to the configured provider and the SQLite store.
pub type AppOrchestrator = Orchestrator<AnyProvider, Arc<SqliteStore>, Arc<SqliteStore>>;

/// Open the configured database.
pub fn open_store(config: &Config) -> Result<Arc<SqliteStore>> {
    let path = config.database_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Arc::new(SqliteStore::new(&path)?))
}

/// Build an orchestrator over `store` with `pipeline` settings.
pub fn build_orchestrator(
    config: &Config,
    pipeline: PipelineConfig,
    store: &Arc<SqliteStore>,
) -> Result<AppOrchestrator> {
    let provider = config.llm.build()?;
    Ok(Orchestrator::new(
        provider,
        Arc::clone(store),
        Arc::clone(store),
        pipeline,
    )?)
}

/// Token cancelled on Ctrl-C; the current stage finishes first.
pub fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current stage");
            trigger.cancel();
        }
    });
    token
}
