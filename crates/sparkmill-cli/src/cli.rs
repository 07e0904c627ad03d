//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sparkmill CLI - Generate researched, scored startup ideas.
#[derive(Debug, Parser)]
#[command(name = "sparkmill")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SPARKMILL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate ideas for a user directive
    Generate(GenerateArgs),

    /// Run scheduled batches
    Schedule(ScheduleArgs),

    /// Show the status of a job
    Status(StatusArgs),

    /// Extract structured JSON from a text file
    Extract(ExtractArgs),

    /// Show or initialize the configuration
    Config(ConfigArgs),
}

/// Arguments for the generate command.
#[derive(Debug, Parser)]
pub struct GenerateArgs {
    /// Focus area for the ideas (e.g. "vegan meal planning for office workers")
    #[arg(short, long)]
    pub directive: String,

    /// Requesting user id
    #[arg(short, long)]
    pub user: Option<String>,

    /// Job id to report progress under; generated when omitted
    #[arg(short, long)]
    pub request_id: Option<String>,

    /// Number of ideas to generate (defaults to the configured batch size)
    #[arg(short = 'n', long)]
    pub count: Option<usize>,
}

/// Arguments for the schedule command.
#[derive(Debug, Parser)]
pub struct ScheduleArgs {
    /// Number of batches to run
    #[arg(long, default_value = "1")]
    pub cycles: usize,

    /// Seconds between batches
    #[arg(long, default_value = "3600")]
    pub every: u64,
}

/// Arguments for the status command.
#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Job id
    pub job_id: String,

    /// Keep polling until the job finishes
    #[arg(short, long)]
    pub watch: bool,

    /// Poll interval in milliseconds
    #[arg(long, default_value = "500")]
    pub interval_ms: u64,
}

/// Arguments for the extract command.
#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// Text file holding the raw model output
    pub file: PathBuf,

    /// Required fields, comma separated dotted paths (e.g. "title,keyMetrics.ltv")
    #[arg(short, long, value_delimiter = ',')]
    pub require: Vec<String>,

    /// Allow escalated repair through the configured provider
    #[arg(long)]
    pub escalate: bool,
}

/// Arguments for configuration management.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
        }
    }
}
