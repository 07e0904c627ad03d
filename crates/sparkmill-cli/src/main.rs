//! Sparkmill CLI - Command-line interface for the Sparkmill idea pipeline.

use anyhow::Context;
use clap::Parser;
use sparkmill_cli::commands;
use sparkmill_cli::{logging, Cli, Command, Config, Formatter};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();
    logging::init(cli.json_logs);

    // Load or create config; `config init` must see the file as it was
    let path = match cli.config {
        Some(path) => path,
        None => Config::path()?,
    };
    let config = match &cli.command {
        Command::Config(_) if !path.exists() => Config::default(),
        _ => Config::load_or_init(&path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
    };

    // Determine output format
    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);

    // Determine color setting
    let color_enabled = !cli.no_color && config.settings.color;

    // Create formatter
    let formatter = Formatter::new(format, color_enabled);

    // Handle commands
    match cli.command {
        Command::Generate(args) => commands::execute_generate(args, &config, &formatter).await?,
        Command::Schedule(args) => commands::execute_schedule(args, &config, &formatter).await?,
        Command::Status(args) => commands::execute_status(args, &config, &formatter).await?,
        Command::Extract(args) => commands::execute_extract(args, &config, &formatter).await?,
        Command::Config(args) => commands::execute_config(args, &config, &path, &formatter)?,
    }

    Ok(())
}
