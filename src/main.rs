use anyhow::Context;
use clap::Parser;

mod commands;
mod config;
mod honeycomb;
mod llm;
mod util;

use crate::config::{AppConfig, CliArgs, Command};
use crate::util::logging::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = CliArgs::parse();
    let mut stdout = std::io::stdout();

    if let Command::Version = args.command {
        return commands::print_version(&mut stdout);
    }

    // Load configuration
    let config = AppConfig::new(&args).context("Failed to load configuration")?;

    // Initialize logging
    init_tracing(config.log_level()?, args.json_logs);
    commands::log_version();

    commands::run(args.command, &config, &mut stdout).await
}
