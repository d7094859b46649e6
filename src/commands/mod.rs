pub mod nltoq;
pub mod queries;
pub mod settings;

use crate::config::{AppConfig, Command, QuerySource};
use crate::honeycomb::query::AnalyticsQuery;
use anyhow::{bail, Context};
use std::io::Write;
use tracing::{error, info};

// Set at build time by the release pipeline
const COMMIT: &str = match option_env!("HCCLI_COMMIT") {
    Some(commit) => commit,
    None => "none",
};
const BUILD_DATE: &str = match option_env!("HCCLI_BUILD_DATE") {
    Some(date) => date,
    None => "unknown",
};

pub async fn run(command: Command, config: &AppConfig, out: &mut dyn Write) -> anyhow::Result<()> {
    match command {
        Command::NlToQuery(args) => nltoq::run(args, config, out).await,
        Command::CreateQuery(args) => queries::create_query(args, config, out).await,
        Command::QueryToUrl(args) => queries::query_to_url(args, out),
        Command::Config(command) => settings::run(command, config, out),
        Command::Version => print_version(out),
    }
}

pub fn print_version(out: &mut dyn Write) -> anyhow::Result<()> {
    writeln!(
        out,
        "hccli {}, commit {}, built at {}",
        env!("CARGO_PKG_VERSION"),
        COMMIT,
        BUILD_DATE
    )?;
    Ok(())
}

pub fn log_version() {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = COMMIT,
        date = BUILD_DATE,
        "binary version"
    );
}

/// Reads the query from `--query` or `--query-file` and parses it.
pub fn load_query(source: &QuerySource) -> anyhow::Result<AnalyticsQuery> {
    let raw = match (&source.query, &source.query_file) {
        (Some(query), None) => query.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Error reading query file {}", path.display()))?,
        _ => bail!("Exactly one of --query and --query-file must be specified"),
    };

    serde_json::from_str(&raw).map_err(|e| {
        error!("Error unmarshalling query {}: {}", raw, e);
        anyhow::Error::new(e).context("Error unmarshalling query")
    })
}
