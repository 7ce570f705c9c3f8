//! Fusion library replay entry point.
//!
//! Usage: `fusion-replay <snapshot.json> <events.jsonl>`

mod app;
mod config;

use std::path::PathBuf;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: fusion-replay <snapshot.json> <events.jsonl>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging is configured from the config file, so load it first and
    // report a failure once the subscriber is up.
    let loaded = config::ReplayConfig::load();
    let log_level = loaded
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|_| "info".into());

    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting fusion replay");

    let config = match loaded {
        Ok(c) => {
            tracing::info!(
                capacity = c.event_channel_capacity,
                status = ?c.default_status_filter,
                "configuration loaded"
            );
            c
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to load config, using defaults");
            config::ReplayConfig::default()
        }
    };

    let mut args = std::env::args_os().skip(1);
    let (Some(snapshot), Some(events)) = (args.next(), args.next()) else {
        anyhow::bail!(USAGE);
    };
    let (snapshot, events) = (PathBuf::from(snapshot), PathBuf::from(events));

    let report = app::run(config, &snapshot, &events).await?;
    let json = serde_json::to_string_pretty(&report).context("failed to encode report")?;
    println!("{json}");
    Ok(())
}
