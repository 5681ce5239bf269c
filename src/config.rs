use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::prelude::*;

/// Command line and environment configuration for the daemon.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Workspace directory to open at startup; `workspace.select` can open one later.
    #[arg(short, long, value_name = "DIR", env = "SCHOOLD_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Fallback filter when `RUST_LOG` is unset.
    #[arg(long, env = "SCHOOLD_TRACE_LEVEL", default_value = "info")]
    pub trace_level: String,

    /// Emit one JSON object per log event.
    #[arg(long, env = "SCHOOLD_TRACE_JSON")]
    pub trace_json: bool,
}

/// Logs go to stderr; stdout carries the protocol.
pub fn initialize_tracing(config: &Config) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.trace_level))
        .with_context(|| format!("invalid trace level {:?}", config.trace_level))?;

    let registry = tracing_subscriber::registry().with(filter);
    let fmt = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if config.trace_json {
        registry
            .with(fmt.json().flatten_event(true))
            .try_init()
            .context("failed to install tracing subscriber")?;
    } else {
        registry
            .with(fmt)
            .try_init()
            .context("failed to install tracing subscriber")?;
    }
    Ok(())
}
