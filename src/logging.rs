//! File-backed tracing setup.
//!
//! The terminal belongs to the office view, so log output only exists when
//! a log file is requested. The filter comes from `AGENT_OFFICE_LOG` (or
//! `RUST_LOG`), e.g. `agent_office::ingest=trace,warn`.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "agent_office=debug,warn";

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directive, e.g. "agent_office=debug,warn".
    pub filter: String,
    pub file: PathBuf,
}

impl LogConfig {
    /// Filter from the environment, output to `file`.
    pub fn from_env(file: PathBuf) -> Self {
        let filter = std::env::var("AGENT_OFFICE_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_FILTER.to_string());
        Self { filter, file }
    }
}

/// Install the global subscriber writing to `config.file` (appending).
/// A second call is a no-op.
pub fn init(config: &LogConfig) -> std::io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.file)?;

    let env_filter =
        EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true),
        )
        .try_init();
    Ok(())
}
