// crates/observability/src/lib.rs
//! Tracing setup shared by the agent and proxy binaries.
//!
//! `RUST_LOG` always wins; otherwise each binary passes its own default
//! filter (quiet for dependencies, `info` for our crates).

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact human-readable lines on stderr.
    #[default]
    Pretty,
    /// One JSON object per line, for log shippers.
    Json,
}

/// Install the global subscriber. Logs go to stderr so stdout stays free
/// for program output.
pub fn init_tracing(default_filter: &str, format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init()?,
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?,
    }
    Ok(())
}
