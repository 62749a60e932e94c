// crates/agent/src/main.rs
//! `handoff-assist`: terminal agent-assist view.
//!
//! Replays phone-context events (one JSON object per line) from a file or
//! stdin, fetches handoff state for each answered call through the proxy
//! and prints it. Without an event source, `--dev` runs against the
//! built-in sample call.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use handoff_view_agent::{
    CallSession, FetchConfig, HandoffClient, JsonLinesHost, PhoneContextHost, SessionConfig,
    UnavailableHost,
};
use handoff_view_core::{render_text, ProjectRegistry};
use handoff_view_observability::{init_tracing, LogFormat};
use handoff_view_types::{SessionSnapshot, SessionState};

const DEFAULT_LOG_FILTER: &str = "warn,handoff_view_agent=info,handoff_view_core=info";

#[derive(Debug, Parser)]
#[command(name = "handoff-assist", version, about = "Show handoff state for the call on the line")]
struct Cli {
    /// Origin of the handoff proxy.
    #[arg(long, env = "HANDOFF_PROXY_URL", default_value = "http://127.0.0.1:8788")]
    proxy_url: String,

    /// Phone-context events, one JSON object per line. `-` reads stdin.
    #[arg(long, value_name = "PATH")]
    events: Option<PathBuf>,

    /// Pause between replayed events, in milliseconds.
    #[arg(long, default_value_t = 0)]
    pace_ms: u64,

    /// Fall back to the sample call and mock data when no event source is given.
    #[arg(long, env = "HANDOFF_DEV_MODE")]
    dev: bool,

    /// TOML file with per-project display configuration.
    #[arg(long, env = "HANDOFF_PROJECTS", value_name = "PATH")]
    projects: Option<PathBuf>,

    /// Always print the raw handoff payload.
    #[arg(long)]
    raw: bool,

    /// Per-attempt timeout for handoff fetches, in milliseconds.
    #[arg(long, default_value_t = 10_000)]
    attempt_timeout_ms: u64,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(DEFAULT_LOG_FILTER, cli.log_format)?;

    let mut registry = ProjectRegistry::builtin();
    if let Some(path) = &cli.projects {
        let loaded = registry
            .load_file(path)
            .with_context(|| format!("loading display configuration from {}", path.display()))?;
        tracing::info!(path = %path.display(), projects = loaded, "Loaded display configuration");
    }

    let pace = Duration::from_millis(cli.pace_ms);
    let host: Arc<dyn PhoneContextHost> = match &cli.events {
        Some(path) if path.as_os_str() == "-" => Arc::new(JsonLinesHost::stdin().with_pace(pace)),
        Some(path) => Arc::new(
            JsonLinesHost::open(path)
                .await
                .with_context(|| format!("opening event file {}", path.display()))?
                .with_pace(pace),
        ),
        None => Arc::new(UnavailableHost),
    };

    let fetcher = Arc::new(HandoffClient::new(FetchConfig {
        base_url: cli.proxy_url.clone(),
        attempt_timeout: Duration::from_millis(cli.attempt_timeout_ms),
        ..FetchConfig::default()
    }));

    let session = CallSession::spawn(
        host,
        fetcher,
        SessionConfig {
            dev_fallback: cli.dev,
            ..SessionConfig::default()
        },
    );

    let show_raw = cli.raw;
    let mut updates = session.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            let snapshot = updates.borrow_and_update().clone();
            print_snapshot(&snapshot, &registry, show_raw);
            if updates.changed().await.is_err() {
                break;
            }
        }
    });

    let last = session.wait().await;
    let _ = printer.await;

    if last.state == SessionState::Error {
        anyhow::bail!(last
            .error_message
            .unwrap_or_else(|| "session ended with an error".to_string()));
    }
    Ok(())
}

fn print_snapshot(snapshot: &SessionSnapshot, registry: &ProjectRegistry, raw: bool) {
    let dev = if snapshot.development_mode { " [development mode]" } else { "" };
    println!("[{}]{dev}", snapshot.state.label());

    match snapshot.state {
        SessionState::Loaded => {
            let Some(handoff) = &snapshot.handoff else {
                return;
            };
            let project_id = snapshot.handoff_project_id.as_deref().unwrap_or_default();
            print!("{}", render_text(registry.get(project_id), handoff, raw));
        }
        SessionState::Error => {
            if let Some(message) = &snapshot.error_message {
                println!("{message}");
            }
        }
        _ => {}
    }
}
