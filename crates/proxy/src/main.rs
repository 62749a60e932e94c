// crates/proxy/src/main.rs
use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use clap::Parser;
use handoff_view_observability::{init_tracing, LogFormat};
use handoff_view_proxy::{ProxyState, UpstreamConfig, DEFAULT_UPSTREAM_BASE_URL};
use tracing::{info, warn};

const DEFAULT_LOG_FILTER: &str = "warn,handoff_view_proxy=info,tower_http=info";

#[derive(Debug, Parser)]
#[command(name = "handoff-proxy", version, about = "Proxy handoff-state requests to the upstream API")]
struct Args {
    #[arg(long, env = "HANDOFF_PROXY_PORT", default_value_t = 8788)]
    port: u16,

    #[arg(long, env = "HANDOFF_PROXY_BIND", default_value = "127.0.0.1")]
    bind: IpAddr,

    /// Upstream API key, sent as `x-api-key`.
    #[arg(long, env = "UPSTREAM_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "UPSTREAM_ACCOUNT_ID")]
    account_id: Option<String>,

    #[arg(long, env = "UPSTREAM_BASE_URL", default_value = DEFAULT_UPSTREAM_BASE_URL)]
    base_url: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(DEFAULT_LOG_FILTER, args.log_format)?;

    if args.api_key.is_none() || args.account_id.is_none() {
        warn!("Upstream credentials incomplete; handoff requests will fail until configured");
    }

    let config = UpstreamConfig {
        api_key: args.api_key,
        account_id: args.account_id,
        base_url: args.base_url,
    };
    info!(?config, "Upstream configured");
    let app = handoff_view_proxy::app(ProxyState::new(config));

    let addr = SocketAddr::new(args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Handoff proxy listening on http://{addr}");
    axum::serve(listener, app).await.context("proxy server")?;
    Ok(())
}
