// crates/proxy/src/lib.rs
//! Credential-hiding proxy for the upstream handoff-state API.

pub mod error;
pub mod handoff;
pub mod state;

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::{ProxyState, UpstreamConfig, DEFAULT_UPSTREAM_BASE_URL};

/// Route the agent fetches handoff state from.
pub const HANDOFF_ROUTE: &str = "/api/poly/handoff_state";

pub fn app(state: ProxyState) -> Router {
    // The agent view is served from another origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            HANDOFF_ROUTE,
            get(handoff::get_handoff_state)
                .options(handoff::preflight)
                .fallback(handoff::method_not_allowed),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
