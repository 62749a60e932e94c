// crates/agent/src/fetch.rs
//! Handoff-state fetch client.
//!
//! Talks to the local proxy, never to the backend directly: the proxy holds
//! the API credential. Each logical fetch makes up to `max_attempts`
//! requests, each bounded by its own timeout, with a fixed pause between
//! attempts.

use std::time::Duration;

use async_trait::async_trait;
use handoff_view_types::HandoffState;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{AttemptError, FetchError};

/// Proxy route serving handoff state.
pub const HANDOFF_PATH: &str = "/api/poly/handoff_state";

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Origin of the proxy, e.g. `http://127.0.0.1:8788`.
    pub base_url: String,
    pub attempt_timeout: Duration,
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8788".into(),
            attempt_timeout: Duration::from_millis(10_000),
            max_attempts: 3,
            retry_delay: Duration::from_millis(1_000),
        }
    }
}

/// Source of handoff state for a (project, trace) pair.
#[async_trait]
pub trait HandoffFetcher: Send + Sync {
    async fn fetch(&self, project_id: &str, trace_id: &str) -> Result<HandoffState, FetchError>;
}

/// HTTP client for the proxy's handoff route.
///
/// Holds no per-fetch state, so one instance can serve concurrent fetches.
#[derive(Debug, Clone)]
pub struct HandoffClient {
    http: reqwest::Client,
    config: FetchConfig,
}

impl HandoffClient {
    pub fn new(config: FetchConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(http: reqwest::Client, config: FetchConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), HANDOFF_PATH)
    }

    /// One request, bounded by the attempt timeout. Dropping the inner
    /// future on timeout cancels the in-flight request.
    async fn attempt(&self, project_id: &str, trace_id: &str) -> Result<HandoffState, AttemptError> {
        let timeout = self.config.attempt_timeout;
        match tokio::time::timeout(timeout, self.send(project_id, trace_id)).await {
            Ok(result) => result,
            Err(_) => Err(AttemptError::Timeout(timeout.as_millis() as u64)),
        }
    }

    async fn send(&self, project_id: &str, trace_id: &str) -> Result<HandoffState, AttemptError> {
        let response = self
            .http
            .get(self.endpoint())
            .query(&[("projectId", project_id), ("sharedId", trace_id)])
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| AttemptError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = match response.json::<Value>().await {
                Ok(body) => {
                    warn!(status = status.as_u16(), body = %body, "Handoff proxy returned an error");
                    error_detail(&body)
                }
                Err(_) => "Unknown error".to_string(),
            };
            return Err(AttemptError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
                detail,
            });
        }

        response
            .json::<HandoffState>()
            .await
            .map_err(|e| AttemptError::MalformedBody(e.to_string()))
    }
}

#[async_trait]
impl HandoffFetcher for HandoffClient {
    async fn fetch(&self, project_id: &str, trace_id: &str) -> Result<HandoffState, FetchError> {
        info!(project_id, trace_id, "Fetching handoff state");
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            debug!(attempt, max_attempts, url = %self.endpoint(), "Handoff fetch attempt");
            match self.attempt(project_id, trace_id).await {
                Ok(state) => {
                    info!(project_id, trace_id, attempt, "Fetched handoff state");
                    return Ok(state);
                }
                Err(err) => {
                    warn!(attempt, max_attempts, error = %err, "Handoff fetch attempt failed");
                    if attempt >= max_attempts {
                        return Err(FetchError::Exhausted {
                            attempts: attempt,
                            last: err,
                        });
                    }
                    debug!(delay_ms = self.config.retry_delay.as_millis() as u64, "Retrying handoff fetch");
                    tokio::time::sleep(self.config.retry_delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// `error` string from a JSON error body, else the body itself.
fn error_detail(body: &Value) -> String {
    match body.get("error").and_then(Value::as_str) {
        Some(error) if !error.is_empty() => error.to_string(),
        _ => body.to_string(),
    }
}

/// Stand-in fetcher for development mode: returns the sample handoff after
/// a simulated network delay.
#[derive(Debug, Clone)]
pub struct MockHandoffFetcher {
    delay: Duration,
    response: HandoffState,
}

impl MockHandoffFetcher {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            response: HandoffState::sample(),
        }
    }
}

#[async_trait]
impl HandoffFetcher for MockHandoffFetcher {
    async fn fetch(&self, project_id: &str, trace_id: &str) -> Result<HandoffState, FetchError> {
        info!(project_id, trace_id, "Using mock handoff state in development mode");
        tokio::time::sleep(self.delay).await;
        Ok(self.response.clone())
    }
}
