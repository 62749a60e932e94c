// crates/proxy/src/state.rs
use std::sync::Arc;

/// Default upstream API origin.
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://api.staging.us-1.platform.polyai.app";

/// Upstream API location and credentials.
///
/// Credentials are optional so the proxy can start without them; requests
/// then fail with a configuration error naming the missing variable.
#[derive(Clone)]
pub struct UpstreamConfig {
    pub api_key: Option<String>,
    pub account_id: Option<String>,
    pub base_url: String,
}

impl UpstreamConfig {
    pub fn new(api_key: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            account_id: Some(account_id.into()),
            base_url: DEFAULT_UPSTREAM_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// `{base}/v1/{account}/{project}/handoff_state?shared_id={shared}`
    pub fn handoff_url(&self, account_id: &str, project_id: &str, shared_id: &str) -> String {
        format!(
            "{}/v1/{}/{}/handoff_state?shared_id={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(account_id),
            urlencoding::encode(project_id),
            urlencoding::encode(shared_id),
        )
    }
}

// Keep the key out of logs.
impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("account_id", &self.account_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Shared proxy state.
#[derive(Debug, Clone)]
pub struct ProxyState {
    pub config: Arc<UpstreamConfig>,
    pub http: reqwest::Client,
}

impl ProxyState {
    pub fn new(config: UpstreamConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: UpstreamConfig, http: reqwest::Client) -> Self {
        Self {
            config: Arc::new(config),
            http,
        }
    }
}
