// crates/types/src/error.rs
use serde::{Deserialize, Serialize};

/// JSON error body returned by the proxy endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<serde_json::Value>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}
