// crates/proxy/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use handoff_view_types::ErrorResponse;
use serde_json::Value;
use thiserror::Error;

/// Proxy error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required server-side setting is missing. Holds the variable name.
    #[error("{0} not configured")]
    NotConfigured(&'static str),

    #[error("Missing required parameters: projectId, sharedId")]
    MissingParameters,

    /// Upstream answered with a non-success status. Reported to the caller
    /// as a 500; the upstream status is logged.
    #[error("Upstream API error: {status}")]
    Upstream { status: u16, body: Value },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            ApiError::NotConfigured(var) => {
                tracing::error!(variable = var, "Upstream credential not configured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(format!("{var} not configured")),
                )
            }
            ApiError::MissingParameters => {
                tracing::warn!("Handoff request missing projectId or sharedId");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new("Missing required parameters: projectId, sharedId"),
                )
            }
            ApiError::Upstream { status, body } => {
                tracing::error!(status, body = %body, "Upstream API error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details("Upstream API error", body),
                )
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details("Internal server error", message),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::NotConfigured("UPSTREAM_API_KEY").into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::MissingParameters.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Upstream {
                status: 404,
                body: json!({ "detail": "not found" })
            }
            .into_response()
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
