// crates/proxy/src/handoff.rs
//! Handoff-state route: forwards to the upstream API with the server-held
//! key so the browser-side caller never sees it.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::state::ProxyState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffQuery {
    pub project_id: Option<String>,
    pub shared_id: Option<String>,
}

/// GET /api/poly/handoff_state?projectId=..&sharedId=..
pub async fn get_handoff_state(
    State(state): State<ProxyState>,
    Query(query): Query<HandoffQuery>,
) -> ApiResult<Json<Value>> {
    let config = &state.config;
    let api_key = present(config.api_key.as_deref()).ok_or(ApiError::NotConfigured("UPSTREAM_API_KEY"))?;
    let account_id =
        present(config.account_id.as_deref()).ok_or(ApiError::NotConfigured("UPSTREAM_ACCOUNT_ID"))?;

    let (Some(project_id), Some(shared_id)) = (
        present(query.project_id.as_deref()),
        present(query.shared_id.as_deref()),
    ) else {
        return Err(ApiError::MissingParameters);
    };

    let url = config.handoff_url(account_id, project_id, shared_id);
    info!(project_id, shared_id, "Fetching handoff state from upstream");
    debug!(%url, "Upstream request");

    let response = state
        .http
        .get(&url)
        .header("x-api-key", api_key)
        .header(CONTENT_TYPE, "application/json")
        .send()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|e| ApiError::Internal(format!("invalid upstream response: {e}")))?;

    if !status.is_success() {
        return Err(ApiError::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    Ok(Json(body))
}

/// Bare OPTIONS request; CORS headers come from the layer.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
