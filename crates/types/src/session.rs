// crates/types/src/session.rs
use serde::{Deserialize, Serialize};

use crate::{CallIdentity, HandoffState};

/// Lifecycle state of one agent-assist session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Waiting for the host's event subscription to come up.
    Initializing,
    /// Subscribed; no answered call to act on.
    Waiting,
    /// A handoff fetch (or a context re-fetch) is outstanding.
    Loading,
    /// Handoff state received for the current call.
    Loaded,
    Error,
}

impl SessionState {
    /// Short status text for the presentation layer.
    pub fn label(self) -> &'static str {
        match self {
            SessionState::Initializing => "Initializing SDK",
            SessionState::Waiting => "Waiting for call",
            SessionState::Loading => "Loading",
            SessionState::Loaded => "Ready",
            SessionState::Error => "Error",
        }
    }
}

/// Everything the presentation layer needs to draw the current session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Identity parsed from the most recent context event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<CallIdentity>,
    /// Handoff state for the active call, once loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handoff: Option<HandoffState>,
    /// Project of the call `handoff` was fetched for. Selects the display
    /// configuration; later events may carry a different identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handoff_project_id: Option<String>,
    pub development_mode: bool,
    pub refetch_pending: bool,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            state: SessionState::Initializing,
            error_message: None,
            identity: None,
            handoff: None,
            handoff_project_id: None,
            development_mode: false,
            refetch_pending: false,
        }
    }
}
