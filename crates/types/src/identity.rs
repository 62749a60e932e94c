// crates/types/src/identity.rs
use serde::{Deserialize, Serialize};

/// Stable identity of a call, derived from a [`crate::RawCallEvent`].
///
/// Produced by the context parser in `handoff-view-core`; re-parsing the same
/// raw event always yields an equal value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallIdentity {
    pub project_id: Option<String>,
    pub trace_id: Option<String>,
    pub call_id: Option<String>,
    pub is_answered: bool,
}

impl CallIdentity {
    /// Key used to make sure each call is fetched at most once per session.
    ///
    /// The call id when present, otherwise `"{project_id}:{trace_id}"` with
    /// absent components rendered as empty strings.
    pub fn dedup_key(&self) -> String {
        match &self.call_id {
            Some(call_id) => call_id.clone(),
            None => format!(
                "{}:{}",
                self.project_id.as_deref().unwrap_or_default(),
                self.trace_id.as_deref().unwrap_or_default()
            ),
        }
    }

    /// Both identifiers needed for a handoff fetch are present.
    pub fn is_complete(&self) -> bool {
        self.project_id.is_some() && self.trace_id.is_some()
    }

    /// An answered, uniquely identified call whose context has not fully
    /// propagated yet. The host usually fills the gap within a second.
    pub fn needs_context_refetch(&self) -> bool {
        self.call_id.is_some() && self.is_answered && !self.is_complete()
    }
}
