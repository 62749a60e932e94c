// crates/core/src/context.rs
//! Call-context parsing.
//!
//! Turns a partially-populated [`RawCallEvent`] into a [`CallIdentity`].
//! Every function here is total: missing or malformed fields degrade to
//! `None`/`false`, never to an error.

use handoff_view_types::{CallIdentity, RawCallEvent};

/// Separator between the queue name and the project id in a routing label.
const PROJECT_SEPARATOR: &str = "__";

/// Lower-cased call statuses that mean an agent is on the call.
const ACTIVE_STATES: [&str; 5] = ["active", "connected", "incall", "in_call", "in call"];

/// Parse a raw host event into the identity used for dedup and fetching.
pub fn parse_call_event(event: &RawCallEvent) -> CallIdentity {
    CallIdentity {
        project_id: event.routing_label().and_then(extract_project_id),
        trace_id: extract_trace_id(event),
        call_id: extract_call_id(event),
        is_answered: is_call_answered(event),
    }
}

/// Project id from a routing label of the form `<anything>__<projectId>`.
///
/// Uses the last `__`; the remainder is trimmed and an empty result is `None`.
pub fn extract_project_id(label: &str) -> Option<String> {
    let idx = label.rfind(PROJECT_SEPARATOR)?;
    let project_id = label[idx + PROJECT_SEPARATOR.len()..].trim();
    (!project_id.is_empty()).then(|| project_id.to_string())
}

/// Nested trace id first, then the top-level one.
pub fn extract_trace_id(event: &RawCallEvent) -> Option<String> {
    let nested = event.call_object.as_ref().and_then(|o| o.trace_id.as_deref());
    first_present([nested, event.trace_id.as_deref()])
}

/// Top-level call id first, then the nested trace id.
pub fn extract_call_id(event: &RawCallEvent) -> Option<String> {
    let nested = event.call_object.as_ref().and_then(|o| o.trace_id.as_deref());
    first_present([event.call_id.as_deref(), nested])
}

/// True if either the top-level or the nested status is an active state.
pub fn is_call_answered(event: &RawCallEvent) -> bool {
    let nested = event.call_object.as_ref().and_then(|o| {
        non_empty(o.call_status.as_deref()).or_else(|| non_empty(o.status.as_deref()))
    });
    is_active_status(event.call_status.as_deref()) || is_active_status(nested)
}

fn is_active_status(status: Option<&str>) -> bool {
    status.is_some_and(|s| ACTIVE_STATES.contains(&s.to_lowercase().as_str()))
}

fn first_present<const N: usize>(candidates: [Option<&str>; N]) -> Option<String> {
    candidates.into_iter().find_map(non_empty).map(String::from)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}
