#![no_main]

use handoff_view_core::parse_call_event;
use handoff_view_types::RawCallEvent;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(event) = serde_json::from_slice::<RawCallEvent>(data) else {
        return;
    };
    let identity = parse_call_event(&event);
    if identity.needs_context_refetch() {
        assert!(identity.is_answered);
        assert!(identity.call_id.is_some());
        assert!(!identity.is_complete());
    }
    if let Some(project) = &identity.project_id {
        assert!(!project.is_empty());
        assert!(!project.contains("__"));
    }
    let _ = identity.dedup_key();
});
