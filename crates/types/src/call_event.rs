// crates/types/src/call_event.rs
//! Raw phone-context payload as delivered by the telephony host.

use serde::{Deserialize, Serialize};

use crate::lenient;

/// One call-context notification from the host.
///
/// Every field is optional. Fields of interest live either at the top level
/// or inside the nested [`CallObject`]; which one is populated depends on
/// how far the host's context propagation has got when the event fires.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCallEvent {
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub active_tab: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::object", skip_serializing_if = "Option::is_none")]
    pub call_object: Option<CallObject>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub call_status: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub event_ts: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

/// The nested "call object" carried by richer context notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallObject {
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub answer_start_time: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub call_end_time: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub call_status: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient::object", skip_serializing_if = "Option::is_none")]
    pub callee: Option<CallParty>,
    #[serde(default, deserialize_with = "lenient::object", skip_serializing_if = "Option::is_none")]
    pub caller: Option<CallParty>,
    #[serde(default, deserialize_with = "lenient::object", skip_serializing_if = "Option::is_none")]
    pub forwarded_by: Option<ForwardedBy>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub ringing_start_time: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

/// Caller or callee endpoint of a call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallParty {
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub extension_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub extension_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub extension_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// The queue (or user) that forwarded the call. Its `name` carries the
/// routing label `<anything>__<projectId>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardedBy {
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub extension_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub extension_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RawCallEvent {
    /// Routing label of the forwarding queue, if the nested call object has one.
    pub fn routing_label(&self) -> Option<&str> {
        self.call_object
            .as_ref()
            .and_then(|o| o.forwarded_by.as_ref())
            .and_then(|f| f.name.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_deserialize_nested_payload() {
        let json = r#"{
            "callId": "c1",
            "callStatus": "Active",
            "callObject": {
                "traceId": "t1",
                "forwardedBy": { "name": "sales__PROJ-1", "extensionNumber": "1002" },
                "caller": { "phoneNumber": "+15555551000" }
            }
        }"#;
        let event: RawCallEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.call_id.as_deref(), Some("c1"));
        assert_eq!(event.call_status.as_deref(), Some("Active"));
        assert_eq!(event.routing_label(), Some("sales__PROJ-1"));
        let object = event.call_object.unwrap();
        assert_eq!(object.trace_id.as_deref(), Some("t1"));
        assert_eq!(
            object.caller.unwrap().phone_number.as_deref(),
            Some("+15555551000")
        );
    }

    #[test]
    fn test_malformed_fields_degrade_to_none() {
        let json = r#"{
            "callId": 12345,
            "callStatus": null,
            "traceId": ["not", "a", "string"],
            "callObject": "garbage",
            "unknownField": true
        }"#;
        let event: RawCallEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.call_id.as_deref(), Some("12345"));
        assert_eq!(event.call_status, None);
        assert_eq!(event.trace_id, None);
        assert_eq!(event.call_object, None);
    }

    #[test]
    fn test_empty_object_is_default() {
        let event: RawCallEvent = serde_json::from_str("{}").unwrap();
        assert_eq!(event, RawCallEvent::default());
        assert_eq!(event.routing_label(), None);
    }
}
