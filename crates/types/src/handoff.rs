// crates/types/src/handoff.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Case data handed over by the conversational-AI system when a call is
/// transferred to a human agent.
///
/// `data` keeps the backend's key order so auto-generated displays list
/// fields the way the backend sent them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffState {
    pub data: Map<String, Value>,
    #[serde(default)]
    pub id: Option<String>,
    pub shared_id: String,
}

impl HandoffState {
    /// Sample payload used when the agent runs in development mode.
    pub fn sample() -> Self {
        let mut data = Map::new();
        data.insert("current_date_time".into(), Value::from("2026-01-30 01:21:02"));
        data.insert("test_value_1".into(), Value::from("ABC-234"));
        data.insert("test_value_2".into(), Value::from("The call is a test call"));
        data.insert("x_trace_id".into(), Value::from("1234567890123456789"));
        Self {
            data,
            id: None,
            shared_id: "1234567890123456789".into(),
        }
    }
}
