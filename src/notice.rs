//! Purpose: Structured schema for non-fatal stderr notices (degraded results).
//! Exports: `Notice`, `notice_json`.
//! Role: Shared contract helper for CLI diagnostics that are not errors.
//! Invariants: Notices never alter stdout payloads or the exit code.
//! Invariants: JSON schema is additive-only once published.
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: String,
    pub time: String,
    pub cmd: String,
    pub message: String,
    pub details: Map<String, Value>,
}

impl Notice {
    /// A fetch that fell back to an empty table.
    pub fn degraded(cmd: &str, time: String, message: String) -> Self {
        Self {
            kind: "degraded".to_string(),
            time,
            cmd: cmd.to_string(),
            message,
            details: Map::new(),
        }
    }
}

pub fn notice_json(notice: &Notice) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(notice.kind));
    inner.insert("time".to_string(), json!(notice.time));
    inner.insert("cmd".to_string(), json!(notice.cmd));
    inner.insert("message".to_string(), json!(notice.message));
    inner.insert("details".to_string(), Value::Object(notice.details.clone()));

    let mut outer = Map::new();
    outer.insert("notice".to_string(), Value::Object(inner));
    Value::Object(outer)
}
