//! Classification of decoded NDJSON lines.

use serde_json::{Map, Value};

/// One decoded line of a search stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamRecord {
    /// Domain data: a full or partial query result.
    Payload(Value),
    /// Graceful end of the stream (`{"end": true}`).
    End,
    /// In-band server failure (`{"error": "..."}`).
    Error(String),
}

impl StreamRecord {
    /// Classify a parsed line.
    ///
    /// A truthy `end` field marks the end sentinel and wins over everything
    /// else. An error sentinel carries a non-null `error` or `detail` field,
    /// or a `msg` next to a non-zero `code` (the backend's failure envelope).
    /// Everything else, including non-object values, is payload.
    pub fn classify(value: Value) -> Self {
        match value.as_object().and_then(sentinel) {
            Some(record) => record,
            None => Self::Payload(value),
        }
    }

    /// Whether this is the end sentinel.
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }
}

fn sentinel(obj: &Map<String, Value>) -> Option<StreamRecord> {
    if obj.get("end").is_some_and(is_truthy) {
        return Some(StreamRecord::End);
    }

    for key in ["error", "detail"] {
        if let Some(err) = obj.get(key).filter(|v| !v.is_null()) {
            return Some(StreamRecord::Error(message_text(err)));
        }
    }

    let failed_envelope = obj
        .get("code")
        .and_then(Value::as_i64)
        .is_some_and(|code| code != 0);
    if failed_envelope {
        if let Some(msg) = obj.get("msg").filter(|v| !v.is_null()) {
            return Some(StreamRecord::Error(message_text(msg)));
        }
    }

    None
}

/// JavaScript-style truthiness, which is what the backend's clients test.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn message_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
