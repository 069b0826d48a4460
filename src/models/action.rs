//! Action requests and the response envelope of the attendance service.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The four request kinds the attendance service understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    GetStatus,
    ClockIn,
    ClockOut,
    Complete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::GetStatus => "getstatus",
            Action::ClockIn => "clockin",
            Action::ClockOut => "clockout",
            Action::Complete => "complete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single action request, built fresh for every call.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub action: Action,
    pub id: String,
    pub name: String,
    pub extra: Map<String, Value>,
}

impl ActionRequest {
    pub fn new(action: Action, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            action,
            id: id.into(),
            name: name.into(),
            extra: Map::new(),
        }
    }

    pub fn with_extra(mut self, extra: Map<String, Value>) -> Self {
        self.extra = extra;
        self
    }

    /// JSON body `{action, id, name, ...extra}`; extra keys win on collision.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("action".into(), Value::from(self.action.as_str()));
        body.insert("id".into(), Value::from(self.id.clone()));
        body.insert("name".into(), Value::from(self.name.clone()));
        for (key, value) in &self.extra {
            body.insert(key.clone(), value.clone());
        }
        Value::Object(body)
    }
}

/// Response envelope returned by the attendance service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_wire_names() {
        assert_eq!(serde_json::to_value(Action::GetStatus).unwrap(), "getstatus");
        assert_eq!(serde_json::to_value(Action::ClockOut).unwrap(), "clockout");
        let parsed: Action = serde_json::from_value(json!("clockin")).unwrap();
        assert_eq!(parsed, Action::ClockIn);
    }

    #[test]
    fn test_request_body_shape() {
        let body = ActionRequest::new(Action::ClockIn, "user01", "Taro").to_body();
        assert_eq!(
            body,
            json!({ "action": "clockin", "id": "user01", "name": "Taro" })
        );
    }

    #[test]
    fn test_extra_fields_override() {
        let mut extra = Map::new();
        extra.insert("id".into(), json!("user02"));
        extra.insert("note".into(), json!("late"));

        let body = ActionRequest::new(Action::Complete, "user01", "Taro")
            .with_extra(extra)
            .to_body();

        assert_eq!(body["id"], "user02");
        assert_eq!(body["note"], "late");
        assert_eq!(body["action"], "complete");
    }

    #[test]
    fn test_envelope_defaults() {
        let envelope: ApiEnvelope = serde_json::from_str("{}").unwrap();
        assert!(!envelope.ok);
        assert!(envelope.message.is_none());
        assert!(envelope.data.is_none());
    }
}
