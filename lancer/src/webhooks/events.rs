//! Webhook event types.
//!
//! Every webhook body is a JSON object. The optional `type` key names the event;
//! the rest of the object is the event data, typed by the handler.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Untyped event data: the JSON object minus its `type` key.
pub type JsonObject = Map<String, Value>;

/// Complete webhook event as delivered to a handler.
///
/// `type` is kept as raw JSON so that any object is accepted, whatever its sender put
/// there. Use [`WebhookEvent::kind`] for the usual string form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent<T = JsonObject> {
    /// Event type (e.g., "file.uploaded"), when the sender includes one
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<Value>,
    /// Event-specific data
    #[serde(flatten)]
    pub data: T,
}

impl<T> WebhookEvent<T> {
    /// The event type, when it is a string.
    pub fn kind(&self) -> Option<&str> {
        self.event_type.as_ref().and_then(Value::as_str)
    }
}

/// Data for an uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Keys this crate does not model
    #[serde(flatten)]
    pub extra: JsonObject,
}

/// Data for an upload session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<UFile>,
    /// Keys this crate does not model
    #[serde(flatten)]
    pub extra: JsonObject,
}
