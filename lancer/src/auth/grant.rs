//! Grant records returned by token-exchange handlers, and the session request they read.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::{Error, Result};
use crate::webhooks::JsonObject;

/// Status used when a grant names neither an owner nor a status.
pub const DEFAULT_GRANT_STATUS: u16 = 400;

/// The authorization decision for one token.
///
/// A grant with a non-empty `owner_id` is a success; anything else is sent back to the
/// client as-is, with `status` as the HTTP status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAuthGrant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SessionAuthGrant {
    /// Grant access on behalf of `owner_id`.
    pub fn owner(owner_id: impl Into<String>) -> Self {
        Self {
            status: Some(StatusCode::OK.as_u16()),
            owner_id: Some(owner_id.into()),
            message: None,
        }
    }

    /// Refuse access with a caller-chosen status and message.
    pub fn denied(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: Some(status.as_u16()),
            owner_id: None,
            message: Some(message.into()),
        }
    }

    /// The owner, when there is a non-empty one.
    pub fn granted_owner(&self) -> Option<&str> {
        self.owner_id.as_deref().filter(|owner| !owner.is_empty())
    }

    /// Render the grant as the HTTP reply for the auth gate.
    ///
    /// Owners get `200 {"ownerId": ...}` and nothing else; otherwise the whole grant is the
    /// body. Statuses outside 200..=599 cannot be sent and are an error.
    pub fn into_reply(self) -> Result<Response> {
        if let Some(owner) = self.granted_owner() {
            return Ok((StatusCode::OK, Json(json!({ "ownerId": owner }))).into_response());
        }

        let code = self.status.unwrap_or(DEFAULT_GRANT_STATUS);
        let status = match StatusCode::from_u16(code) {
            Ok(status) if (200..=599).contains(&code) => status,
            _ => return Err(Error::InvalidStatus { status: code }),
        };

        Ok((status, Json(self)).into_response())
    }
}

/// Upload constraints a session may be opened with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAuthenticateOptions {
    /// MIME types accepted; `type/*` and `*/*` wildcards allowed. Empty means any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepts: Option<Vec<String>>,
    /// Largest file size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
    /// Smallest file size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chunk_count: Option<u32>,
}

impl SessionAuthenticateOptions {
    /// Whether a file of this MIME type and size fits the constraints.
    pub fn admits(&self, mime_type: &str, size: u64) -> bool {
        self.admits_size(size) && self.admits_mime_type(mime_type)
    }

    pub fn admits_size(&self, size: u64) -> bool {
        self.min_size.is_none_or(|min| size >= min) && self.max_size.is_none_or(|max| size <= max)
    }

    pub fn admits_chunk_count(&self, chunks: u32) -> bool {
        self.max_chunk_count.is_none_or(|max| chunks <= max)
    }

    pub fn admits_mime_type(&self, mime_type: &str) -> bool {
        match self.accepts.as_deref() {
            None | Some([]) => true,
            Some(patterns) => patterns.iter().any(|pattern| mime_matches(pattern, mime_type)),
        }
    }
}

fn mime_matches(pattern: &str, mime_type: &str) -> bool {
    let pattern = pattern.trim();
    if pattern == "*" || pattern == "*/*" {
        return true;
    }
    // Parameters such as `; charset=utf-8` do not take part in matching
    let essence = mime_type.split(';').next().unwrap_or_default().trim();

    match pattern.strip_suffix("/*") {
        Some(kind) => essence
            .split_once('/')
            .is_some_and(|(essence_kind, _)| essence_kind.eq_ignore_ascii_case(kind)),
        None => essence.eq_ignore_ascii_case(pattern),
    }
}

/// Payload posted to the auth gate when opening an upload session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRequest {
    #[serde(flatten)]
    pub options: SessionAuthenticateOptions,
    /// Any other keys the client sent
    #[serde(flatten)]
    pub metadata: JsonObject,
}
