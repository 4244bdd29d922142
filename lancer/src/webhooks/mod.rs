//! Signed webhook receivers.
//!
//! - [`signing`]: HMAC-SHA256 signature generation and constant-time verification
//! - [`events`]: Event envelope and the file/session payload shapes
//!
//! [`WebhookRoute`] wraps a caller's [`WebhookHandler`] into something an HTTP host can
//! call: either the framework-neutral [`WebhookRoute::respond`] or directly as an axum
//! handler (`axum::routing::post(route)`).
//!
//! Only missing headers and signature mismatches are answered here (403). Unreadable
//! bodies, malformed JSON and handler failures are returned as [`Error`] for the host to
//! render.

pub mod events;
pub mod signing;

use std::{fmt, future::Future, sync::Arc};

use async_trait::async_trait;
use axum::{
    Json,
    extract::Request,
    handler::Handler,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::errors::{Error, Result};

pub use events::{JsonObject, Session, UFile, WebhookEvent};
pub use signing::{SIGNATURE_HEADER, TIMESTAMP_HEADER, sign_payload, verify_signature};

/// Default cap on buffered request bodies (matches axum's `DefaultBodyLimit`)
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Which bytes stand in for the payload in the signed message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Canonicalization {
    /// The request body exactly as received. Checked before the body is parsed.
    #[default]
    RawBody,
    /// The parsed body re-serialized as compact JSON with insertion-ordered keys.
    ///
    /// This agrees with a `JSON.stringify` sender only while the payload avoids the
    /// places where the two serializers differ:
    ///
    /// - exponents: JavaScript writes `1e+21`, `serde_json` writes `1e21`
    /// - integral floats: `1.0` stays `1.0` here but becomes `1` in JavaScript
    /// - integer-like keys (`"1"`, `"2"`), which JavaScript moves to the front
    ///
    /// Any of these, or whitespace in the signed form, breaks verification.
    Reserialized,
}

/// Shared webhook secret. Never printed.
pub(crate) struct WebhookSecret(Vec<u8>);

impl WebhookSecret {
    pub(crate) fn new(secret: impl Into<String>) -> Self {
        Self(secret.into().into_bytes())
    }

    pub(crate) fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(<redacted>)")
    }
}

/// Business logic run for every accepted webhook.
#[async_trait]
pub trait WebhookHandler<T>: Send + Sync + 'static {
    async fn handle(&self, event: WebhookEvent<T>) -> anyhow::Result<Response>;
}

#[async_trait]
impl<T, F, Fut> WebhookHandler<T> for F
where
    T: Send + 'static,
    F: Fn(WebhookEvent<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Response>> + Send,
{
    async fn handle(&self, event: WebhookEvent<T>) -> anyhow::Result<Response> {
        (self)(event).await
    }
}

/// A webhook handler wrapped with optional signature verification.
///
/// Created by [`crate::Lancer::handle_webhook`].
pub struct WebhookRoute<T = JsonObject> {
    secret: Arc<WebhookSecret>,
    handler: Arc<dyn WebhookHandler<T>>,
    verification: bool,
    canonicalization: Canonicalization,
    body_limit: usize,
}

impl<T> Clone for WebhookRoute<T> {
    fn clone(&self) -> Self {
        Self {
            secret: Arc::clone(&self.secret),
            handler: Arc::clone(&self.handler),
            verification: self.verification,
            canonicalization: self.canonicalization,
            body_limit: self.body_limit,
        }
    }
}

impl<T> fmt::Debug for WebhookRoute<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookRoute")
            .field("verification", &self.verification)
            .field("canonicalization", &self.canonicalization)
            .field("body_limit", &self.body_limit)
            .finish_non_exhaustive()
    }
}

impl<T> WebhookRoute<T>
where
    T: DeserializeOwned + Send + 'static,
{
    pub(crate) fn new(
        secret: Arc<WebhookSecret>,
        handler: Arc<dyn WebhookHandler<T>>,
        verification: bool,
        canonicalization: Canonicalization,
    ) -> Self {
        Self {
            secret,
            handler,
            verification,
            canonicalization,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Cap the number of body bytes buffered when mounted as an axum handler.
    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }

    pub fn verification(&self) -> bool {
        self.verification
    }

    /// Verify (if enabled) and dispatch an already-buffered request.
    pub async fn respond(&self, headers: &HeaderMap, body: Bytes) -> Result<Response> {
        self.process(headers, async move { Ok::<_, Error>(body) }).await
    }

    /// The body is only awaited once the headers allow the request through.
    #[instrument(skip_all, fields(verification = self.verification))]
    async fn process<B>(&self, headers: &HeaderMap, body: B) -> Result<Response>
    where
        B: Future<Output = Result<Bytes>>,
    {
        if !self.verification {
            let event = serde_json::from_slice(&body.await?)?;
            return self.dispatch(event).await;
        }

        let Some((timestamp, signature)) = signature_headers(headers) else {
            debug!("Webhook rejected: missing {TIMESTAMP_HEADER} or {SIGNATURE_HEADER} header");
            return Ok(access_restricted());
        };

        let body = body.await?;
        let secret = self.secret.expose();

        let event = match self.canonicalization {
            Canonicalization::RawBody => {
                if !verify_signature(secret, timestamp, &body, signature) {
                    debug!("Webhook rejected: signature mismatch");
                    return Ok(access_restricted());
                }
                serde_json::from_slice(&body)?
            }
            Canonicalization::Reserialized => {
                let payload: Value = serde_json::from_slice(&body)?;
                let canonical = serde_json::to_vec(&payload)?;
                if !verify_signature(secret, timestamp, &canonical, signature) {
                    debug!("Webhook rejected: signature mismatch");
                    return Ok(access_restricted());
                }
                serde_json::from_value(payload)?
            }
        };

        debug!("Webhook signature verified");
        self.dispatch(event).await
    }

    async fn dispatch(&self, event: WebhookEvent<T>) -> Result<Response> {
        Ok(self.handler.handle(event).await?)
    }
}

impl<T, S> Handler<(), S> for WebhookRoute<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Future = BoxFuture<'static, Response>;

    fn call(self, req: Request, _state: S) -> Self::Future {
        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let limit = self.body_limit;
            let body = async move {
                axum::body::to_bytes(body, limit)
                    .await
                    .map_err(|err| Error::from_body(err, limit))
            };
            self.process(&parts.headers, body).await.into_response()
        })
    }
}

/// Both signature headers, present and non-empty.
fn signature_headers(headers: &HeaderMap) -> Option<(&str, &str)> {
    Some((
        non_empty_header(headers, TIMESTAMP_HEADER)?,
        non_empty_header(headers, SIGNATURE_HEADER)?,
    ))
}

fn non_empty_header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

fn access_restricted() -> Response {
    (StatusCode::FORBIDDEN, Json(json!({ "message": "access restricted" }))).into_response()
}
