//! # lancer: signed webhooks and auth gates for axum services
//!
//! `lancer` wraps two kinds of business handlers into HTTP handlers:
//!
//! - **Webhook routes** ([`webhooks`]) check that an inbound webhook was signed with the
//!   shared secret before handing its JSON payload to the handler. The signature is the
//!   hex-encoded HMAC-SHA256 of `{x-timestamp}.{payload}`, sent in `x-signature`, and is
//!   compared in constant time.
//! - **Auth gates** ([`auth`]) read a bearer token, pass it with the JSON payload to a
//!   token-exchange handler, and shape the resulting grant into a response.
//!
//! Both route types can be called without a framework through their `respond` methods
//! (plain `http` headers and body bytes in, a response out), and both implement
//! [`axum::handler::Handler`] so they mount straight onto a router.
//!
//! The two differ on failure. A webhook route answers only the cases it owns (missing
//! headers, bad signature: 403) and returns every other failure as an [`Error`] for the
//! host to render. An auth gate catches everything and answers 500 itself.
//!
//! ## Quick Start
//!
//! ```no_run
//! use axum::{Json, Router, response::{IntoResponse, Response}, routing::post};
//! use lancer::{Lancer, webhooks::{UFile, WebhookEvent}};
//!
//! async fn on_upload(event: WebhookEvent<UFile>) -> anyhow::Result<Response> {
//!     tracing::info!(file = ?event.data.id, "file uploaded");
//!     Ok(Json(serde_json::json!({ "ok": true })).into_response())
//! }
//!
//! # async fn run() -> anyhow::Result<()> {
//! let lancer = Lancer::new(std::env::var("WEBHOOK_SECRET")?);
//! let app: Router = Router::new().route("/webhooks", post(lancer.handle_webhook(on_upload, true)));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3002").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! The bundled `lancer` binary is a verified webhook receiver. See the [`config`] module
//! for its options and [`server`] for its routes.

pub mod auth;
pub mod config;
pub mod errors;
pub mod server;
pub mod telemetry;
pub mod webhooks;

#[cfg(test)]
mod test;

use std::{fmt, sync::Arc};

use serde::de::DeserializeOwned;

use crate::auth::{AuthHandler, AuthRoute};
use crate::webhooks::{Canonicalization, WebhookHandler, WebhookRoute, WebhookSecret, sign_payload};

pub use config::Config;
pub use errors::{Error, Result};

/// Holds the webhook secret and hands out route wrappers.
///
/// Cloning is cheap; clones share the secret.
#[derive(Clone)]
pub struct Lancer {
    webhook_secret: Arc<WebhookSecret>,
    canonicalization: Canonicalization,
}

impl fmt::Debug for Lancer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lancer")
            .field("webhook_secret", &self.webhook_secret)
            .field("canonicalization", &self.canonicalization)
            .finish()
    }
}

impl Lancer {
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            webhook_secret: Arc::new(WebhookSecret::new(webhook_secret)),
            canonicalization: Canonicalization::default(),
        }
    }

    /// Build from the service configuration. A missing secret is treated as empty; config
    /// validation refuses that combination when verification is on.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.webhook_secret.clone().unwrap_or_default()).with_canonicalization(config.webhooks.canonicalization)
    }

    /// Choose which payload bytes are signed. Defaults to [`Canonicalization::RawBody`].
    pub fn with_canonicalization(mut self, canonicalization: Canonicalization) -> Self {
        self.canonicalization = canonicalization;
        self
    }

    pub fn canonicalization(&self) -> Canonicalization {
        self.canonicalization
    }

    /// Wrap a webhook handler. With `verification` on, only requests whose `x-signature`
    /// matches are passed through; with it off, every request is.
    pub fn handle_webhook<T, H>(&self, handler: H, verification: bool) -> WebhookRoute<T>
    where
        T: DeserializeOwned + Send + 'static,
        H: WebhookHandler<T>,
    {
        WebhookRoute::new(
            Arc::clone(&self.webhook_secret),
            Arc::new(handler),
            verification,
            self.canonicalization,
        )
    }

    /// Wrap a token-exchange handler into an auth gate.
    pub fn authenticate<P, H>(&self, handler: H) -> AuthRoute<P>
    where
        P: DeserializeOwned + Send + 'static,
        H: AuthHandler<P>,
    {
        AuthRoute::new(Arc::new(handler))
    }

    /// The `x-signature` value a sender must attach for this timestamp and payload.
    pub fn sign(&self, timestamp: &str, payload: &[u8]) -> String {
        sign_payload(self.webhook_secret.expose(), timestamp, payload)
    }
}
