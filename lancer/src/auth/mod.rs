//! Bearer-token auth gates.
//!
//! An auth gate turns a caller's token-exchange function into an HTTP handler. The caller
//! decides what a token is worth by returning a [`SessionAuthGrant`]; the gate only reads
//! the token, parses the payload and shapes the reply:
//!
//! - no bearer token: `403 {}` (the handler is not called)
//! - grant with an owner: `200 {"ownerId": ...}`
//! - any other grant: the grant itself, with its `status` (400 if absent)
//! - any failure along the way: `500 {"message": ...}`
//!
//! Unlike webhook routes, auth gates never let an error escape to the host.
//!
//! # Modules
//!
//! - [`grant`]: Grant records and the session request payload
//! - [`utils`]: Authorization header parsing
//!
//! # Usage
//!
//! ```no_run
//! use axum::{Router, routing::post};
//! use lancer::{Lancer, auth::{SessionAuthGrant, SessionRequest}};
//!
//! async fn exchange(token: String, _request: SessionRequest) -> anyhow::Result<SessionAuthGrant> {
//!     Ok(SessionAuthGrant::owner(format!("owner-of-{token}")))
//! }
//!
//! let lancer = Lancer::new("whsec-example");
//! let app: Router = Router::new().route("/sessions", post(lancer.authenticate(exchange)));
//! ```

pub mod grant;
pub mod utils;

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
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, error, instrument};

use crate::errors::{Error, Result};
use crate::webhooks::DEFAULT_BODY_LIMIT;

pub use grant::{DEFAULT_GRANT_STATUS, SessionAuthGrant, SessionAuthenticateOptions, SessionRequest};
pub use utils::bearer_token;

/// Exchanges a bearer token and request payload for an authorization decision.
#[async_trait]
pub trait AuthHandler<P>: Send + Sync + 'static {
    async fn authenticate(&self, token: String, payload: P) -> anyhow::Result<SessionAuthGrant>;
}

#[async_trait]
impl<P, F, Fut> AuthHandler<P> for F
where
    P: Send + 'static,
    F: Fn(String, P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<SessionAuthGrant>> + Send,
{
    async fn authenticate(&self, token: String, payload: P) -> anyhow::Result<SessionAuthGrant> {
        (self)(token, payload).await
    }
}

/// A token-exchange handler wrapped as an HTTP handler.
///
/// Created by [`crate::Lancer::authenticate`].
pub struct AuthRoute<P = SessionRequest> {
    handler: Arc<dyn AuthHandler<P>>,
    body_limit: usize,
}

impl<P> Clone for AuthRoute<P> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            body_limit: self.body_limit,
        }
    }
}

impl<P> fmt::Debug for AuthRoute<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthRoute")
            .field("body_limit", &self.body_limit)
            .finish_non_exhaustive()
    }
}

impl<P> AuthRoute<P>
where
    P: DeserializeOwned + Send + 'static,
{
    pub(crate) fn new(handler: Arc<dyn AuthHandler<P>>) -> Self {
        Self {
            handler,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Cap the number of body bytes buffered when mounted as an axum handler.
    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }

    /// Run the gate over an already-buffered request.
    pub async fn respond(&self, headers: &HeaderMap, body: Bytes) -> Response {
        self.process(headers, async move { Ok::<_, Error>(body) }).await
    }

    #[instrument(skip_all)]
    async fn process<B>(&self, headers: &HeaderMap, body: B) -> Response
    where
        B: Future<Output = Result<Bytes>>,
    {
        match self.gate(headers, body).await {
            Ok(response) => response,
            Err(err) => {
                error!("Authentication failed: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": err.to_string() }))).into_response()
            }
        }
    }

    async fn gate<B>(&self, headers: &HeaderMap, body: B) -> Result<Response>
    where
        B: Future<Output = Result<Bytes>>,
    {
        let Some(token) = bearer_token(headers)? else {
            debug!("Authentication rejected: no bearer token");
            return Ok((StatusCode::FORBIDDEN, Json(json!({}))).into_response());
        };

        let payload: P = serde_json::from_slice(&body.await?)?;
        let grant = self.handler.authenticate(token.to_string(), payload).await?;

        match grant.granted_owner() {
            Some(owner) => debug!(owner_id = owner, "Authentication granted"),
            None => debug!(status = ?grant.status, "Authentication not granted"),
        }

        grant.into_reply()
    }
}

impl<P, S> Handler<(), S> for AuthRoute<P>
where
    P: DeserializeOwned + Send + 'static,
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
            self.process(&parts.headers, body).await
        })
    }
}
