//! The verified webhook receiver served by the `lancer` binary.
//!
//! - `POST {webhooks.path}`: webhook route; accepted events are logged and acknowledged
//! - `GET /healthz`: liveness probe

use std::future::Future;

use anyhow::Context;
use axum::{
    Json, Router,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{Config, Lancer, webhooks::WebhookEvent};

/// Build the receiver routes from configuration.
pub fn router(config: &Config) -> Router {
    let lancer = Lancer::from_config(config);
    let webhooks = lancer
        .handle_webhook(acknowledge, config.webhooks.verification)
        .with_body_limit(config.webhooks.body_limit);

    Router::new()
        .route(&config.webhooks.path, post(webhooks))
        .route("/healthz", get(|| async { "OK" }))
        .layer(TraceLayer::new_for_http())
}

async fn acknowledge(event: WebhookEvent) -> anyhow::Result<Response> {
    info!(
        event_type = event.kind().unwrap_or("unknown"),
        keys = event.data.len(),
        "Webhook received"
    );
    Ok(Json(json!({ "received": true })).into_response())
}

/// Bind and serve until `shutdown` resolves.
pub async fn serve<F>(config: Config, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind_address = config.bind_address();
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {bind_address}"))?;

    info!(
        "Lancer listening on http://{}{} (verification {})",
        listener.local_addr()?,
        config.webhooks.path,
        if config.webhooks.verification { "on" } else { "off" }
    );

    axum::serve(listener, router(&config))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")
}
