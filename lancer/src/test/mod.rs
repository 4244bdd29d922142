//! End-to-end tests: routes mounted on real axum routers and driven over HTTP.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::AUTHORIZATION},
    routing::post,
};
use bytes::Bytes;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::auth::{SessionAuthGrant, SessionRequest};
use crate::config::WebhookConfig;
use crate::test_utils::{
    RecordingHandler, StaticGrantHandler, TEST_SECRET, create_test_config, create_test_server, signed_headers,
};
use crate::webhooks::{Canonicalization, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::Lancer;

/// Signed delivery through the receiver router, exactly as a sender would make it
#[test_log::test(tokio::test)]
async fn test_receiver_accepts_signed_webhook() {
    let server = create_test_server(&create_test_config());
    let body = r#"{"type":"session.completed","id":"s_1"}"#;
    let signature = Lancer::new(TEST_SECRET).sign("1700000000", body.as_bytes());

    let response = server
        .post("/webhooks")
        .add_header(TIMESTAMP_HEADER, "1700000000")
        .add_header(SIGNATURE_HEADER, signature.as_str())
        .content_type("application/json")
        .bytes(Bytes::from(body))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({"received": true}));
}

#[test_log::test(tokio::test)]
async fn test_receiver_rejects_unsigned_webhook() {
    let server = create_test_server(&create_test_config());

    let response = server.post("/webhooks").json(&json!({"type": "ping"})).await;

    response.assert_status(StatusCode::FORBIDDEN);
    response.assert_json(&json!({"message": "access restricted"}));
}

#[tokio::test]
async fn test_receiver_rejects_forged_signature() {
    let server = create_test_server(&create_test_config());
    let body = r#"{"type":"ping"}"#;
    let headers = signed_headers("attacker-secret", "1700000000", body.as_bytes());

    let response = server
        .post("/webhooks")
        .add_header(TIMESTAMP_HEADER, headers[TIMESTAMP_HEADER].to_str().unwrap())
        .add_header(SIGNATURE_HEADER, headers[SIGNATURE_HEADER].to_str().unwrap())
        .bytes(Bytes::from(body))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    response.assert_json(&json!({"message": "access restricted"}));
}

#[tokio::test]
async fn test_receiver_without_verification() {
    let mut config = create_test_config();
    config.webhook_secret = None;
    config.webhooks = WebhookConfig {
        path: "/hooks".to_string(),
        verification: false,
        ..Default::default()
    };
    let server = create_test_server(&config);

    let response = server.post("/hooks").json(&json!({"type": "ping"})).await;
    response.assert_status_ok();
    response.assert_json(&json!({"received": true}));
}

#[tokio::test]
async fn test_receiver_malformed_body_is_bad_request() {
    let mut config = create_test_config();
    config.webhooks.verification = false;
    let server = create_test_server(&config);

    let response = server.post("/webhooks").text("{\"type\":").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_receiver_reserialized_scheme() {
    let mut config = create_test_config();
    config.webhooks.canonicalization = Canonicalization::Reserialized;
    let server = create_test_server(&config);

    // Sender signed the compact form; the wire carries a pretty-printed body
    let headers = signed_headers(TEST_SECRET, "42", br#"{"type":"ping","n":1}"#);
    let response = server
        .post("/webhooks")
        .add_header(TIMESTAMP_HEADER, "42")
        .add_header(SIGNATURE_HEADER, headers[SIGNATURE_HEADER].to_str().unwrap())
        .text("{ \"type\": \"ping\", \"n\": 1 }")
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_healthz() {
    let server = create_test_server(&create_test_config());
    let response = server.get("/healthz").await;
    response.assert_status_ok();
    response.assert_text("OK");
}

#[tokio::test]
async fn test_oversized_body_is_rejected_before_handler() {
    let handler = RecordingHandler::default();
    let route = Lancer::new(TEST_SECRET).handle_webhook(handler.clone(), false).with_body_limit(8);
    let app = Router::new().route("/webhooks", post(route));

    let request = Request::post("/webhooks")
        .body(Body::from(r#"{"type":"much-too-long"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(handler.events().is_empty());
}

#[tokio::test]
async fn test_configured_body_limit_applies_to_receiver() {
    let mut config = create_test_config();
    config.webhooks.verification = false;
    config.webhooks.body_limit = 16;
    let server = create_test_server(&config);

    let response = server.post("/webhooks").text(r#"{"type":"much-too-long"}"#).await;
    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);

    let response = server.post("/webhooks").text(r#"{"type":"ok"}"#).await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_missing_headers_short_circuit_before_body_is_read() {
    let handler = RecordingHandler::default();
    let route = Lancer::new(TEST_SECRET).handle_webhook(handler.clone(), true).with_body_limit(8);
    let app = Router::new().route("/webhooks", post(route));

    // The body exceeds the limit, but the missing headers decide the response first
    let request = Request::post("/webhooks")
        .body(Body::from(r#"{"type":"much-too-long"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(handler.events().is_empty());
}

fn auth_server(handler: StaticGrantHandler) -> axum_test::TestServer {
    let route = Lancer::new(TEST_SECRET).authenticate(handler);
    axum_test::TestServer::new(Router::new().route("/sessions", post(route))).unwrap()
}

#[test_log::test(tokio::test)]
async fn test_auth_gate_grants_owner() {
    let handler = StaticGrantHandler::returning(SessionAuthGrant {
        status: Some(200),
        owner_id: Some("u1".to_string()),
        message: None,
    });
    let server = auth_server(handler.clone());

    let response = server
        .post("/sessions")
        .add_header(AUTHORIZATION, "Bearer tok_abc")
        .json(&json!({"accepts": ["image/*"], "maxSize": 1024, "album": "summer"}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body, json!({"ownerId": "u1"}));

    let calls = handler.calls();
    assert_eq!(calls.len(), 1);
    let (token, request): &(String, SessionRequest) = &calls[0];
    assert_eq!(token, "tok_abc");
    assert!(request.options.admits("image/png", 512));
    assert_eq!(request.metadata.get("album"), Some(&json!("summer")));
}

#[tokio::test]
async fn test_auth_gate_echoes_refusal() {
    let handler = StaticGrantHandler::returning(SessionAuthGrant::denied(StatusCode::NOT_FOUND, "not found"));
    let server = auth_server(handler);

    let response = server
        .post("/sessions")
        .add_header(AUTHORIZATION, "Bearer tok_abc")
        .json(&json!({}))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    response.assert_json(&json!({"status": 404, "message": "not found"}));
}

#[tokio::test]
async fn test_auth_gate_without_token() {
    let handler = StaticGrantHandler::returning(SessionAuthGrant::owner("u1"));
    let server = auth_server(handler.clone());

    let response = server.post("/sessions").json(&json!({})).await;

    response.assert_status(StatusCode::FORBIDDEN);
    response.assert_json(&json!({}));
    assert!(handler.calls().is_empty());
}

#[tokio::test]
async fn test_auth_gate_oversized_body_is_caught() {
    let handler = StaticGrantHandler::returning(SessionAuthGrant::owner("u1"));
    let route = Lancer::new(TEST_SECRET).authenticate(handler.clone()).with_body_limit(4);
    let server = axum_test::TestServer::new(Router::new().route("/sessions", post(route))).unwrap();

    let response = server
        .post("/sessions")
        .add_header(AUTHORIZATION, "Bearer tok_abc")
        .json(&json!({"album": "summer"}))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    response.assert_json(&json!({"message": "Request body exceeds the 4 byte limit"}));
    assert!(handler.calls().is_empty());
}

#[tokio::test]
async fn test_auth_gate_handler_failure() {
    let route = Lancer::new(TEST_SECRET).authenticate(|_token: String, _request: SessionRequest| async {
        Err::<SessionAuthGrant, _>(anyhow::anyhow!("boom"))
    });
    let server = axum_test::TestServer::new(Router::new().route("/sessions", post(route))).unwrap();

    let response = server
        .post("/sessions")
        .add_header(AUTHORIZATION, "Bearer tok_abc")
        .json(&json!({}))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    response.assert_json(&json!({"message": "boom"}));
}
