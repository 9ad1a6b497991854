//! Provider webhook endpoints: Razorpay payments, WhatsApp and Instagram.
//!
//! Every POST verifies the HMAC signature over the raw body before the body
//! is parsed. Anything after verification that the provider cannot fix by
//! redelivering is acknowledged with 200.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use secrecy::{ExposeSecret, SecretString};

use crate::api::dto::{VerifyQuery, WebhookAck};
use crate::app_state::AppState;
use crate::domain::InboundEvent;
use crate::error::{ErrorResponse, GatewayError};
use crate::webhook::Dispatch;
use crate::webhook::meta::{INSTAGRAM_OBJECT, WHATSAPP_OBJECT};
use crate::webhook::razorpay::RAZORPAY_EVENT_ID_HEADER;
use crate::webhook::signature::SignatureScheme;

/// `POST /api/webhook/razorpay`: Razorpay payment events.
///
/// # Errors
///
/// Returns [`GatewayError::Unauthorized`] on a bad signature and a 5xx
/// error if the handler fails.
#[utoipa::path(
    post,
    path = "/api/webhook/razorpay",
    tag = "Webhooks",
    summary = "Receive Razorpay payment events",
    description = "Verifies `X-Razorpay-Signature` over the raw body, then applies `payment.captured`, `payment.failed` or `order.paid` to the referenced order. Deliveries are de-duplicated on `X-Razorpay-Event-Id`.",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Delivery accepted", body = WebhookAck),
        (status = 401, description = "Missing or invalid signature", body = ErrorResponse),
        (status = 500, description = "Handler failed; provider should retry", body = ErrorResponse),
    )
)]
pub async fn razorpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, GatewayError> {
    let key = header_value(&headers, RAZORPAY_EVENT_ID_HEADER).map(|id| format!("razorpay:{id}"));
    ingest(
        &state,
        &RAZORPAY,
        state.config.razorpay_webhook_secret.as_ref(),
        &headers,
        body,
        key,
    )
    .await
}

/// `GET /api/webhook/whatsapp`: WhatsApp subscription handshake.
///
/// # Errors
///
/// Returns [`GatewayError::VerificationFailed`] if the token does not match.
#[utoipa::path(
    get,
    path = "/api/webhook/whatsapp",
    tag = "Webhooks",
    summary = "Verify the WhatsApp webhook subscription",
    params(VerifyQuery),
    responses(
        (status = 200, description = "Challenge echoed back", body = String),
        (status = 403, description = "Verify token mismatch", body = ErrorResponse),
    )
)]
pub async fn whatsapp_verify(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<(StatusCode, String), GatewayError> {
    verify_subscription(&query, state.config.whatsapp_verify_token.as_ref())
}

/// `POST /api/webhook/whatsapp`: WhatsApp Business message deliveries.
///
/// # Errors
///
/// Returns [`GatewayError::Unauthorized`] on a bad signature and a 5xx
/// error if the handler fails.
#[utoipa::path(
    post,
    path = "/api/webhook/whatsapp",
    tag = "Webhooks",
    summary = "Receive WhatsApp messages",
    description = "Verifies `X-Hub-Signature-256`, records each text message and replies when automation is enabled for the owning tenant.",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Delivery accepted", body = WebhookAck),
        (status = 401, description = "Missing or invalid signature", body = ErrorResponse),
        (status = 500, description = "Handler failed; provider should retry", body = ErrorResponse),
    )
)]
pub async fn whatsapp_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, GatewayError> {
    meta_ingest(&state, &WHATSAPP, &headers, body).await
}

/// `GET /api/meta/webhook`: Instagram subscription handshake.
///
/// # Errors
///
/// Returns [`GatewayError::VerificationFailed`] if the token does not match.
#[utoipa::path(
    get,
    path = "/api/meta/webhook",
    tag = "Webhooks",
    summary = "Verify the Instagram webhook subscription",
    params(VerifyQuery),
    responses(
        (status = 200, description = "Challenge echoed back", body = String),
        (status = 403, description = "Verify token mismatch", body = ErrorResponse),
    )
)]
pub async fn instagram_verify(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<(StatusCode, String), GatewayError> {
    verify_subscription(&query, state.config.instagram_verify_token.as_ref())
}

/// `POST /api/meta/webhook`: Instagram DM deliveries.
///
/// # Errors
///
/// Returns [`GatewayError::Unauthorized`] on a bad signature and a 5xx
/// error if the handler fails.
#[utoipa::path(
    post,
    path = "/api/meta/webhook",
    tag = "Webhooks",
    summary = "Receive Instagram messages",
    description = "Verifies `X-Hub-Signature-256`, records each direct message and replies when automation is enabled for the owning tenant.",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Delivery accepted", body = WebhookAck),
        (status = 401, description = "Missing or invalid signature", body = ErrorResponse),
        (status = 500, description = "Handler failed; provider should retry", body = ErrorResponse),
    )
)]
pub async fn instagram_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, GatewayError> {
    meta_ingest(&state, &INSTAGRAM, &headers, body).await
}

/// How one webhook route authenticates and classifies its deliveries.
#[derive(Debug)]
struct Endpoint {
    scheme: SignatureScheme,
    /// Body field naming the event type.
    type_field: &'static str,
    /// Only this event type is accepted on the route.
    pinned_type: Option<&'static str>,
}

const RAZORPAY: Endpoint = Endpoint {
    scheme: SignatureScheme::Razorpay,
    type_field: "event",
    pinned_type: None,
};

const WHATSAPP: Endpoint = Endpoint {
    scheme: SignatureScheme::Meta,
    type_field: "object",
    pinned_type: Some(WHATSAPP_OBJECT),
};

const INSTAGRAM: Endpoint = Endpoint {
    scheme: SignatureScheme::Meta,
    type_field: "object",
    pinned_type: Some(INSTAGRAM_OBJECT),
};

async fn meta_ingest(
    state: &AppState,
    endpoint: &Endpoint,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, GatewayError> {
    // Meta has no delivery ID header; messages are de-duplicated by ID.
    ingest(
        state,
        endpoint,
        state.config.meta_app_secret.as_ref(),
        headers,
        body,
        None,
    )
    .await
}

/// Verify, parse, dispatch.
async fn ingest(
    state: &AppState,
    endpoint: &Endpoint,
    secret: Option<&SecretString>,
    headers: &HeaderMap,
    raw_body: Bytes,
    idempotency_key: Option<String>,
) -> Result<Json<WebhookAck>, GatewayError> {
    let scheme = endpoint.scheme;
    let signature_header = header_value(headers, scheme.header()).map(str::to_string);

    let (payload, parse_error) = match serde_json::from_slice::<serde_json::Value>(&raw_body) {
        Ok(payload) => (payload, None),
        Err(e) => (serde_json::Value::Null, Some(e)),
    };
    let event = InboundEvent {
        event_type: payload
            .get(endpoint.type_field)
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string(),
        payload,
        signature_header,
        raw_body,
        idempotency_key,
    };

    if !event.is_authentic(scheme, secret.map(|s| s.expose_secret())) {
        tracing::warn!(?scheme, "webhook signature rejected");
        return Err(GatewayError::Unauthorized);
    }

    if let Some(e) = parse_error {
        let err = GatewayError::MalformedPayload(e.to_string());
        tracing::warn!(?scheme, error = %err, "dropping unparseable webhook body");
        return Ok(Json(WebhookAck::success()));
    }

    if let Some(pinned) = endpoint.pinned_type
        && event.event_type != pinned
    {
        tracing::warn!(
            expected = pinned,
            received = %event.event_type,
            "webhook object does not belong to this endpoint; dropping"
        );
        return Ok(Json(WebhookAck::success()));
    }

    match state.router.dispatch(&event).await {
        Ok(Dispatch::Duplicate) => Ok(Json(WebhookAck::duplicate())),
        Ok(Dispatch::Handled(result)) => {
            if let Some(error) = result.error.as_deref() {
                tracing::warn!(event_type = %event.event_type, error, "webhook event dropped");
            }
            Ok(Json(WebhookAck::success()))
        }
        Err(e) if e.status_code().is_server_error() => Err(e),
        Err(e) => Err(GatewayError::Internal(e.to_string())),
    }
}

fn verify_subscription(
    query: &VerifyQuery,
    expected: Option<&SecretString>,
) -> Result<(StatusCode, String), GatewayError> {
    let subscribed = query.mode.as_deref() == Some("subscribe");
    let token_matches = match (query.verify_token.as_deref(), expected) {
        (Some(given), Some(expected)) => !given.is_empty() && given == expected.expose_secret(),
        _ => false,
    };
    if !(subscribed && token_matches) {
        tracing::warn!(mode = ?query.mode, "webhook subscription verification failed");
        return Err(GatewayError::VerificationFailed);
    }
    tracing::info!("webhook subscription verified");
    Ok((StatusCode::OK, query.challenge.clone().unwrap_or_default()))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Webhook routes, mounted at the root.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/webhook/razorpay", axum::routing::post(razorpay_webhook))
        .route(
            "/api/webhook/whatsapp",
            get(whatsapp_verify).post(whatsapp_webhook),
        )
        .route(
            "/api/meta/webhook",
            get(instagram_verify).post(instagram_webhook),
        )
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use axum::response::Response;
    use serde_json::json;
    use tower::ServiceExt;
    use tower_http::timeout::TimeoutLayer;

    use super::*;
    use crate::api::build_router;
    use crate::clients::{OutboundSender, ReplyContext, ReplyGenerator};
    use crate::config::GatewayConfig;
    use crate::domain::{Order, PaymentStatus};
    use crate::persistence::{InMemoryStore, Store};
    use crate::service::messaging_service::tests::{CannedReplies, RecordingSender};
    use crate::webhook::signature::sign;

    const RZP_SECRET: &str = "rzp-secret";
    const META_SECRET: &str = "meta-secret";

    fn config(extra: &[(&str, &str)]) -> GatewayConfig {
        let Ok(config) = GatewayConfig::from_lookup(|key| {
            let base = match key {
                "RAZORPAY_WEBHOOK_SECRET" => Some(RZP_SECRET),
                "META_APP_SECRET" => Some(META_SECRET),
                "WHATSAPP_VERIFY_TOKEN" => Some("wa-verify"),
                "INSTAGRAM_VERIFY_TOKEN" => Some("ig-verify"),
                _ => None,
            };
            extra
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| *value)
                .or(base)
                .map(str::to_string)
        }) else {
            panic!("config should load");
        };
        config
    }

    fn app(store: &Arc<InMemoryStore>) -> Router {
        let state = AppState::with_collaborators(
            config(&[]),
            Arc::clone(store) as Arc<dyn Store>,
            Arc::new(CannedReplies::answering("hi")) as Arc<dyn ReplyGenerator>,
            Arc::new(RecordingSender::default()) as Arc<dyn OutboundSender>,
        );
        build_router().with_state(state)
    }

    /// Model that stalls past the request deadline, then fails.
    #[derive(Debug)]
    struct StalledModel;

    #[async_trait]
    impl ReplyGenerator for StalledModel {
        async fn draft_reply(&self, _context: &ReplyContext<'_>) -> Result<String, GatewayError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Err(GatewayError::Downstream("model timed out".to_string()))
        }
    }

    fn instagram_dm(mid: &str) -> String {
        json!({
            "object": "instagram",
            "entry": [{ "id": "ig-biz", "messaging": [{
                "sender": { "id": "ig-user" }, "recipient": { "id": "ig-biz" },
                "message": { "mid": mid, "text": "price?" }
            }]}]
        })
        .to_string()
    }

    fn meta_signature(body: &str) -> String {
        format!("sha256={}", sign(body.as_bytes(), META_SECRET))
    }

    async fn call(app: Router, request: Request<Body>) -> Response {
        let Ok(response) = app.oneshot(request).await else {
            panic!("router is infallible");
        };
        response
    }

    async fn body_text(response: Response) -> String {
        let Ok(bytes) = to_bytes(response.into_body(), 64 * 1024).await else {
            panic!("body should be readable");
        };
        String::from_utf8_lossy(&bytes).into_owned()
    }

    fn post(uri: &str, body: &str, headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::post(uri).header("content-type", "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let Ok(request) = builder.body(Body::from(body.to_string())) else {
            panic!("request should build");
        };
        request
    }

    fn get(uri: &str) -> Request<Body> {
        let Ok(request) = Request::get(uri).body(Body::empty()) else {
            panic!("request should build");
        };
        request
    }

    fn captured_body(order_id: &str) -> String {
        json!({
            "event": "payment.captured",
            "payload": { "payment": { "entity": {
                "id": "pay_77", "amount": 49900, "currency": "INR", "notes": { "order_id": order_id }
            }}}
        })
        .to_string()
    }

    async fn seeded_store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        let _ = store
            .insert_order(&Order::new("ORD-1", "default", 49_900, "INR"))
            .await;
        store
    }

    async fn payment_status(store: &InMemoryStore) -> PaymentStatus {
        let Ok(Some(order)) = store.get_order("ORD-1").await else {
            panic!("order should exist");
        };
        order.payment_status
    }

    #[tokio::test]
    async fn signed_razorpay_capture_settles_order() {
        let store = seeded_store().await;
        let body = captured_body("ORD-1");
        let signature = sign(body.as_bytes(), RZP_SECRET);

        let response = call(
            app(&store),
            post("/api/webhook/razorpay", &body, &[("x-razorpay-signature", signature.as_str())]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("success"));
        assert_eq!(payment_status(&store).await, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn tampered_razorpay_body_is_rejected() {
        let store = seeded_store().await;
        let signature = sign(captured_body("ORD-1").as_bytes(), RZP_SECRET);
        let tampered = captured_body("ORD-1").replace("49900", "100");

        let response = call(
            app(&store),
            post("/api/webhook/razorpay", &tampered, &[("x-razorpay-signature", signature.as_str())]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(payment_status(&store).await, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn missing_signature_is_rejected() {
        let store = seeded_store().await;
        let response = call(
            app(&store),
            post("/api/webhook/razorpay", &captured_body("ORD-1"), &[]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn redelivered_event_id_is_acknowledged_as_duplicate() {
        let store = seeded_store().await;
        let app = app(&store);
        let body = captured_body("ORD-1");
        let signature = sign(body.as_bytes(), RZP_SECRET);
        let headers = [
            ("x-razorpay-signature", signature.as_str()),
            ("x-razorpay-event-id", "evt_1"),
        ];

        let first = call(app.clone(), post("/api/webhook/razorpay", &body, &headers)).await;
        assert_eq!(first.status(), StatusCode::OK);
        let second = call(app, post("/api/webhook/razorpay", &body, &headers)).await;
        assert_eq!(second.status(), StatusCode::OK);
        assert!(body_text(second).await.contains("duplicate"));
    }

    #[tokio::test]
    async fn unknown_order_is_acknowledged() {
        let store = seeded_store().await;
        let body = captured_body("ORD-404");
        let signature = sign(body.as_bytes(), RZP_SECRET);
        let response = call(
            app(&store),
            post("/api/webhook/razorpay", &body, &[("x-razorpay-signature", signature.as_str())]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(payment_status(&store).await, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn signed_but_unparseable_body_is_acknowledged() {
        let store = seeded_store().await;
        let body = "{not json";
        let signature = sign(body.as_bytes(), RZP_SECRET);
        let response = call(
            app(&store),
            post("/api/webhook/razorpay", body, &[("x-razorpay-signature", signature.as_str())]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn whatsapp_handshake_echoes_challenge() {
        let store = Arc::new(InMemoryStore::new());
        let response = call(
            app(&store),
            get("/api/webhook/whatsapp?hub.mode=subscribe&hub.verify_token=wa-verify&hub.challenge=12345"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "12345");
    }

    #[tokio::test]
    async fn handshake_with_wrong_token_is_forbidden() {
        let store = Arc::new(InMemoryStore::new());
        let response = call(
            app(&store),
            get("/api/meta/webhook?hub.mode=subscribe&hub.verify_token=wa-verify&hub.challenge=1"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn signed_whatsapp_message_is_recorded() {
        let store = Arc::new(InMemoryStore::new());
        let body = json!({
            "object": "whatsapp_business_account",
            "entry": [{ "id": "waba", "changes": [{ "field": "messages", "value": {
                "messaging_product": "whatsapp",
                "metadata": { "phone_number_id": "PN1" },
                "contacts": [{ "wa_id": "919900", "profile": { "name": "Asha" } }],
                "messages": [{ "from": "919900", "id": "wamid.1", "type": "text", "text": { "body": "hi" } }]
            }}]}]
        })
        .to_string();
        let signature = format!("sha256={}", sign(body.as_bytes(), META_SECRET));

        let response = call(
            app(&store),
            post("/api/webhook/whatsapp", &body, &[("x-hub-signature-256", signature.as_str())]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(store.message_count().await, 1);
    }

    #[tokio::test]
    async fn instagram_object_on_whatsapp_route_is_not_dispatched() {
        let store = Arc::new(InMemoryStore::new());
        let body = instagram_dm("mid.cross");
        let signature = meta_signature(&body);
        let response = call(
            app(&store),
            post("/api/webhook/whatsapp", &body, &[("x-hub-signature-256", signature.as_str())]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(store.message_count().await, 0);
    }

    #[tokio::test]
    async fn timed_out_request_still_sends_fallback_once() {
        let store = Arc::new(InMemoryStore::new());
        let sender = Arc::new(RecordingSender::default());
        let state = AppState::with_collaborators(
            config(&[("AUTOMATION_DEFAULT_ENABLED", "true")]),
            Arc::clone(&store) as Arc<dyn Store>,
            Arc::new(StalledModel) as Arc<dyn ReplyGenerator>,
            Arc::clone(&sender) as Arc<dyn OutboundSender>,
        );
        let app = build_router()
            .layer(TimeoutLayer::new(Duration::from_millis(50)))
            .with_state(state);
        let body = instagram_dm("mid.slow");
        let signature = meta_signature(&body);
        let headers = [("x-hub-signature-256", signature.as_str())];

        let response = call(app.clone(), post("/api/meta/webhook", &body, &headers)).await;
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

        for _ in 0..100 {
            if !sender.sent().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(sender.sent().len(), 1);
        assert_eq!(store.message_count().await, 2);

        let redelivery = call(app, post("/api/meta/webhook", &body, &headers)).await;
        assert_eq!(redelivery.status(), StatusCode::OK);
        assert_eq!(sender.sent().len(), 1);
        assert_eq!(store.message_count().await, 2);
    }

    #[tokio::test]
    async fn instagram_post_without_prefix_is_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let body = json!({ "object": "instagram", "entry": [] }).to_string();
        let bare = sign(body.as_bytes(), META_SECRET);
        let response = call(
            app(&store),
            post("/api/meta/webhook", &body, &[("x-hub-signature-256", bare.as_str())]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn orders_api_creates_and_fetches() {
        let store = Arc::new(InMemoryStore::new());
        let app = app(&store);
        let created = call(
            app.clone(),
            post("/api/v1/orders", r#"{"id":"ORD-9","amount":1500,"currency":"inr"}"#, &[]),
        )
        .await;
        assert_eq!(created.status(), StatusCode::CREATED);

        let fetched = call(app.clone(), get("/api/v1/orders/ORD-9")).await;
        assert_eq!(fetched.status(), StatusCode::OK);
        let text = body_text(fetched).await;
        assert!(text.contains("\"currency\":\"INR\""));
        assert!(text.contains("\"payment_status\":\"pending\""));

        let missing = call(app, get("/api/v1/orders/ORD-10")).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_is_ok() {
        let store = Arc::new(InMemoryStore::new());
        let response = call(app(&store), get("/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
