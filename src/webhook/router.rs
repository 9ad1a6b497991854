//! Event router: maps a declared event type to its handler.
//!
//! Routing is a fixed table built at compile time. Unknown event types are
//! acknowledged and ignored so providers do not retry them.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use super::meta::{INSTAGRAM_OBJECT, InstagramWebhook, WHATSAPP_OBJECT, WhatsAppWebhook};
use super::razorpay::RazorpayWebhook;
use crate::domain::{IdempotencyStore, InboundEvent};
use crate::error::GatewayError;
use crate::service::{HandlerResult, MessagingService, PaymentService};

/// Handled event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Razorpay `payment.captured`.
    PaymentCaptured,
    /// Razorpay `payment.failed`.
    PaymentFailed,
    /// Razorpay `order.paid`.
    OrderPaid,
    /// Meta `whatsapp_business_account` delivery.
    WhatsAppMessages,
    /// Meta `instagram` delivery.
    InstagramMessages,
}

const ROUTES: &[(&str, EventKind)] = &[
    ("payment.captured", EventKind::PaymentCaptured),
    ("payment.failed", EventKind::PaymentFailed),
    ("order.paid", EventKind::OrderPaid),
    (WHATSAPP_OBJECT, EventKind::WhatsAppMessages),
    (INSTAGRAM_OBJECT, EventKind::InstagramMessages),
];

impl EventKind {
    /// Looks up the handler for a declared event type.
    #[must_use]
    pub fn lookup(event_type: &str) -> Option<Self> {
        ROUTES
            .iter()
            .find(|(name, _)| *name == event_type)
            .map(|(_, kind)| *kind)
    }
}

/// Result of [`EventRouter::dispatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The event was routed; the handler reported this result.
    Handled(HandlerResult),
    /// The delivery key was already processed within the TTL.
    Duplicate,
}

/// Dispatches verified events to the payment and messaging handlers.
#[derive(Debug, Clone)]
pub struct EventRouter {
    payments: Arc<PaymentService>,
    messaging: Arc<MessagingService>,
    idempotency: Arc<IdempotencyStore>,
}

impl EventRouter {
    /// Creates a new `EventRouter`.
    #[must_use]
    pub fn new(
        payments: Arc<PaymentService>,
        messaging: Arc<MessagingService>,
        idempotency: Arc<IdempotencyStore>,
    ) -> Self {
        Self {
            payments,
            messaging,
            idempotency,
        }
    }

    /// Routes an already-verified event, honouring its delivery key.
    ///
    /// The key is claimed before the handler runs and released if the
    /// handler fails, so the provider's retry is processed. The handler runs
    /// on its own task: a caller that stops waiting (request timeout, client
    /// disconnect) does not interrupt the reply or leave the key claimed.
    ///
    /// # Errors
    ///
    /// Propagates handler errors (persistence failures), and
    /// [`GatewayError::Internal`] if the handler task panics.
    pub async fn dispatch(&self, event: &InboundEvent) -> Result<Dispatch, GatewayError> {
        let key = event.idempotency_key.clone();
        if let Some(key) = key.as_deref()
            && !self.idempotency.claim(key)
        {
            tracing::info!(event_type = %event.event_type, key, "duplicate delivery; skipping");
            return Ok(Dispatch::Duplicate);
        }

        let router = self.clone();
        let event_type = event.event_type.clone();
        let payload = event.payload.clone();
        let task_key = key.clone();
        let task = tokio::spawn(async move {
            let outcome = router.route(&event_type, &payload).await;
            if outcome.is_err()
                && let Some(key) = task_key.as_deref()
            {
                router.idempotency.release(key);
            }
            outcome
        });

        match task.await {
            Ok(outcome) => outcome.map(Dispatch::Handled),
            Err(e) => {
                if let Some(key) = key.as_deref() {
                    self.idempotency.release(key);
                }
                tracing::error!(event_type = %event.event_type, error = %e, "webhook handler task failed");
                Err(GatewayError::Internal(e.to_string()))
            }
        }
    }

    /// Invokes the handler registered for `event_type` with the parsed body.
    ///
    /// Unknown event types and payloads that do not match the expected shape
    /// are logged and reported without an error.
    ///
    /// # Errors
    ///
    /// Propagates handler errors (persistence failures).
    pub async fn route(
        &self,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<HandlerResult, GatewayError> {
        let Some(kind) = EventKind::lookup(event_type) else {
            tracing::info!(event_type, "no handler for event type; ignoring");
            return Ok(HandlerResult::ok());
        };
        tracing::debug!(event_type, ?kind, "routing webhook event");

        match kind {
            EventKind::PaymentCaptured | EventKind::PaymentFailed | EventKind::OrderPaid => {
                let webhook: RazorpayWebhook = match parse(event_type, payload) {
                    Ok(webhook) => webhook,
                    Err(result) => return Ok(result),
                };
                let payload = &webhook.payload;
                match kind {
                    EventKind::PaymentCaptured => self.payments.payment_captured(payload).await,
                    EventKind::PaymentFailed => self.payments.payment_failed(payload).await,
                    _ => self.payments.order_paid(payload).await,
                }
            }
            EventKind::WhatsAppMessages => match parse::<WhatsAppWebhook>(event_type, payload) {
                Ok(webhook) => self.messaging.handle_batch(&webhook.messages()).await,
                Err(result) => Ok(result),
            },
            EventKind::InstagramMessages => match parse::<InstagramWebhook>(event_type, payload) {
                Ok(webhook) => self.messaging.handle_batch(&webhook.messages()).await,
                Err(result) => Ok(result),
            },
        }
    }
}

fn parse<T: DeserializeOwned>(
    event_type: &str,
    payload: &serde_json::Value,
) -> Result<T, HandlerResult> {
    T::deserialize(payload).map_err(|e| {
        let err = GatewayError::MalformedPayload(e.to_string());
        tracing::warn!(event_type, error = %err, "dropping malformed webhook payload");
        HandlerResult::failed(err.to_string())
    })
}
