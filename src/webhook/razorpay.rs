//! Razorpay webhook payload shapes.
//!
//! Only the fields the payment handlers read are modelled; everything else
//! in the entity is ignored. Razorpay serializes empty `notes` as `[]`
//! rather than `{}`, so notes are kept as raw JSON and looked up by key.

use serde::Deserialize;

/// Event ID header used as the delivery de-duplication key.
pub const RAZORPAY_EVENT_ID_HEADER: &str = "x-razorpay-event-id";

/// Top-level webhook body: `{ event, payload: { payment, order } }`.
#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayWebhook {
    /// Event name, e.g. `payment.captured`.
    pub event: String,
    /// Entities attached to the event.
    #[serde(default)]
    pub payload: RazorpayPayload,
}

/// Entities carried by an event. Each is optional depending on the event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RazorpayPayload {
    /// `payload.payment.entity`.
    #[serde(default)]
    pub payment: Option<Wrapped<PaymentEntity>>,
    /// `payload.order.entity`.
    #[serde(default)]
    pub order: Option<Wrapped<OrderEntity>>,
}

/// Razorpay wraps every entity in `{ "entity": { ... } }`.
#[derive(Debug, Clone, Deserialize)]
pub struct Wrapped<T> {
    /// The wrapped entity.
    pub entity: T,
}

/// Subset of the Razorpay payment entity.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEntity {
    /// Payment ID (`pay_...`).
    pub id: String,
    /// Razorpay order ID (`order_...`).
    #[serde(default)]
    pub order_id: Option<String>,
    /// Amount in paise.
    #[serde(default)]
    pub amount: Option<i64>,
    /// Currency code.
    #[serde(default)]
    pub currency: Option<String>,
    /// Payment method.
    #[serde(default)]
    pub method: Option<String>,
    /// Merchant notes attached at checkout.
    #[serde(default)]
    pub notes: serde_json::Value,
    /// Human-readable failure description.
    #[serde(default)]
    pub error_description: Option<String>,
    /// Machine-readable failure reason.
    #[serde(default)]
    pub error_reason: Option<String>,
}

/// Subset of the Razorpay order entity.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderEntity {
    /// Razorpay order ID (`order_...`).
    pub id: String,
    /// Merchant receipt, usually the merchant order ID.
    #[serde(default)]
    pub receipt: Option<String>,
    /// Amount paid in paise.
    #[serde(default)]
    pub amount_paid: Option<i64>,
    /// Currency code.
    #[serde(default)]
    pub currency: Option<String>,
    /// Merchant notes attached at order creation.
    #[serde(default)]
    pub notes: serde_json::Value,
}

impl RazorpayPayload {
    fn payment_entity(&self) -> Option<&PaymentEntity> {
        self.payment.as_ref().map(|w| &w.entity)
    }

    fn order_entity(&self) -> Option<&OrderEntity> {
        self.order.as_ref().map(|w| &w.entity)
    }

    /// Merchant order ID for payment events: payment notes first, then the
    /// order's notes, then the order receipt.
    #[must_use]
    pub fn order_ref_from_payment(&self) -> Option<String> {
        self.payment_entity()
            .and_then(|p| note(&p.notes, "order_id"))
            .or_else(|| self.order_entity().and_then(|o| note(&o.notes, "order_id")))
            .or_else(|| self.order_entity().and_then(|o| non_blank(o.receipt.as_deref())))
    }

    /// Merchant order ID for order events: order notes, receipt, then the
    /// payment's notes.
    #[must_use]
    pub fn order_ref_from_order(&self) -> Option<String> {
        self.order_entity()
            .and_then(|o| note(&o.notes, "order_id"))
            .or_else(|| self.order_entity().and_then(|o| non_blank(o.receipt.as_deref())))
            .or_else(|| self.payment_entity().and_then(|p| note(&p.notes, "order_id")))
    }

    /// Payment ID, if a payment entity is attached.
    #[must_use]
    pub fn payment_id(&self) -> Option<String> {
        self.payment_entity().map(|p| p.id.clone())
    }

    /// Razorpay-side order ID from either entity.
    #[must_use]
    pub fn provider_order_id(&self) -> Option<String> {
        self.payment_entity()
            .and_then(|p| p.order_id.clone())
            .or_else(|| self.order_entity().map(|o| o.id.clone()))
    }

    /// Amount in minor units from either entity.
    #[must_use]
    pub fn amount(&self) -> Option<i64> {
        self.payment_entity()
            .and_then(|p| p.amount)
            .or_else(|| self.order_entity().and_then(|o| o.amount_paid))
    }

    /// Currency code from either entity.
    #[must_use]
    pub fn currency(&self) -> Option<String> {
        self.payment_entity()
            .and_then(|p| p.currency.clone())
            .or_else(|| self.order_entity().and_then(|o| o.currency.clone()))
    }

    /// Payment method, if known.
    #[must_use]
    pub fn method(&self) -> Option<String> {
        self.payment_entity().and_then(|p| p.method.clone())
    }

    /// Failure reason for `payment.failed`, defaulting to `"unknown"`.
    #[must_use]
    pub fn failure_reason(&self) -> String {
        self.payment_entity()
            .and_then(|p| {
                non_blank(p.error_description.as_deref())
                    .or_else(|| non_blank(p.error_reason.as_deref()))
            })
            .unwrap_or_else(|| "unknown".to_string())
    }
}

fn note(notes: &serde_json::Value, key: &str) -> Option<String> {
    non_blank(notes.get(key).and_then(serde_json::Value::as_str))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> RazorpayWebhook {
        let Ok(webhook) = serde_json::from_value(value) else {
            panic!("payload should parse");
        };
        webhook
    }

    #[test]
    fn order_ref_prefers_payment_notes() {
        let webhook = parse(json!({
            "event": "payment.captured",
            "payload": {
                "payment": { "entity": {
                    "id": "pay_1", "order_id": "order_1", "amount": 49900,
                    "currency": "INR", "notes": { "order_id": "ORD-1" }
                }},
                "order": { "entity": { "id": "order_1", "receipt": "ORD-OTHER", "notes": [] } }
            }
        }));
        assert_eq!(webhook.payload.order_ref_from_payment().as_deref(), Some("ORD-1"));
        assert_eq!(webhook.payload.order_ref_from_order().as_deref(), Some("ORD-OTHER"));
        assert_eq!(webhook.payload.provider_order_id().as_deref(), Some("order_1"));
        assert_eq!(webhook.payload.amount(), Some(49_900));
    }

    #[test]
    fn empty_notes_array_is_tolerated() {
        let webhook = parse(json!({
            "event": "payment.captured",
            "payload": { "payment": { "entity": { "id": "pay_1", "notes": [] } } }
        }));
        assert!(webhook.payload.order_ref_from_payment().is_none());
        assert_eq!(webhook.payload.payment_id().as_deref(), Some("pay_1"));
    }

    #[test]
    fn failure_reason_falls_back() {
        let described = parse(json!({
            "event": "payment.failed",
            "payload": { "payment": { "entity": {
                "id": "pay_2", "error_description": "Card declined", "error_reason": "card_declined"
            }}}
        }));
        assert_eq!(described.payload.failure_reason(), "Card declined");

        let coded = parse(json!({
            "event": "payment.failed",
            "payload": { "payment": { "entity": { "id": "pay_3", "error_reason": "payment_timeout" } } }
        }));
        assert_eq!(coded.payload.failure_reason(), "payment_timeout");

        let bare = parse(json!({ "event": "payment.failed" }));
        assert_eq!(bare.payload.failure_reason(), "unknown");
    }
}
