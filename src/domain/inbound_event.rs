//! Transient representation of one webhook delivery.

use axum::body::Bytes;

use crate::webhook::signature::{self, SignatureScheme};

/// A webhook request as received, alive only for the request lifetime.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    /// Declared event type (`event` for Razorpay, `object` for Meta).
    pub event_type: String,
    /// Parsed request body.
    pub payload: serde_json::Value,
    /// Signature header exactly as sent by the provider.
    pub signature_header: Option<String>,
    /// Raw request body; signatures are computed over these bytes.
    pub raw_body: Bytes,
    /// Provider delivery ID used for de-duplication.
    pub idempotency_key: Option<String>,
}

impl InboundEvent {
    /// Returns `true` if the signature header matches `secret` under `scheme`.
    #[must_use]
    pub fn is_authentic(&self, scheme: SignatureScheme, secret: Option<&str>) -> bool {
        signature::verify_with(scheme, &self.raw_body, self.signature_header.as_deref(), secret)
    }
}
