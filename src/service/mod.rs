//! Service layer: per-event webhook handlers.
//!
//! [`PaymentService`] applies Razorpay outcomes to orders and
//! [`MessagingService`] records inbound DMs and sends automated replies.
//! Both report a [`HandlerResult`] rather than an error for anything the
//! provider cannot fix by redelivering.

pub mod messaging_service;
pub mod payment_service;

use serde::Serialize;

pub use messaging_service::{MessagingService, MessagingSettings};
pub use payment_service::PaymentService;

/// Outcome of one handler invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerResult {
    /// `false` when the event was dropped (missing order, bad payload, ...).
    pub success: bool,
    /// Why the event was dropped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HandlerResult {
    /// A handled (or deliberately ignored) event.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    /// A dropped event.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(reason.into()),
        }
    }

    /// Combines results of a batch; the first failure wins.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        if self.success { other } else { self }
    }
}
