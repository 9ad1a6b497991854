//! Orders and their payment state machine.
//!
//! The only lifecycle handled here is `pending -> {paid, failed}`. Both
//! outcomes are terminal for this service: [`Order::settle`] refuses to move
//! an order that has already left `pending`, so a late `payment.failed`
//! can never undo a capture.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::GatewayError;

/// Payment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Awaiting a payment webhook.
    Pending,
    /// Payment captured.
    Paid,
    /// Payment failed.
    Failed,
}

/// Fulfilment state of an order, moved in lockstep with [`PaymentStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created, not yet paid.
    Pending,
    /// Paid and confirmed.
    Confirmed,
    /// Cancelled after a failed payment.
    Cancelled,
}

str_enum!(PaymentStatus { Pending => "pending", Paid => "paid", Failed => "failed" });
str_enum!(OrderStatus { Pending => "pending", Confirmed => "confirmed", Cancelled => "cancelled" });

/// Result of a payment attempt as reported by the payment provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Funds were captured.
    Captured {
        /// Provider payment ID (e.g. `pay_29QQoUBi66xm2f`), absent on
        /// `order.paid` deliveries without a payment entity.
        payment_id: Option<String>,
        /// Provider-side order ID, when present.
        provider_order_id: Option<String>,
    },
    /// The payment attempt failed.
    Failed {
        /// Provider payment ID, when present.
        payment_id: Option<String>,
        /// Human-readable failure reason.
        reason: String,
    },
}

impl PaymentOutcome {
    /// Payment status an order holds after this outcome.
    #[must_use]
    pub const fn settled_status(&self) -> PaymentStatus {
        match self {
            Self::Captured { .. } => PaymentStatus::Paid,
            Self::Failed { .. } => PaymentStatus::Failed,
        }
    }

    /// Provider payment ID, when known.
    #[must_use]
    pub fn payment_id(&self) -> Option<&str> {
        match self {
            Self::Captured { payment_id, .. } | Self::Failed { payment_id, .. } => {
                payment_id.as_deref()
            }
        }
    }
}

/// A customer order owned by a tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    /// Merchant order identifier (e.g. `ORD-1`).
    pub id: String,
    /// Owning tenant.
    pub user_id: String,
    /// Buyer, when known.
    #[serde(default)]
    pub customer_id: Option<uuid::Uuid>,
    /// Order total in minor currency units.
    pub amount: i64,
    /// ISO-4217 currency code.
    pub currency: String,
    /// Payment state.
    pub payment_status: PaymentStatus,
    /// Fulfilment state.
    pub status: OrderStatus,
    /// Free-form attributes recorded by payment handlers.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a pending order.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        amount: i64,
        currency: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            user_id: user_id.into(),
            customer_id: None,
            amount,
            currency: currency.into(),
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Pending,
            metadata: serde_json::Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` while the order still awaits a payment outcome.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.payment_status == PaymentStatus::Pending
    }

    /// Returns `true` if this order was settled by `outcome`: same terminal
    /// status and same provider payment ID.
    #[must_use]
    pub fn is_settled_by(&self, outcome: &PaymentOutcome) -> bool {
        let recorded = self
            .metadata
            .get("razorpay_payment_id")
            .and_then(serde_json::Value::as_str);
        self.payment_status == outcome.settled_status() && recorded == outcome.payment_id()
    }

    /// Applies a payment outcome to a pending order.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Conflict`] if the order is already paid or
    /// failed; the order is left unchanged.
    pub fn settle(&mut self, outcome: &PaymentOutcome, at: DateTime<Utc>) -> Result<(), GatewayError> {
        if !self.is_pending() {
            return Err(GatewayError::Conflict(format!(
                "order {} is already {}",
                self.id, self.payment_status
            )));
        }

        let stamp = serde_json::Value::String(at.to_rfc3339());
        match outcome {
            PaymentOutcome::Captured {
                payment_id,
                provider_order_id,
            } => {
                self.payment_status = PaymentStatus::Paid;
                self.status = OrderStatus::Confirmed;
                if let Some(payment_id) = payment_id {
                    self.metadata
                        .insert("razorpay_payment_id".into(), payment_id.clone().into());
                }
                if let Some(provider_order_id) = provider_order_id {
                    self.metadata
                        .insert("razorpay_order_id".into(), provider_order_id.clone().into());
                }
                self.metadata.insert("paid_at".into(), stamp);
            }
            PaymentOutcome::Failed { payment_id, reason } => {
                self.payment_status = PaymentStatus::Failed;
                self.status = OrderStatus::Cancelled;
                if let Some(payment_id) = payment_id {
                    self.metadata
                        .insert("razorpay_payment_id".into(), payment_id.clone().into());
                }
                self.metadata
                    .insert("failure_reason".into(), reason.clone().into());
                self.metadata.insert("failed_at".into(), stamp);
            }
        }
        self.updated_at = at;
        Ok(())
    }
}
