//! Payment attempts recorded from provider webhooks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Final state of a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentRecordStatus {
    /// Funds captured.
    Captured,
    /// Attempt failed.
    Failed,
}

str_enum!(PaymentRecordStatus { Captured => "captured", Failed => "failed" });

/// Row in the `payments` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    /// Provider payment ID.
    pub id: String,
    /// Merchant order the payment belongs to.
    pub order_id: String,
    /// Amount in minor currency units.
    pub amount: i64,
    /// ISO-4217 currency code.
    pub currency: String,
    /// Captured or failed.
    pub status: PaymentRecordStatus,
    /// Payment method (`upi`, `card`, ...).
    #[serde(default)]
    pub method: Option<String>,
    /// Failure reason for failed attempts.
    #[serde(default)]
    pub failure_reason: Option<String>,
    /// Time the webhook was processed.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_names_match_storage_column() {
        assert_eq!("captured".parse::<PaymentRecordStatus>(), Ok(PaymentRecordStatus::Captured));
        assert_eq!(PaymentRecordStatus::Failed.to_string(), "failed");
        assert!("refunded".parse::<PaymentRecordStatus>().is_err());
    }
}
