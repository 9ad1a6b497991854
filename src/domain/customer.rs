//! Customers, created on first contact and updated on every order or message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Platform;

/// A tenant's customer, keyed by their platform handle or phone number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Customer {
    /// Internal identifier.
    pub id: uuid::Uuid,
    /// Owning tenant.
    pub user_id: String,
    /// Channel the customer first reached us on.
    pub platform: Platform,
    /// Instagram-scoped user ID or WhatsApp phone number.
    pub external_id: String,
    /// Display name, when the platform provides one.
    #[serde(default)]
    pub name: Option<String>,
    /// Number of paid orders.
    pub total_orders: u32,
    /// Sum of paid order amounts in minor currency units.
    pub total_spent: i64,
    /// Time of the most recent inbound message.
    #[serde(default)]
    pub last_contact_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Creates a customer with zeroed counters.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        platform: Platform,
        external_id: impl Into<String>,
        name: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            user_id: user_id.into(),
            platform,
            external_id: external_id.into(),
            name,
            total_orders: 0,
            total_spent: 0,
            last_contact_at: None,
            created_at: Utc::now(),
        }
    }

    /// Counts one more paid order of `amount`.
    pub fn record_order(&mut self, amount: i64) {
        self.total_orders = self.total_orders.saturating_add(1);
        self.total_spent = self.total_spent.saturating_add(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_customer_has_zeroed_counters() {
        let customer = Customer::new("u1", Platform::WhatsApp, "919999999999", None);
        assert_eq!(customer.total_orders, 0);
        assert_eq!(customer.total_spent, 0);
        assert!(customer.last_contact_at.is_none());
    }

    #[test]
    fn record_order_accumulates() {
        let mut customer = Customer::new("u1", Platform::Instagram, "1789", None);
        customer.record_order(500);
        customer.record_order(250);
        assert_eq!(customer.total_orders, 2);
        assert_eq!(customer.total_spent, 750);
    }
}
