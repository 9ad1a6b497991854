//! Process-local [`Store`] backed by hash maps.
//!
//! All tables sit behind a single [`tokio::sync::RwLock`], so every write is
//! serialized and each trait call is atomic on its own. The store can be
//! seeded from a JSON snapshot for local runs; it never writes back.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::Store;
use crate::domain::{ChannelAccount, Customer, Message, Order, Payment, Platform, UserSettings};
use crate::error::GatewayError;

/// Serializable contents of an [`InMemoryStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemorySnapshot {
    /// Orders.
    #[serde(default)]
    pub orders: Vec<Order>,
    /// Payments.
    #[serde(default)]
    pub payments: Vec<Payment>,
    /// Customers.
    #[serde(default)]
    pub customers: Vec<Customer>,
    /// Messages, in append order.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Tenant settings.
    #[serde(default)]
    pub user_settings: Vec<UserSettings>,
    /// Channel ownership bindings.
    #[serde(default)]
    pub channel_accounts: Vec<ChannelAccount>,
}

#[derive(Debug, Default)]
struct Tables {
    orders: HashMap<String, Order>,
    payments: HashMap<String, Payment>,
    customers: HashMap<uuid::Uuid, Customer>,
    messages: Vec<Message>,
    user_settings: HashMap<String, UserSettings>,
    channel_accounts: HashMap<(Platform, String), String>,
}

/// In-memory implementation of [`Store`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: MemorySnapshot) -> Self {
        let tables = Tables {
            orders: snapshot
                .orders
                .into_iter()
                .map(|o| (o.id.clone(), o))
                .collect(),
            payments: snapshot
                .payments
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect(),
            customers: snapshot.customers.into_iter().map(|c| (c.id, c)).collect(),
            messages: snapshot.messages,
            user_settings: snapshot
                .user_settings
                .into_iter()
                .map(|s| (s.user_id.clone(), s))
                .collect(),
            channel_accounts: snapshot
                .channel_accounts
                .into_iter()
                .map(|a| ((a.platform, a.account_id), a.user_id))
                .collect(),
        };
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Reads a JSON snapshot from disk.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] if the file cannot be read
    /// or is not a valid snapshot.
    pub async fn load_json(path: &Path) -> Result<Self, GatewayError> {
        let raw = tokio::fs::read(path).await.map_err(|e| {
            GatewayError::PersistenceError(format!("reading {}: {e}", path.display()))
        })?;
        let snapshot: MemorySnapshot = serde_json::from_slice(&raw).map_err(|e| {
            GatewayError::PersistenceError(format!("parsing {}: {e}", path.display()))
        })?;
        tracing::info!(
            path = %path.display(),
            orders = snapshot.orders.len(),
            customers = snapshot.customers.len(),
            "seeded in-memory store"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Inserts or replaces a tenant's settings.
    pub async fn put_user_settings(&self, settings: UserSettings) {
        let mut tables = self.tables.write().await;
        tables
            .user_settings
            .insert(settings.user_id.clone(), settings);
    }

    /// Binds a receiving channel account to a tenant.
    pub async fn bind_channel(&self, account: ChannelAccount) {
        let mut tables = self.tables.write().await;
        tables
            .channel_accounts
            .insert((account.platform, account.account_id), account.user_id);
    }

    /// Returns a copy of the stored payment, if any.
    pub async fn payment(&self, id: &str) -> Option<Payment> {
        self.tables.read().await.payments.get(id).cloned()
    }

    /// Returns the total number of messages in the log.
    pub async fn message_count(&self) -> usize {
        self.tables.read().await.messages.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_order(&self, id: &str) -> Result<Option<Order>, GatewayError> {
        Ok(self.tables.read().await.orders.get(id).cloned())
    }

    async fn insert_order(&self, order: &Order) -> Result<(), GatewayError> {
        let mut tables = self.tables.write().await;
        if tables.orders.contains_key(&order.id) {
            return Err(GatewayError::Conflict(format!(
                "order {} already exists",
                order.id
            )));
        }
        tables.orders.insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn settle_order(&self, order: &Order) -> Result<bool, GatewayError> {
        let mut tables = self.tables.write().await;
        match tables.orders.get_mut(&order.id) {
            Some(stored) if stored.is_pending() => {
                *stored = order.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(GatewayError::OrderNotFound(order.id.clone())),
        }
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<bool, GatewayError> {
        let mut tables = self.tables.write().await;
        if tables.payments.contains_key(&payment.id) {
            return Ok(false);
        }
        tables.payments.insert(payment.id.clone(), payment.clone());
        Ok(true)
    }

    async fn get_customer(&self, id: uuid::Uuid) -> Result<Option<Customer>, GatewayError> {
        Ok(self.tables.read().await.customers.get(&id).cloned())
    }

    async fn find_customer(
        &self,
        user_id: &str,
        platform: Platform,
        external_id: &str,
    ) -> Result<Option<Customer>, GatewayError> {
        let tables = self.tables.read().await;
        Ok(tables
            .customers
            .values()
            .find(|c| c.user_id == user_id && c.platform == platform && c.external_id == external_id)
            .cloned())
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<Customer, GatewayError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.customers.values().find(|c| {
            c.user_id == customer.user_id
                && c.platform == customer.platform
                && c.external_id == customer.external_id
        }) {
            return Ok(existing.clone());
        }
        tables.customers.insert(customer.id, customer.clone());
        Ok(customer.clone())
    }

    async fn touch_customer(&self, id: uuid::Uuid, at: DateTime<Utc>) -> Result<(), GatewayError> {
        let mut tables = self.tables.write().await;
        let customer = tables
            .customers
            .get_mut(&id)
            .ok_or(GatewayError::CustomerNotFound(id))?;
        customer.last_contact_at = Some(at);
        Ok(())
    }

    async fn record_customer_order(&self, id: uuid::Uuid, amount: i64) -> Result<(), GatewayError> {
        let mut tables = self.tables.write().await;
        let customer = tables
            .customers
            .get_mut(&id)
            .ok_or(GatewayError::CustomerNotFound(id))?;
        customer.record_order(amount);
        Ok(())
    }

    async fn append_message(&self, message: &Message) -> Result<(), GatewayError> {
        self.tables.write().await.messages.push(message.clone());
        Ok(())
    }

    async fn recent_messages(
        &self,
        customer_id: uuid::Uuid,
        limit: usize,
    ) -> Result<Vec<Message>, GatewayError> {
        let tables = self.tables.read().await;
        let mut recent: Vec<Message> = tables
            .messages
            .iter()
            .rev()
            .filter(|m| m.customer_id == customer_id)
            .take(limit)
            .cloned()
            .collect();
        recent.reverse();
        Ok(recent)
    }

    async fn channel_owner(
        &self,
        platform: Platform,
        account_id: &str,
    ) -> Result<Option<String>, GatewayError> {
        let tables = self.tables.read().await;
        Ok(tables
            .channel_accounts
            .get(&(platform, account_id.to_string()))
            .cloned())
    }

    async fn user_settings(&self, user_id: &str) -> Result<Option<UserSettings>, GatewayError> {
        Ok(self.tables.read().await.user_settings.get(user_id).cloned())
    }
}
