//! Persistence layer: the [`Store`] collaborator and its implementations.
//!
//! Handlers never read-modify-write a whole record set. Order settlement is
//! a compare-and-set on `payment_status = pending` and customer counters are
//! incremented in place, so two concurrent deliveries for the same order
//! cannot both win.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::domain::{Customer, Message, Order, Payment, Platform, UserSettings};
use crate::error::GatewayError;

pub use memory::{InMemoryStore, MemorySnapshot};
pub use postgres::PostgresStore;

/// Storage for orders, payments, customers, messages and tenant settings.
#[async_trait]
pub trait Store: Send + Sync + std::fmt::Debug {
    /// Loads an order by merchant ID.
    async fn get_order(&self, id: &str) -> Result<Option<Order>, GatewayError>;

    /// Inserts a new order.
    ///
    /// Fails with [`GatewayError::Conflict`] if the ID is taken.
    async fn insert_order(&self, order: &Order) -> Result<(), GatewayError>;

    /// Persists a settled order if the stored copy is still pending.
    ///
    /// Returns `false` when another writer settled the order first.
    async fn settle_order(&self, order: &Order) -> Result<bool, GatewayError>;

    /// Records a payment attempt. Re-recording the same payment ID is a no-op.
    ///
    /// Returns `true` if the payment was newly stored.
    async fn insert_payment(&self, payment: &Payment) -> Result<bool, GatewayError>;

    /// Loads a customer by internal ID.
    async fn get_customer(&self, id: uuid::Uuid) -> Result<Option<Customer>, GatewayError>;

    /// Looks up a customer by tenant and platform handle.
    async fn find_customer(
        &self,
        user_id: &str,
        platform: Platform,
        external_id: &str,
    ) -> Result<Option<Customer>, GatewayError>;

    /// Inserts a customer and returns the stored row.
    ///
    /// If a customer with the same tenant, platform and handle already
    /// exists, that record is returned instead.
    async fn insert_customer(&self, customer: &Customer) -> Result<Customer, GatewayError>;

    /// Stamps the customer's last contact time.
    async fn touch_customer(
        &self,
        id: uuid::Uuid,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), GatewayError>;

    /// Adds one paid order of `amount` to the customer's totals.
    async fn record_customer_order(&self, id: uuid::Uuid, amount: i64) -> Result<(), GatewayError>;

    /// Appends a message to the log.
    async fn append_message(&self, message: &Message) -> Result<(), GatewayError>;

    /// Returns up to `limit` most recent messages, oldest first.
    async fn recent_messages(
        &self,
        customer_id: uuid::Uuid,
        limit: usize,
    ) -> Result<Vec<Message>, GatewayError>;

    /// Resolves the tenant owning a receiving channel account.
    async fn channel_owner(
        &self,
        platform: Platform,
        account_id: &str,
    ) -> Result<Option<String>, GatewayError>;

    /// Loads a tenant's automation settings.
    async fn user_settings(&self, user_id: &str) -> Result<Option<UserSettings>, GatewayError>;
}
