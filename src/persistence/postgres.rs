//! PostgreSQL implementation of the persistence layer.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::Store;
use crate::config::GatewayConfig;
use crate::domain::{Customer, Message, Order, Payment, Platform, UserSettings};
use crate::error::GatewayError;

const ORDER_COLUMNS: &str =
    "id, user_id, customer_id, amount, currency, payment_status, status, metadata, created_at, updated_at";
const CUSTOMER_COLUMNS: &str =
    "id, user_id, platform, external_id, name, total_orders, total_spent, last_contact_at, created_at";
const MESSAGE_COLUMNS: &str =
    "id, user_id, customer_id, platform, content, direction, ai_generated, external_id, created_at";

/// PostgreSQL-backed persistence layer using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new persistence layer with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool sized from configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] if the database is
    /// unreachable.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies pending schema migrations from `migrations/`.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), GatewayError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| GatewayError::PersistenceError(e.to_string()))
    }
}

fn parse_column<T>(row: &PgRow, column: &str) -> Result<T, GatewayError>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(GatewayError::PersistenceError)
}

fn order_from_row(row: &PgRow) -> Result<Order, GatewayError> {
    let metadata: serde_json::Value = row.try_get("metadata")?;
    Ok(Order {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        customer_id: row.try_get("customer_id")?,
        amount: row.try_get("amount")?,
        currency: row.try_get("currency")?,
        payment_status: parse_column(row, "payment_status")?,
        status: parse_column(row, "status")?,
        metadata: metadata.as_object().cloned().unwrap_or_default(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn customer_from_row(row: &PgRow) -> Result<Customer, GatewayError> {
    let total_orders: i32 = row.try_get("total_orders")?;
    Ok(Customer {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        platform: parse_column(row, "platform")?,
        external_id: row.try_get("external_id")?,
        name: row.try_get("name")?,
        total_orders: u32::try_from(total_orders).unwrap_or(0),
        total_spent: row.try_get("total_spent")?,
        last_contact_at: row.try_get("last_contact_at")?,
        created_at: row.try_get("created_at")?,
    })
}

fn message_from_row(row: &PgRow) -> Result<Message, GatewayError> {
    Ok(Message {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        customer_id: row.try_get("customer_id")?,
        platform: parse_column(row, "platform")?,
        content: row.try_get("content")?,
        direction: parse_column(row, "direction")?,
        ai_generated: row.try_get("ai_generated")?,
        external_id: row.try_get("external_id")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl Store for PostgresStore {
    async fn get_order(&self, id: &str) -> Result<Option<Order>, GatewayError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn insert_order(&self, order: &Order) -> Result<(), GatewayError> {
        let result = sqlx::query(
            "INSERT INTO orders (id, user_id, customer_id, amount, currency, payment_status, status, metadata, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) ON CONFLICT (id) DO NOTHING",
        )
        .bind(&order.id)
        .bind(&order.user_id)
        .bind(order.customer_id)
        .bind(order.amount)
        .bind(&order.currency)
        .bind(order.payment_status.as_str())
        .bind(order.status.as_str())
        .bind(serde_json::Value::Object(order.metadata.clone()))
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::Conflict(format!(
                "order {} already exists",
                order.id
            )));
        }
        Ok(())
    }

    async fn settle_order(&self, order: &Order) -> Result<bool, GatewayError> {
        let result = sqlx::query(
            "UPDATE orders SET payment_status = $2, status = $3, metadata = $4, updated_at = $5 \
             WHERE id = $1 AND payment_status = 'pending'",
        )
        .bind(&order.id)
        .bind(order.payment_status.as_str())
        .bind(order.status.as_str())
        .bind(serde_json::Value::Object(order.metadata.clone()))
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<bool, GatewayError> {
        let result = sqlx::query(
            "INSERT INTO payments (id, order_id, amount, currency, status, method, failure_reason, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) ON CONFLICT (id) DO NOTHING",
        )
        .bind(&payment.id)
        .bind(&payment.order_id)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(&payment.method)
        .bind(&payment.failure_reason)
        .bind(payment.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_customer(&self, id: Uuid) -> Result<Option<Customer>, GatewayError> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(customer_from_row).transpose()
    }

    async fn find_customer(
        &self,
        user_id: &str,
        platform: Platform,
        external_id: &str,
    ) -> Result<Option<Customer>, GatewayError> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers \
             WHERE user_id = $1 AND platform = $2 AND external_id = $3"
        ))
        .bind(user_id)
        .bind(platform.as_str())
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(customer_from_row).transpose()
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<Customer, GatewayError> {
        sqlx::query(
            "INSERT INTO customers (id, user_id, platform, external_id, name, total_orders, total_spent, last_contact_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (user_id, platform, external_id) DO NOTHING",
        )
        .bind(customer.id)
        .bind(&customer.user_id)
        .bind(customer.platform.as_str())
        .bind(&customer.external_id)
        .bind(&customer.name)
        .bind(i32::try_from(customer.total_orders).unwrap_or(i32::MAX))
        .bind(customer.total_spent)
        .bind(customer.last_contact_at)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        self.find_customer(&customer.user_id, customer.platform, &customer.external_id)
            .await?
            .ok_or_else(|| GatewayError::Internal("customer vanished after insert".to_string()))
    }

    async fn touch_customer(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), GatewayError> {
        let result = sqlx::query("UPDATE customers SET last_contact_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(GatewayError::CustomerNotFound(id));
        }
        Ok(())
    }

    async fn record_customer_order(&self, id: Uuid, amount: i64) -> Result<(), GatewayError> {
        let result = sqlx::query(
            "UPDATE customers SET total_orders = total_orders + 1, total_spent = total_spent + $2 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(amount)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(GatewayError::CustomerNotFound(id));
        }
        Ok(())
    }

    async fn append_message(&self, message: &Message) -> Result<(), GatewayError> {
        sqlx::query(
            "INSERT INTO messages (id, user_id, customer_id, platform, content, direction, ai_generated, external_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(message.id)
        .bind(&message.user_id)
        .bind(message.customer_id)
        .bind(message.platform.as_str())
        .bind(&message.content)
        .bind(message.direction.as_str())
        .bind(message.ai_generated)
        .bind(&message.external_id)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_messages(
        &self,
        customer_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Message>, GatewayError> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE customer_id = $1 \
             ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(customer_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let mut messages = rows
            .iter()
            .map(message_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        messages.reverse();
        Ok(messages)
    }

    async fn channel_owner(
        &self,
        platform: Platform,
        account_id: &str,
    ) -> Result<Option<String>, GatewayError> {
        let owner = sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM channel_accounts WHERE platform = $1 AND account_id = $2",
        )
        .bind(platform.as_str())
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(owner)
    }

    async fn user_settings(&self, user_id: &str) -> Result<Option<UserSettings>, GatewayError> {
        let row = sqlx::query_as::<_, (String, bool, Option<String>, Option<String>)>(
            "SELECT user_id, automation_enabled, business_name, reply_prompt \
             FROM user_settings WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(user_id, automation_enabled, business_name, reply_prompt)| UserSettings {
                user_id,
                automation_enabled,
                business_name,
                reply_prompt,
            },
        ))
    }
}
