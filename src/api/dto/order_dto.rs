//! Order and customer request/response shapes for the operational API.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{Customer, Message};

/// `POST /api/v1/orders` body.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    /// Merchant order ID. Generated as `ORD-<hex>` when omitted.
    #[serde(default)]
    pub id: Option<String>,
    /// Owning tenant. Defaults to the configured default tenant.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Customer the order belongs to.
    #[serde(default)]
    pub customer_id: Option<uuid::Uuid>,
    /// Amount in the smallest currency unit (paise).
    pub amount: i64,
    /// ISO 4217 code. Defaults to `INR`.
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "INR".to_string()
}

/// Query for the customer message history endpoint.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MessageHistoryParams {
    /// Maximum number of messages (1-200). Defaults to 50.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

impl MessageHistoryParams {
    /// Limit clamped to the allowed range.
    #[must_use]
    pub fn clamped(&self) -> usize {
        self.limit.clamp(1, 200)
    }
}

/// A customer with their recent messages, oldest first.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConversationResponse {
    /// The customer.
    pub customer: Customer,
    /// Recent messages, oldest first.
    pub messages: Vec<Message>,
}
