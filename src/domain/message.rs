//! Conversation messages. The message log is append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Platform;

/// Whether a message came from the customer or was sent by us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Customer to business.
    Inbound,
    /// Business to customer.
    Outbound,
}

str_enum!(Direction { Inbound => "inbound", Outbound => "outbound" });

/// A single message in a customer conversation. Never updated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Message {
    /// Internal identifier.
    pub id: uuid::Uuid,
    /// Owning tenant.
    pub user_id: String,
    /// Conversation partner.
    pub customer_id: uuid::Uuid,
    /// Channel the message travelled on.
    pub platform: Platform,
    /// Message text.
    pub content: String,
    /// Inbound or outbound.
    pub direction: Direction,
    /// `true` when the text was drafted by the AI collaborator.
    pub ai_generated: bool,
    /// Platform message ID (`wamid...` / `mid...`) for inbound messages.
    #[serde(default)]
    pub external_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Builds an inbound message received from a customer.
    #[must_use]
    pub fn inbound(
        user_id: impl Into<String>,
        customer_id: uuid::Uuid,
        platform: Platform,
        content: impl Into<String>,
        external_id: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            user_id: user_id.into(),
            customer_id,
            platform,
            content: content.into(),
            direction: Direction::Inbound,
            ai_generated: false,
            external_id,
            created_at: Utc::now(),
        }
    }

    /// Builds an outbound reply.
    #[must_use]
    pub fn outbound(
        user_id: impl Into<String>,
        customer_id: uuid::Uuid,
        platform: Platform,
        content: impl Into<String>,
        ai_generated: bool,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            user_id: user_id.into(),
            customer_id,
            platform,
            content: content.into(),
            direction: Direction::Outbound,
            ai_generated,
            external_id: None,
            created_at: Utc::now(),
        }
    }
}
