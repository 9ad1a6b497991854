//! Webhook acknowledgement and subscription challenge shapes.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Body returned to a provider once a delivery is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    /// `success`, or `duplicate` for a redelivered event.
    pub status: String,
}

impl WebhookAck {
    /// Delivery processed (or deliberately dropped).
    #[must_use]
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
        }
    }

    /// Delivery already processed.
    #[must_use]
    pub fn duplicate() -> Self {
        Self {
            status: "duplicate".to_string(),
        }
    }
}

/// Meta subscription handshake query (`hub.mode`, `hub.verify_token`,
/// `hub.challenge`).
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifyQuery {
    /// Must be `subscribe`.
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    /// Token configured in the Meta app dashboard.
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    /// Value echoed back on success.
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}
