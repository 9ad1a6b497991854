//! Tenant-level settings: who owns a channel and whether replies are automated.

use serde::{Deserialize, Serialize};

use super::Platform;

/// Per-tenant automation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    /// Tenant identifier.
    pub user_id: String,
    /// Draft and send AI replies to inbound messages.
    pub automation_enabled: bool,
    /// Business name given to the AI as context.
    #[serde(default)]
    pub business_name: Option<String>,
    /// Extra instructions for the AI reply.
    #[serde(default)]
    pub reply_prompt: Option<String>,
}

impl UserSettings {
    /// Settings with only the automation switch set.
    #[must_use]
    pub fn new(user_id: impl Into<String>, automation_enabled: bool) -> Self {
        Self {
            user_id: user_id.into(),
            automation_enabled,
            business_name: None,
            reply_prompt: None,
        }
    }
}

/// Binds a receiving platform account to the tenant that owns it.
///
/// `account_id` is the WhatsApp `phone_number_id` or the Instagram
/// professional account ID that appears as the message recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAccount {
    /// Channel.
    pub platform: Platform,
    /// Receiving account on that channel.
    pub account_id: String,
    /// Owning tenant.
    pub user_id: String,
}
