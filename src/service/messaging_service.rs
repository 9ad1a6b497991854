//! Messaging service: records inbound DMs and sends automated replies.

use std::sync::Arc;

use chrono::Utc;

use super::HandlerResult;
use crate::clients::{OutboundSender, ReplyContext, ReplyGenerator};
use crate::config::GatewayConfig;
use crate::domain::{Customer, IdempotencyStore, Message};
use crate::error::GatewayError;
use crate::persistence::Store;
use crate::webhook::meta::InboundMessage;

/// Tenant defaults and reply tuning for [`MessagingService`].
#[derive(Debug, Clone)]
pub struct MessagingSettings {
    /// Tenant used when the receiving account is not bound to one.
    pub default_user_id: String,
    /// Automation switch for tenants without stored settings.
    pub automation_default_enabled: bool,
    /// Reply sent when the AI generator fails.
    pub fallback_reply: String,
    /// Number of earlier messages given to the AI.
    pub history_limit: usize,
}

impl From<&GatewayConfig> for MessagingSettings {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            default_user_id: config.default_user_id.clone(),
            automation_default_enabled: config.automation_default_enabled,
            fallback_reply: config.ai_fallback_reply.clone(),
            history_limit: config.ai_history_limit,
        }
    }
}

/// Handler for WhatsApp and Instagram text messages.
#[derive(Debug, Clone)]
pub struct MessagingService {
    store: Arc<dyn Store>,
    replies: Arc<dyn ReplyGenerator>,
    sender: Arc<dyn OutboundSender>,
    idempotency: Arc<IdempotencyStore>,
    settings: MessagingSettings,
}

impl MessagingService {
    /// Creates a new `MessagingService`.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        replies: Arc<dyn ReplyGenerator>,
        sender: Arc<dyn OutboundSender>,
        idempotency: Arc<IdempotencyStore>,
        settings: MessagingSettings,
    ) -> Self {
        Self {
            store,
            replies,
            sender,
            idempotency,
            settings,
        }
    }

    /// Handles every message of one delivery in order.
    ///
    /// # Errors
    ///
    /// Returns the first persistence failure; messages before it stay
    /// recorded and their IDs stay claimed.
    pub async fn handle_batch(
        &self,
        messages: &[InboundMessage],
    ) -> Result<HandlerResult, GatewayError> {
        if messages.is_empty() {
            tracing::debug!("delivery carries no text messages");
        }
        let mut result = HandlerResult::ok();
        for message in messages {
            result = result.and(self.handle_inbound(message).await?);
        }
        Ok(result)
    }

    /// Records one inbound message and, when automation is on, replies.
    ///
    /// A message ID seen before is skipped. The ID is released again if
    /// handling fails so the provider's redelivery is processed.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] on persistence failure. AI and send
    /// failures are absorbed.
    pub async fn handle_inbound(
        &self,
        message: &InboundMessage,
    ) -> Result<HandlerResult, GatewayError> {
        let key = message
            .message_id
            .as_deref()
            .map(|id| format!("{}:{id}", message.platform));

        if let Some(key) = key.as_deref()
            && !self.idempotency.claim(key)
        {
            tracing::info!(platform = %message.platform, key, "duplicate message delivery; skipping");
            return Ok(HandlerResult::ok());
        }

        let result = self.process(message).await;
        if result.is_err()
            && let Some(key) = key.as_deref()
        {
            self.idempotency.release(key);
        }
        result
    }

    async fn process(&self, message: &InboundMessage) -> Result<HandlerResult, GatewayError> {
        let platform = message.platform;
        let user_id = self
            .store
            .channel_owner(platform, &message.account_id)
            .await?
            .unwrap_or_else(|| self.settings.default_user_id.clone());

        let customer = match self
            .store
            .find_customer(&user_id, platform, &message.sender_id)
            .await?
        {
            Some(customer) => customer,
            None => {
                let created = Customer::new(
                    user_id.as_str(),
                    platform,
                    message.sender_id.as_str(),
                    message.sender_name.clone(),
                );
                tracing::info!(%platform, customer_id = %created.id, "new customer");
                self.store.insert_customer(&created).await?
            }
        };
        self.store.touch_customer(customer.id, Utc::now()).await?;

        let settings = self.store.user_settings(&user_id).await?;
        let automation = settings
            .as_ref()
            .map_or(self.settings.automation_default_enabled, |s| s.automation_enabled);

        let history = if automation {
            self.store
                .recent_messages(customer.id, self.settings.history_limit)
                .await?
        } else {
            Vec::new()
        };

        self.store
            .append_message(&Message::inbound(
                user_id.as_str(),
                customer.id,
                platform,
                message.text.as_str(),
                message.message_id.clone(),
            ))
            .await?;

        if !automation {
            tracing::debug!(%platform, %user_id, "automation disabled; not replying");
            return Ok(HandlerResult::ok());
        }

        let context = ReplyContext {
            settings: settings.as_ref(),
            history: &history,
            latest: &message.text,
        };
        let (reply, ai_generated) = match self.replies.draft_reply(&context).await {
            Ok(text) => (text, true),
            Err(e) => {
                tracing::warn!(%platform, error = %e, "reply generation failed; sending fallback");
                (self.settings.fallback_reply.clone(), false)
            }
        };

        self.store
            .append_message(&Message::outbound(
                user_id.as_str(),
                customer.id,
                platform,
                reply.as_str(),
                ai_generated,
            ))
            .await?;

        self.sender.send(platform, &message.sender_id, &reply).await;
        Ok(HandlerResult::ok())
    }
}
