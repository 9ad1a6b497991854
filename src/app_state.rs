//! Shared application state injected into all Axum handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::clients::{GraphApiSender, OpenAiReplyGenerator, OutboundSender, ReplyGenerator};
use crate::config::GatewayConfig;
use crate::domain::IdempotencyStore;
use crate::error::GatewayError;
use crate::persistence::Store;
use crate::service::{MessagingService, MessagingSettings, PaymentService};
use crate::webhook::EventRouter;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Secrets and verify tokens read by the webhook routes.
    pub config: Arc<GatewayConfig>,
    /// Storage backend for the operational REST endpoints.
    pub store: Arc<dyn Store>,
    /// Dispatches verified webhook events to handlers.
    pub router: Arc<EventRouter>,
}

impl AppState {
    /// Wires the services with the OpenAI and Graph API clients.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Downstream`] if an HTTP client cannot be built.
    pub fn new(config: GatewayConfig, store: Arc<dyn Store>) -> Result<Self, GatewayError> {
        let replies = Arc::new(OpenAiReplyGenerator::new(&config)?);
        let sender = Arc::new(GraphApiSender::new(&config)?);
        Ok(Self::with_collaborators(config, store, replies, sender))
    }

    /// Wires the services with the given reply generator and sender.
    #[must_use]
    pub fn with_collaborators(
        config: GatewayConfig,
        store: Arc<dyn Store>,
        replies: Arc<dyn ReplyGenerator>,
        sender: Arc<dyn OutboundSender>,
    ) -> Self {
        let idempotency = Arc::new(IdempotencyStore::new(Duration::from_secs(
            config.idempotency_ttl_secs,
        )));
        let payments = Arc::new(PaymentService::new(Arc::clone(&store)));
        let messaging = Arc::new(MessagingService::new(
            Arc::clone(&store),
            replies,
            sender,
            Arc::clone(&idempotency),
            MessagingSettings::from(&config),
        ));
        Self {
            config: Arc::new(config),
            store,
            router: Arc::new(EventRouter::new(payments, messaging, idempotency)),
        }
    }
}
