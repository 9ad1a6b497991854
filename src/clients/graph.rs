//! Outbound messaging through the Meta Graph API.
//!
//! [`OutboundSender::send`] is fire-and-log: a failed send is reported via
//! `tracing` and never propagated to the webhook caller. There is no retry.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use crate::config::GatewayConfig;
use crate::domain::Platform;
use crate::error::GatewayError;

/// Sends a text message to a customer on a messaging platform.
#[async_trait]
pub trait OutboundSender: Send + Sync + std::fmt::Debug {
    /// Delivers `text` to `recipient_id`. Failures are logged, not returned.
    async fn send(&self, platform: Platform, recipient_id: &str, text: &str);
}

/// [`OutboundSender`] backed by the WhatsApp Cloud API and the Instagram
/// messaging API.
#[derive(Debug, Clone)]
pub struct GraphApiSender {
    client: reqwest::Client,
    base_url: String,
    version: String,
    whatsapp_token: Option<SecretString>,
    whatsapp_phone_number_id: Option<String>,
    instagram_token: Option<SecretString>,
}

impl GraphApiSender {
    /// Builds a sender from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Downstream`] if the HTTP client cannot be
    /// constructed.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.outbound_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.graph_api_base_url.trim_end_matches('/').to_string(),
            version: config.graph_api_version.clone(),
            whatsapp_token: config.whatsapp_access_token.clone(),
            whatsapp_phone_number_id: config.whatsapp_phone_number_id.clone(),
            instagram_token: config.instagram_access_token.clone(),
        })
    }

    /// Endpoint and bearer token for a platform.
    fn endpoint(&self, platform: Platform) -> Result<(String, &SecretString), GatewayError> {
        match platform {
            Platform::WhatsApp => {
                let token = self.whatsapp_token.as_ref().ok_or_else(|| {
                    GatewayError::Downstream("WHATSAPP_ACCESS_TOKEN is not configured".to_string())
                })?;
                let phone_number_id = self.whatsapp_phone_number_id.as_deref().ok_or_else(|| {
                    GatewayError::Downstream(
                        "WHATSAPP_PHONE_NUMBER_ID is not configured".to_string(),
                    )
                })?;
                Ok((
                    format!("{}/{}/{phone_number_id}/messages", self.base_url, self.version),
                    token,
                ))
            }
            Platform::Instagram => {
                let token = self.instagram_token.as_ref().ok_or_else(|| {
                    GatewayError::Downstream("INSTAGRAM_ACCESS_TOKEN is not configured".to_string())
                })?;
                Ok((format!("{}/{}/me/messages", self.base_url, self.version), token))
            }
        }
    }

    /// Performs the send and reports failures to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Downstream`] on missing credentials, transport
    /// errors or a non-2xx response.
    pub async fn try_send(
        &self,
        platform: Platform,
        recipient_id: &str,
        text: &str,
    ) -> Result<(), GatewayError> {
        let (url, token) = self.endpoint(platform)?;
        let body = request_body(platform, recipient_id, text);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(GatewayError::Downstream(format!(
                "graph api returned {status}: {detail}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl OutboundSender for GraphApiSender {
    async fn send(&self, platform: Platform, recipient_id: &str, text: &str) {
        match self.try_send(platform, recipient_id, text).await {
            Ok(()) => tracing::info!(%platform, recipient_id, "outbound message sent"),
            Err(e) => tracing::error!(%platform, recipient_id, error = %e, "outbound message failed"),
        }
    }
}

/// JSON body for the platform's send endpoint.
fn request_body(platform: Platform, recipient_id: &str, text: &str) -> serde_json::Value {
    match platform {
        Platform::WhatsApp => json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": recipient_id,
            "type": "text",
            "text": { "preview_url": false, "body": text },
        }),
        Platform::Instagram => json!({
            "recipient": { "id": recipient_id },
            "message": { "text": text },
        }),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use wiremock::matchers::{bearer_token, body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn sender(pairs: &[(&str, &str)]) -> GraphApiSender {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let Ok(config) = GatewayConfig::from_lookup(|k| {
            pairs.iter().find(|(key, _)| key == k).map(|(_, v)| v.clone())
        }) else {
            panic!("config should load");
        };
        let Ok(sender) = GraphApiSender::new(&config) else {
            panic!("client should build");
        };
        sender
    }

    #[test]
    fn whatsapp_endpoint_uses_phone_number_id() {
        let sender = sender(&[
            ("GRAPH_API_BASE_URL", "https://graph.example.com/"),
            ("GRAPH_API_VERSION", "v20.0"),
            ("WHATSAPP_ACCESS_TOKEN", "wa-token"),
            ("WHATSAPP_PHONE_NUMBER_ID", "PN1"),
        ]);
        let Ok((url, token)) = sender.endpoint(Platform::WhatsApp) else {
            panic!("endpoint should resolve");
        };
        assert_eq!(url, "https://graph.example.com/v20.0/PN1/messages");
        assert_eq!(token.expose_secret(), "wa-token");
    }

    #[test]
    fn instagram_endpoint_is_me_messages() {
        let sender = sender(&[("INSTAGRAM_ACCESS_TOKEN", "ig-token")]);
        let Ok((url, _)) = sender.endpoint(Platform::Instagram) else {
            panic!("endpoint should resolve");
        };
        assert!(url.ends_with("/me/messages"));
    }

    #[tokio::test]
    async fn missing_credentials_fail_without_network() {
        let sender = sender(&[]);
        let result = sender.try_send(Platform::WhatsApp, "9199", "hi").await;
        assert!(matches!(result, Err(GatewayError::Downstream(_))));
    }

    #[test]
    fn request_bodies_match_platform_shapes() {
        let wa = request_body(Platform::WhatsApp, "9199", "hello");
        assert_eq!(wa.pointer("/to"), Some(&json!("9199")));
        assert_eq!(wa.pointer("/text/body"), Some(&json!("hello")));

        let ig = request_body(Platform::Instagram, "ig-user", "hello");
        assert_eq!(ig.pointer("/recipient/id"), Some(&json!("ig-user")));
        assert_eq!(ig.pointer("/message/text"), Some(&json!("hello")));
    }

    fn whatsapp_sender(base_url: &str) -> GraphApiSender {
        sender(&[
            ("GRAPH_API_BASE_URL", base_url),
            ("GRAPH_API_VERSION", "v21.0"),
            ("WHATSAPP_ACCESS_TOKEN", "wa-token"),
            ("WHATSAPP_PHONE_NUMBER_ID", "PN1"),
        ])
    }

    #[tokio::test]
    async fn whatsapp_send_posts_text_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v21.0/PN1/messages"))
            .and(bearer_token("wa-token"))
            .and(body_json(request_body(Platform::WhatsApp, "9199", "hello")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "messages": [{ "id": "wamid.1" }] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let result = whatsapp_sender(&server.uri())
            .try_send(Platform::WhatsApp, "9199", "hello")
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn error_status_is_a_downstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v21.0/PN1/messages"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .expect(2)
            .mount(&server)
            .await;
        let sender = whatsapp_sender(&server.uri());

        let result = sender.try_send(Platform::WhatsApp, "9199", "hello").await;
        let Err(GatewayError::Downstream(detail)) = result else {
            panic!("500 should map to a downstream error");
        };
        assert!(detail.contains("500"));
        assert!(detail.contains("upstream down"));

        // Fire-and-log: the trait method swallows the failure.
        sender.send(Platform::WhatsApp, "9199", "hello").await;
    }

    #[tokio::test]
    async fn connection_failure_is_a_downstream_error() {
        // Nothing listens on port 1.
        let sender = whatsapp_sender("http://127.0.0.1:1");
        let result = sender.try_send(Platform::WhatsApp, "9199", "hello").await;
        assert!(matches!(result, Err(GatewayError::Downstream(_))));
        sender.send(Platform::WhatsApp, "9199", "hello").await;
    }
}
