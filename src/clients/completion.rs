//! AI reply drafting through an OpenAI-compatible chat completions API.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::GatewayConfig;
use crate::domain::{Direction, Message, UserSettings};
use crate::error::GatewayError;

const BASE_PROMPT: &str = "You are a friendly sales assistant replying to customer direct messages. \
Answer briefly and helpfully. If you do not know something, say a team member will follow up.";

/// Everything the AI needs to draft one reply.
#[derive(Debug, Clone)]
pub struct ReplyContext<'a> {
    /// Owner settings, when stored.
    pub settings: Option<&'a UserSettings>,
    /// Earlier conversation, oldest first.
    pub history: &'a [Message],
    /// The message being answered.
    pub latest: &'a str,
}

/// Drafts a reply to a customer message.
#[async_trait]
pub trait ReplyGenerator: Send + Sync + std::fmt::Debug {
    /// Returns the reply text.
    ///
    /// Implementations return [`GatewayError::Downstream`] on provider
    /// failure; callers substitute a fallback.
    async fn draft_reply(&self, context: &ReplyContext<'_>) -> Result<String, GatewayError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// [`ReplyGenerator`] calling `POST {base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiReplyGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl OpenAiReplyGenerator {
    /// Builds a generator from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Downstream`] if the HTTP client cannot be
    /// constructed.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.ai_timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            client,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            model: config.openai_model.clone(),
            api_key: config.openai_api_key.clone(),
        })
    }
}

/// Builds the chat transcript sent to the model.
fn build_messages(context: &ReplyContext<'_>) -> Vec<ChatMessage> {
    let mut system = BASE_PROMPT.to_string();
    if let Some(settings) = context.settings {
        if let Some(name) = settings.business_name.as_deref() {
            system.push_str(&format!(" You represent {name}."));
        }
        if let Some(prompt) = settings.reply_prompt.as_deref() {
            system.push('\n');
            system.push_str(prompt);
        }
    }

    let mut messages = vec![ChatMessage {
        role: "system".to_string(),
        content: system,
    }];
    messages.extend(context.history.iter().map(|m| ChatMessage {
        role: match m.direction {
            Direction::Inbound => "user",
            Direction::Outbound => "assistant",
        }
        .to_string(),
        content: m.content.clone(),
    }));
    messages.push(ChatMessage {
        role: "user".to_string(),
        content: context.latest.to_string(),
    });
    messages
}

#[async_trait]
impl ReplyGenerator for OpenAiReplyGenerator {
    async fn draft_reply(&self, context: &ReplyContext<'_>) -> Result<String, GatewayError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| GatewayError::Downstream("OPENAI_API_KEY is not configured".to_string()))?;

        let request = ChatRequest {
            model: &self.model,
            messages: build_messages(context),
            max_tokens: 300,
            temperature: 0.7,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Downstream(format!(
                "chat completion returned {status}"
            )));
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| GatewayError::Downstream("chat completion returned no text".to_string()))
    }
}
