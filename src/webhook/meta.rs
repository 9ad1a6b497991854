//! Meta webhook payload shapes for WhatsApp and Instagram.
//!
//! Both envelopes are flattened into [`InboundMessage`]s. Only text messages
//! are extracted; status callbacks, reactions, media and Instagram echoes of
//! our own sends are skipped.

use serde::Deserialize;

use crate::domain::Platform;

/// `object` value of WhatsApp Business deliveries.
pub const WHATSAPP_OBJECT: &str = "whatsapp_business_account";

/// `object` value of Instagram messaging deliveries.
pub const INSTAGRAM_OBJECT: &str = "instagram";

/// A customer text message extracted from a Meta envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Channel.
    pub platform: Platform,
    /// Receiving business account (phone number ID / Instagram account ID).
    pub account_id: String,
    /// Customer handle (WhatsApp number / Instagram-scoped ID).
    pub sender_id: String,
    /// Customer display name, if provided.
    pub sender_name: Option<String>,
    /// Platform message ID.
    pub message_id: Option<String>,
    /// Message text.
    pub text: String,
}

/// WhatsApp `{ object, entry: [{ changes: [{ value }] }] }`.
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppWebhook {
    /// Always `whatsapp_business_account`.
    pub object: String,
    /// Entries, one per business account.
    #[serde(default)]
    pub entry: Vec<WhatsAppEntry>,
}

/// One business account's changes.
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppEntry {
    /// WhatsApp Business Account ID.
    #[serde(default)]
    pub id: String,
    /// Field changes.
    #[serde(default)]
    pub changes: Vec<WhatsAppChange>,
}

/// A single field change.
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppChange {
    /// Changed field; `messages` for message traffic.
    #[serde(default)]
    pub field: String,
    /// Change body.
    pub value: WhatsAppValue,
}

/// Body of a `messages` change.
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppValue {
    /// Receiving number metadata.
    #[serde(default)]
    pub metadata: Option<WhatsAppMetadata>,
    /// Sender profiles.
    #[serde(default)]
    pub contacts: Vec<WhatsAppContact>,
    /// Incoming messages.
    #[serde(default)]
    pub messages: Vec<WhatsAppMessage>,
}

/// Receiving number metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppMetadata {
    /// Business phone number ID.
    pub phone_number_id: String,
}

/// Sender profile.
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppContact {
    /// Sender WhatsApp ID (phone number).
    pub wa_id: String,
    /// Profile block.
    #[serde(default)]
    pub profile: Option<WhatsAppProfile>,
}

/// Sender profile block.
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppProfile {
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// An incoming WhatsApp message.
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppMessage {
    /// Sender phone number.
    pub from: String,
    /// Message ID (`wamid...`).
    pub id: String,
    /// Message type (`text`, `image`, ...).
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Text body for `text` messages.
    #[serde(default)]
    pub text: Option<WhatsAppText>,
}

/// Text body.
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppText {
    /// Message text.
    pub body: String,
}

impl WhatsAppWebhook {
    /// Flattens the envelope into text messages.
    #[must_use]
    pub fn messages(&self) -> Vec<InboundMessage> {
        let mut out = Vec::new();
        for change in self.entry.iter().flat_map(|e| &e.changes) {
            if change.field != "messages" {
                continue;
            }
            let value = &change.value;
            let account_id = value
                .metadata
                .as_ref()
                .map(|m| m.phone_number_id.clone())
                .unwrap_or_default();
            for message in &value.messages {
                let Some(text) = message.text.as_ref().filter(|_| message.kind == "text") else {
                    tracing::debug!(kind = %message.kind, id = %message.id, "skipping non-text whatsapp message");
                    continue;
                };
                let sender_name = value
                    .contacts
                    .iter()
                    .find(|c| c.wa_id == message.from)
                    .and_then(|c| c.profile.as_ref())
                    .and_then(|p| p.name.clone());
                out.push(InboundMessage {
                    platform: Platform::WhatsApp,
                    account_id: account_id.clone(),
                    sender_id: message.from.clone(),
                    sender_name,
                    message_id: Some(message.id.clone()),
                    text: text.body.clone(),
                });
            }
        }
        out
    }
}

/// Instagram `{ object, entry: [{ messaging: [...] }] }`.
#[derive(Debug, Clone, Deserialize)]
pub struct InstagramWebhook {
    /// Always `instagram`.
    pub object: String,
    /// Entries, one per professional account.
    #[serde(default)]
    pub entry: Vec<InstagramEntry>,
}

/// One account's messaging events.
#[derive(Debug, Clone, Deserialize)]
pub struct InstagramEntry {
    /// Instagram professional account ID.
    #[serde(default)]
    pub id: String,
    /// Messaging events.
    #[serde(default)]
    pub messaging: Vec<InstagramMessaging>,
}

/// A messaging event.
#[derive(Debug, Clone, Deserialize)]
pub struct InstagramMessaging {
    /// Sender.
    pub sender: InstagramParty,
    /// Recipient.
    pub recipient: InstagramParty,
    /// Message, absent for reads/reactions.
    #[serde(default)]
    pub message: Option<InstagramMessage>,
}

/// Sender or recipient.
#[derive(Debug, Clone, Deserialize)]
pub struct InstagramParty {
    /// Instagram-scoped ID.
    pub id: String,
}

/// Message block.
#[derive(Debug, Clone, Deserialize)]
pub struct InstagramMessage {
    /// Message ID.
    #[serde(default)]
    pub mid: Option<String>,
    /// Text, absent for attachments.
    #[serde(default)]
    pub text: Option<String>,
    /// `true` for copies of messages the business sent.
    #[serde(default)]
    pub is_echo: bool,
}

impl InstagramWebhook {
    /// Flattens the envelope into text messages, dropping echoes.
    #[must_use]
    pub fn messages(&self) -> Vec<InboundMessage> {
        let mut out = Vec::new();
        for entry in &self.entry {
            for event in &entry.messaging {
                let Some(message) = event.message.as_ref().filter(|m| !m.is_echo) else {
                    continue;
                };
                let Some(text) = message.text.as_ref().filter(|t| !t.trim().is_empty()) else {
                    continue;
                };
                out.push(InboundMessage {
                    platform: Platform::Instagram,
                    account_id: event.recipient.id.clone(),
                    sender_id: event.sender.id.clone(),
                    sender_name: None,
                    message_id: message.mid.clone(),
                    text: text.clone(),
                });
            }
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn whatsapp_text_messages_are_extracted() {
        let Ok(webhook) = serde_json::from_value::<WhatsAppWebhook>(json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "WABA",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "metadata": { "display_phone_number": "15550000000", "phone_number_id": "PN1" },
                        "contacts": [{ "profile": { "name": "Asha" }, "wa_id": "919900000001" }],
                        "messages": [
                            { "from": "919900000001", "id": "wamid.1", "timestamp": "1", "type": "text",
                              "text": { "body": "Is this in stock?" } },
                            { "from": "919900000001", "id": "wamid.2", "timestamp": "2", "type": "image",
                              "image": { "id": "img" } }
                        ]
                    }
                }]
            }]
        })) else {
            panic!("payload should parse");
        };

        let messages = webhook.messages();
        assert_eq!(messages.len(), 1);
        let Some(first) = messages.first() else {
            panic!("expected a message");
        };
        assert_eq!(first.platform, Platform::WhatsApp);
        assert_eq!(first.account_id, "PN1");
        assert_eq!(first.sender_name.as_deref(), Some("Asha"));
        assert_eq!(first.message_id.as_deref(), Some("wamid.1"));
        assert_eq!(first.text, "Is this in stock?");
    }

    #[test]
    fn whatsapp_status_changes_yield_nothing() {
        let Ok(webhook) = serde_json::from_value::<WhatsAppWebhook>(json!({
            "object": "whatsapp_business_account",
            "entry": [{ "id": "WABA", "changes": [{
                "field": "messages",
                "value": { "statuses": [{ "id": "wamid.9", "status": "delivered" }] }
            }]}]
        })) else {
            panic!("payload should parse");
        };
        assert!(webhook.messages().is_empty());
    }

    #[test]
    fn instagram_echoes_are_skipped() {
        let Ok(webhook) = serde_json::from_value::<InstagramWebhook>(json!({
            "object": "instagram",
            "entry": [{
                "id": "IGACCT",
                "time": 1,
                "messaging": [
                    { "sender": { "id": "cust" }, "recipient": { "id": "IGACCT" },
                      "message": { "mid": "m1", "text": "hello" } },
                    { "sender": { "id": "IGACCT" }, "recipient": { "id": "cust" },
                      "message": { "mid": "m2", "text": "hi!", "is_echo": true } },
                    { "sender": { "id": "cust" }, "recipient": { "id": "IGACCT" },
                      "read": { "mid": "m2" } }
                ]
            }]
        })) else {
            panic!("payload should parse");
        };

        let messages = webhook.messages();
        assert_eq!(messages.len(), 1);
        let Some(first) = messages.first() else {
            panic!("expected a message");
        };
        assert_eq!(first.sender_id, "cust");
        assert_eq!(first.account_id, "IGACCT");
        assert_eq!(first.message_id.as_deref(), Some("m1"));
    }
}
