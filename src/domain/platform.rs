//! Messaging platforms the gateway receives from and sends to.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A Meta messaging channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Instagram Direct messages.
    Instagram,
    /// WhatsApp Business Cloud API.
    #[serde(rename = "whatsapp")]
    WhatsApp,
}

str_enum!(Platform { Instagram => "instagram", WhatsApp => "whatsapp" });

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_match_serde() {
        for platform in [Platform::Instagram, Platform::WhatsApp] {
            let json = serde_json::to_string(&platform).unwrap_or_default();
            assert_eq!(json, format!("\"{}\"", platform.as_str()));
            assert_eq!(platform.as_str().parse::<Platform>(), Ok(platform));
        }
    }

    #[test]
    fn unknown_platform_is_rejected() {
        assert!("telegram".parse::<Platform>().is_err());
    }
}
