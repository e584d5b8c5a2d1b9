//! Partial definition of the gateway and REST payloads the bot reads

use serde::{Deserialize, Deserializer, Serialize};

/// Discord sends snowflake ids as JSON strings
fn snowflake<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse::<u64>().map_err(serde::de::Error::custom)
}

fn optional_snowflake<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u64>, D::Error> {
    Option::<String>::deserialize(deserializer)?
        .map(|raw| raw.parse::<u64>().map_err(serde::de::Error::custom))
        .transpose()
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Author {
    #[serde(deserialize_with = "snowflake")]
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl Author {
    /// "0" is what migrated accounts without a discriminator report
    pub fn discriminator(&self) -> Option<&str> {
        self.discriminator
            .as_deref()
            .filter(|disc| !disc.is_empty() && *disc != "0")
    }

    /// The server-wide display name, falling back to the username
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }

    pub fn tag(&self) -> String {
        match self.discriminator() {
            Some(disc) => format!("{}#{}", self.username, disc),
            None => self.username.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MessageCreate {
    #[serde(deserialize_with = "snowflake")]
    pub id: u64,
    #[serde(deserialize_with = "snowflake")]
    pub channel_id: u64,
    #[serde(default, deserialize_with = "optional_snowflake")]
    pub guild_id: Option<u64>,
    pub author: Author,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub mentions: Vec<Author>,
}

impl MessageCreate {
    pub fn is_direct_message(&self) -> bool {
        self.guild_id.is_none()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub(super) struct GatewayPayload {
    pub(super) op: u8,
    #[serde(default)]
    pub(super) d: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) s: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) t: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Hello {
    pub(super) heartbeat_interval: u64,
}

#[derive(Debug, Deserialize)]
pub(super) struct DmChannel {
    #[serde(deserialize_with = "snowflake")]
    pub(super) id: u64,
}

#[cfg(test)]
mod tests {
    use super::MessageCreate;

    #[test]
    fn test_message_create_from_gateway_json() {
        let json = r#"{
            "id": "1180000000000000001",
            "channel_id": "1180000000000000002",
            "guild_id": "1180000000000000003",
            "author": { "id": "42", "username": "lowend", "discriminator": "0420" },
            "content": "<@7><feedback> nice",
            "attachments": [{ "id": "5", "filename": "track.mp3", "url": "https://cdn.example/track.mp3", "size": 10 }],
            "mentions": [{ "id": "7", "username": "highend", "discriminator": "0" }],
            "tts": false
        }"#;

        let message: MessageCreate = serde_json::from_str(json).expect("can parse message");
        assert_eq!(message.id, 1180000000000000001);
        assert_eq!(message.guild_id, Some(1180000000000000003));
        assert!(!message.is_direct_message());
        assert_eq!(message.author.tag(), "lowend#0420");
        assert_eq!(message.mentions[0].tag(), "highend");
        assert_eq!(message.author.display_name(), "lowend");
        assert_eq!(message.attachments[0].filename, "track.mp3");
    }

    #[test]
    fn test_direct_message_has_no_guild() {
        let json = r#"{
            "id": "1", "channel_id": "2",
            "author": { "id": "42", "username": "lowend", "global_name": "Low End" },
            "content": "!#score"
        }"#;

        let message: MessageCreate = serde_json::from_str(json).expect("can parse message");
        assert!(message.is_direct_message());
        assert_eq!(message.author.display_name(), "Low End");
        assert!(message.attachments.is_empty());
        assert!(message.mentions.is_empty());
    }
}
