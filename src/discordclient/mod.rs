use serde_json::json;
use types::DmChannel;
pub use types::{Attachment, Author, MessageCreate};
pub use wshandler::{WsHandler, WsHandlerImpl};

mod types;
mod wshandler;

pub const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";
const DEFAULT_API_URL: &str = "https://discord.com/api/v10";
const USER_AGENT: &str = "music-feedback-bot";

pub trait DiscordClient {
    fn send_direct_message(
        &self,
        user_id: u64,
        content: &str,
    ) -> impl std::future::Future<Output = Result<(), anyhow::Error>> + Send;

    fn send_channel_message(
        &self,
        channel_id: u64,
        content: &str,
    ) -> impl std::future::Future<Output = Result<(), anyhow::Error>> + Send;

    fn delete_message(
        &self,
        channel_id: u64,
        message_id: u64,
    ) -> impl std::future::Future<Output = Result<(), anyhow::Error>> + Send;

    fn get_websocket_handler(
        &self,
    ) -> impl std::future::Future<Output = Result<impl WsHandler + Send, anyhow::Error>> + Send;
}

pub struct DiscordEndpoints {
    api: String,
    gateway: String,
}

pub struct DiscordReqwestClient {
    endpoints: DiscordEndpoints,
    token: String,
    client: reqwest::Client,
}

impl Default for DiscordEndpoints {
    fn default() -> Self {
        Self {
            api: DEFAULT_API_URL.to_string(),
            gateway: DEFAULT_GATEWAY_URL.to_string(),
        }
    }
}

impl DiscordReqwestClient {
    pub fn new_with_token(token: &str) -> Self {
        DiscordReqwestClient::new_with_url_and_token(DiscordEndpoints::default(), token)
    }

    pub fn new_with_url_and_token(endpoints: DiscordEndpoints, token: &str) -> Self {
        Self {
            endpoints,
            token: token.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.endpoints.api, path))
            .header(http::header::AUTHORIZATION, format!("Bot {}", self.token))
            .header(http::header::USER_AGENT, USER_AGENT)
    }

    async fn open_dm_channel(&self, user_id: u64) -> Result<u64, anyhow::Error> {
        Ok(self
            .request(reqwest::Method::POST, "/users/@me/channels")
            .json(&json!({ "recipient_id": user_id.to_string() }))
            .send()
            .await?
            .error_for_status()?
            .json::<DmChannel>()
            .await?
            .id)
    }
}

impl DiscordClient for DiscordReqwestClient {
    async fn send_direct_message(&self, user_id: u64, content: &str) -> Result<(), anyhow::Error> {
        let channel_id = self.open_dm_channel(user_id).await?;
        self.send_channel_message(channel_id, content).await
    }

    async fn send_channel_message(
        &self,
        channel_id: u64,
        content: &str,
    ) -> Result<(), anyhow::Error> {
        self.request(
            reqwest::Method::POST,
            &format!("/channels/{}/messages", channel_id),
        )
        .json(&json!({ "content": content }))
        .send()
        .await?
        .error_for_status()?;

        Ok(())
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), anyhow::Error> {
        self.request(
            reqwest::Method::DELETE,
            &format!("/channels/{}/messages/{}", channel_id, message_id),
        )
        .send()
        .await?
        .error_for_status()?;

        Ok(())
    }

    async fn get_websocket_handler(&self) -> Result<WsHandlerImpl, anyhow::Error> {
        WsHandlerImpl::connect(&self.endpoints.gateway, &self.token).await
    }
}

#[cfg(test)]
pub use wshandler::MockWsHandler;

/// Everything the bot sent out, in order
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    DirectMessage { user_id: u64, content: String },
    ChannelMessage { channel_id: u64, content: String },
    Delete { channel_id: u64, message_id: u64 },
}

#[cfg(test)]
#[derive(Default)]
pub struct MockDiscordClient {
    pub sent: std::sync::Mutex<Vec<Outbound>>,
    pub fail_direct_messages: bool,
    pub fail_channel_messages: bool,
}

#[cfg(test)]
impl MockDiscordClient {
    pub fn outbound(&self) -> Vec<Outbound> {
        self.sent.lock().expect("mock lock is not poisoned").clone()
    }

    fn record(&self, outbound: Outbound) {
        self.sent
            .lock()
            .expect("mock lock is not poisoned")
            .push(outbound);
    }
}

#[cfg(test)]
impl DiscordClient for MockDiscordClient {
    async fn send_direct_message(&self, user_id: u64, content: &str) -> Result<(), anyhow::Error> {
        if self.fail_direct_messages {
            return Err(anyhow::anyhow!("mock error: user has direct messages closed"));
        }
        self.record(Outbound::DirectMessage {
            user_id,
            content: content.to_string(),
        });
        Ok(())
    }

    async fn send_channel_message(
        &self,
        channel_id: u64,
        content: &str,
    ) -> Result<(), anyhow::Error> {
        if self.fail_channel_messages {
            return Err(anyhow::anyhow!("mock error: missing access"));
        }
        self.record(Outbound::ChannelMessage {
            channel_id,
            content: content.to_string(),
        });
        Ok(())
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), anyhow::Error> {
        self.record(Outbound::Delete {
            channel_id,
            message_id,
        });
        Ok(())
    }

    async fn get_websocket_handler(&self) -> Result<impl WsHandler + Send, anyhow::Error> {
        Ok(MockWsHandler::default())
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use crate::discordclient::{DiscordClient, DiscordReqwestClient};

    #[ignore = "This is a live environment test, which requires live credentials"]
    #[tokio::test]
    async fn test_live_send_channel_message() {
        let token = env::var("TOKEN_BOT").expect("please set TOKEN_BOT");
        let channel_id = env::var("ID_CH__FEEDBACK_LINKS")
            .expect("please set ID_CH__FEEDBACK_LINKS")
            .parse::<u64>()
            .expect("channel id is numeric");
        let client = DiscordReqwestClient::new_with_token(&token);

        client
            .send_channel_message(channel_id, "live test message")
            .await
            .expect("should be able to perform the call");
    }
}
