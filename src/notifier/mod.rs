use std::sync::Arc;

use crate::discordclient::DiscordClient;

const POSTING_INSTRUCTIONS: &str = "Make sure you're using the correct method to post feedback:\n\
*@user*<feedback>\n\
Feedback content here.\n\
You can check your score by sending the command below:\n`!#score`";

pub fn score_reply(points: i64) -> String {
    format!("You have a current score of {} point(s).", points)
}

pub const NO_SCORE_REPLY: &str =
    "You don't have a score because you haven't participated yet!!";

pub fn insufficient_points_notice() -> String {
    format!(
        "Hey pal, you don't have enough points to post your track. {}",
        POSTING_INSTRUCTIONS
    )
}

pub fn unregistered_notice() -> String {
    format!(
        "Hey pal, you need to leave some feedback before you can post your track. {}",
        POSTING_INSTRUCTIONS
    )
}

/// Formats the re-share posted into the announcement channel
pub fn feedback_request(display_name: &str, body: &str) -> String {
    format!("```md\n<feedback-request>[{display_name}]\n```\n{body}")
}

pub struct Notifier<C: DiscordClient> {
    client: Arc<C>,
    announcement_channel_id: u64,
}

impl<C: DiscordClient> Clone for Notifier<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            announcement_channel_id: self.announcement_channel_id,
        }
    }
}

impl<C: DiscordClient + Send + Sync> Notifier<C> {
    pub fn new(client: Arc<C>, announcement_channel_id: u64) -> Self {
        Self {
            client,
            announcement_channel_id,
        }
    }

    /// Best-effort, a failed send is only logged
    pub async fn direct_message(&self, user_id: u64, content: &str) {
        if let Err(e) = self.client.send_direct_message(user_id, content).await {
            log::warn!("could not direct message {}: {}", user_id, e);
        }
    }

    /// Best-effort, a failed delete is only logged
    pub async fn delete(&self, channel_id: u64, message_id: u64) {
        if let Err(e) = self.client.delete_message(channel_id, message_id).await {
            log::warn!("could not delete message {}: {}", message_id, e);
        }
    }

    pub async fn announce(&self, display_name: &str, body: &str) -> Result<(), anyhow::Error> {
        self.client
            .send_channel_message(
                self.announcement_channel_id,
                &feedback_request(display_name, body),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{feedback_request, Notifier};
    use crate::discordclient::{MockDiscordClient, Outbound};

    #[test]
    fn test_feedback_request_template() {
        assert_eq!(
            feedback_request("lowend", "https://soundcloud.com/lowend/demo"),
            "```md\n<feedback-request>[lowend]\n```\nhttps://soundcloud.com/lowend/demo"
        );
    }

    #[tokio::test]
    async fn test_announce_goes_to_announcement_channel() {
        let client = Arc::new(MockDiscordClient::default());
        let notifier = Notifier::new(client.clone(), 77);

        notifier
            .announce("lowend", "https://cdn.example/track.mp3")
            .await
            .expect("can announce");

        assert_eq!(
            client.outbound(),
            vec![Outbound::ChannelMessage {
                channel_id: 77,
                content: feedback_request("lowend", "https://cdn.example/track.mp3"),
            }]
        );
    }

    #[tokio::test]
    async fn test_failed_direct_message_is_swallowed() {
        let client = Arc::new(MockDiscordClient {
            fail_direct_messages: true,
            ..Default::default()
        });
        let notifier = Notifier::new(client.clone(), 77);

        notifier.direct_message(1, "hello").await;

        assert!(client.outbound().is_empty());
    }
}
