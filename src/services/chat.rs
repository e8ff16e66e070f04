use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub channel: String,
    pub username: String,
    pub text: String,
    pub icon_emoji: String,
}

#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn send(&self, message: ChatMessage) -> Result<()>;
}

/// Slack-compatible incoming webhook. With no URL configured the sink only
/// logs, which keeps development setups quiet.
pub struct SlackWebhook {
    client: reqwest::Client,
    webhook_url: String,
}

impl SlackWebhook {
    pub fn new(webhook_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }
}

#[async_trait]
impl ChatSink for SlackWebhook {
    async fn send(&self, message: ChatMessage) -> Result<()> {
        log::info!(
            "Sending chat message to {}: {}",
            message.channel,
            message.text
        );
        if self.webhook_url.is_empty() {
            return Ok(());
        }

        self.client
            .post(&self.webhook_url)
            .json(&message)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
