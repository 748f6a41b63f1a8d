use std::fmt;

use anyhow::{anyhow, Result};
use reqwest::Url;
use serde_json::json;

/// Discord rejects webhook content longer than this.
const DISCORD_MAX_MESSAGE_LENGTH: usize = 2000;

/// Message content that fits the webhook character limit.
#[derive(Clone, Debug, PartialEq)]
pub struct DiscordSafeMessage(String);

impl DiscordSafeMessage {
    pub fn new(input: &str) -> Self {
        if input.chars().count() > DISCORD_MAX_MESSAGE_LENGTH {
            tracing::warn!(
                "discord message too long, truncating to {} characters",
                DISCORD_MAX_MESSAGE_LENGTH
            );
            Self(input.chars().take(DISCORD_MAX_MESSAGE_LENGTH).collect())
        } else {
            Self(input.to_string())
        }
    }
}

impl fmt::Display for DiscordSafeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone)]
pub struct DiscordWebhook {
    client: reqwest::Client,
    url: Url,
}

impl DiscordWebhook {
    pub fn new(client: reqwest::Client, url: Url) -> Self {
        Self { client, url }
    }

    async fn send_message_request(&self, message: &DiscordSafeMessage) -> Result<()> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&json!({ "content": &message.0 }))
            .send()
            .await
            // The webhook url is the credential, keep it out of errors.
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(anyhow!(
            "failed to send discord message, status: {}, body: {}",
            status,
            body
        ))
    }

    /// Posts a message to the webhook. Failures are logged, not retried.
    pub async fn send_message(&self, message: &DiscordSafeMessage) {
        match self.send_message_request(message).await {
            Ok(_) => tracing::debug!(%message, "sent discord message"),
            Err(err) => tracing::error!(%message, ?err, "failed to send discord message"),
        }
    }
}
