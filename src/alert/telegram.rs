//! Telegram delivery channel
//!
//! Delivery is fire-and-forget: a failure is logged by the caller and never
//! rolls back state, otherwise a flaky channel would re-send the same alert
//! every poll.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Delivery failures
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("telegram request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("telegram rejected the message: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("telegram credentials missing: set {0}")]
    MissingCredentials(String),
}

/// Where confirmed alerts are handed off to
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, text: &str) -> Result<(), DeliveryError>;
}

/// Telegram sendMessage configuration
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    /// Deliver without a notification sound
    pub silent: bool,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

pub struct TelegramSender {
    config: TelegramConfig,
    client: reqwest::Client,
}

impl TelegramSender {
    pub fn new(config: TelegramConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .build()?;
        Ok(Self { config, client })
    }

    /// Read credentials from the configured environment variables.
    pub fn from_env(
        token_env: &str,
        chat_env: &str,
        silent: bool,
    ) -> Result<TelegramConfig, DeliveryError> {
        let bot_token = std::env::var(token_env)
            .map_err(|_| DeliveryError::MissingCredentials(token_env.to_string()))?;
        let chat_id = std::env::var(chat_env)
            .map_err(|_| DeliveryError::MissingCredentials(chat_env.to_string()))?;
        Ok(TelegramConfig {
            bot_token,
            chat_id,
            silent,
            connect_timeout: Duration::from_secs(3),
            read_timeout: Duration::from_secs(10),
        })
    }
}

#[async_trait]
impl AlertSink for TelegramSender {
    async fn deliver(&self, text: &str) -> Result<(), DeliveryError> {
        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.config.bot_token
        );
        let payload = json!({
            "chat_id": self.config.chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
            "disable_notification": self.config.silent,
        });

        let response = self.client.post(&url).json(&payload).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status,
                body: body.chars().take(300).collect(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_missing_credentials() {
        let result = TelegramSender::from_env("OW_TEST_NO_SUCH_TOKEN", "OW_TEST_NO_SUCH_CHAT", false);
        assert!(matches!(result, Err(DeliveryError::MissingCredentials(_))));
    }
}
