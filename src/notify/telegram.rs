use super::Notifier;
use crate::error::NotifyError;
use crate::target::Target;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Sends alerts through the Telegram Bot API (`sendMessage`).
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

impl TelegramNotifier {
    pub fn new(api_base: &str, bot_token: String, chat_id: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token,
            chat_id,
        }
    }

    fn send_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, target: &Target) -> Result<(), NotifyError> {
        let text = target.alert_message();
        let resp = self
            .client
            .post(self.send_url())
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text: &text,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::DeliveryFailed(format!("{}: {}", status, body)));
        }

        tracing::debug!(symbol = %target.symbol, chat_id = %self.chat_id, "telegram alert delivered");
        Ok(())
    }
}
