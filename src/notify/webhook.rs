use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use super::Notifier;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// Slack-compatible incoming webhook: `{"text": "..."}`.
pub struct WebhookNotifier {
    webhook_url: String,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            webhook_url: url,
            client: Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn post(&self, text: &str) -> Result<()> {
        let body = serde_json::json!({ "text": text });

        self.client
            .post(&self.webhook_url)
            .timeout(WEBHOOK_TIMEOUT)
            .json(&body)
            .send()
            .await
            .context("webhook post")?
            .error_for_status()
            .context("webhook non-2xx")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}
