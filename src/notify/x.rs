// src/notify/x.rs
use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::Notifier;

pub const X_POST_ENDPOINT: &str = "https://api.twitter.com/2/tweets";
const X_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts to X through the v2 API with an OAuth 2.0 user-context bearer token.
pub struct XNotifier {
    bearer_token: String,
    client: Client,
}

#[derive(Serialize)]
struct CreatePost<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct CreatePostResponse {
    data: Option<CreatedPost>,
}

#[derive(Deserialize)]
struct CreatedPost {
    id: String,
}

impl XNotifier {
    pub fn new(bearer_token: String) -> Self {
        Self {
            bearer_token,
            client: Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for XNotifier {
    async fn post(&self, text: &str) -> Result<()> {
        let resp = self
            .client
            .post(X_POST_ENDPOINT)
            .timeout(X_TIMEOUT)
            .bearer_auth(&self.bearer_token)
            .json(&CreatePost { text })
            .send()
            .await
            .context("x post")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(anyhow!("X API returned {status}: {snippet}"));
        }

        let created: CreatePostResponse = resp.json().await.context("x response body")?;
        match created.data {
            Some(p) => tracing::debug!(post_id = %p.id, "posted to X"),
            None => tracing::warn!("X accepted the post but returned no id"),
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "x"
    }
}
