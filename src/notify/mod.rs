// src/notify/mod.rs
pub mod render;
pub mod webhook;
pub mod x;

use anyhow::{anyhow, Result};

use crate::config::NotifyConfig;

pub use render::{Renderer, MAX_POST_CHARS};
pub use webhook::WebhookNotifier;
pub use x::XNotifier;

/// Sends a finished post body. Failures are reported, never retried here.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn post(&self, text: &str) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Dry-run channel: logs the body.
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn post(&self, text: &str) -> Result<()> {
        tracing::info!(chars = text.chars().count(), "dry-run post:\n{text}");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

// --- Test helper ---
/// Keeps every body it is given; optionally fails each call after recording.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub posts: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn post(&self, text: &str) -> Result<()> {
        self.posts
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(text.to_string());
        if self.fail {
            return Err(anyhow!("recording notifier set to fail"));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Fans one post out to every configured channel.
pub struct NotifierMux {
    channels: Vec<Box<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    /// X when a bearer token is present, webhook when a URL is present, the
    /// log channel when neither is (or in dry-run mode).
    pub fn from_config(cfg: &NotifyConfig) -> Self {
        if cfg.dry_run {
            return Self::new(vec![Box::new(LogNotifier)]);
        }
        let mut channels: Vec<Box<dyn Notifier>> = Vec::new();
        if let Some(token) = &cfg.x_bearer_token {
            channels.push(Box::new(XNotifier::new(token.clone())));
        }
        if let Some(url) = &cfg.webhook_url {
            channels.push(Box::new(WebhookNotifier::new(url.clone())));
        }
        if channels.is_empty() {
            tracing::warn!("no notification channel configured; posts will only be logged");
            channels.push(Box::new(LogNotifier));
        }
        Self::new(channels)
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }
}

#[async_trait::async_trait]
impl Notifier for NotifierMux {
    /// Every channel is attempted; the result is an error if any failed.
    async fn post(&self, text: &str) -> Result<()> {
        let mut failed = Vec::new();
        for ch in &self.channels {
            if let Err(e) = ch.post(text).await {
                tracing::warn!(channel = ch.name(), error = ?e, "notification failed");
                failed.push(ch.name());
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("notification failed on: {}", failed.join(", ")))
        }
    }

    fn name(&self) -> &'static str {
        "mux"
    }
}
