// src/config/mod.rs
//! Tracker configuration: file paths, marketplace endpoint, cadence and
//! notifier settings. Resolution order:
//! 1) `$TRACKER_CONFIG_PATH`
//! 2) `config/tracker.toml`
//! 3) built-in defaults
//!
//! Credentials and notifier secrets always come from the environment.

pub mod credentials;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use credentials::CatalogCredentials;

pub const ENV_CONFIG_PATH: &str = "TRACKER_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/tracker.toml";
pub const ENV_MARKETPLACE: &str = "MARKETPLACE";
pub const ENV_WEBHOOK_URL: &str = "NOTIFY_WEBHOOK_URL";
pub const ENV_X_BEARER_TOKEN: &str = "X_BEARER_TOKEN";

pub const DEFAULT_MARKETPLACE: &str = "www.amazon.co.jp";

pub const MIN_INTERVAL_MINUTES: u64 = 1;
/// One week.
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Log rendered posts instead of sending them.
    pub dry_run: bool,
    /// Slack-style webhook; `$NOTIFY_WEBHOOK_URL` wins when set.
    pub webhook_url: Option<String>,
    #[serde(skip)]
    pub x_bearer_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub marketplace: String,
    /// Overrides the catalog host derived from `marketplace`.
    pub host: Option<String>,
    /// Overrides the signing region derived from `marketplace`.
    pub region: Option<String>,
    pub products_path: PathBuf,
    pub templates_path: PathBuf,
    pub interval_minutes: u64,
    pub batch_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub notify: NotifyConfig,
    #[serde(skip)]
    pub credentials: CatalogCredentials,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            marketplace: DEFAULT_MARKETPLACE.to_string(),
            host: None,
            region: None,
            products_path: PathBuf::from("tracking_products.jsonl"),
            templates_path: PathBuf::from("post_templates.json"),
            interval_minutes: 60,
            batch_delay_ms: 1_000,
            request_timeout_secs: 10,
            notify: NotifyConfig::default(),
            credentials: CatalogCredentials::default(),
        }
    }
}

impl TrackerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: TrackerConfig = toml::from_str(s).context("parsing tracker config")?;
        cfg.marketplace = cfg.marketplace.trim().to_ascii_lowercase();
        if cfg.marketplace.is_empty() {
            cfg.marketplace = DEFAULT_MARKETPLACE.to_string();
        }
        cfg.set_interval_minutes(cfg.interval_minutes);
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading tracker config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// File resolution per module docs, then environment overlay.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if p.exists() {
                Self::load_from(&p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn apply_env(&mut self) {
        if let Ok(m) = std::env::var(ENV_MARKETPLACE) {
            let m = m.trim().to_ascii_lowercase();
            if !m.is_empty() {
                self.marketplace = m;
            }
        }
        if let Ok(url) = std::env::var(ENV_WEBHOOK_URL) {
            if !url.trim().is_empty() {
                self.notify.webhook_url = Some(url.trim().to_string());
            }
        }
        self.notify.x_bearer_token = std::env::var(ENV_X_BEARER_TOKEN)
            .ok()
            .filter(|t| !t.trim().is_empty());
        self.credentials = CatalogCredentials::from_env();
    }

    /// Stores `minutes` clamped to the supported range.
    pub fn set_interval_minutes(&mut self, minutes: u64) {
        self.interval_minutes = minutes.clamp(MIN_INTERVAL_MINUTES, MAX_INTERVAL_MINUTES);
    }

    pub fn interval(&self) -> Duration {
        let minutes = self
            .interval_minutes
            .clamp(MIN_INTERVAL_MINUTES, MAX_INTERVAL_MINUTES);
        Duration::from_secs(minutes.saturating_mul(60))
    }

    pub fn catalog_host(&self) -> String {
        self.host
            .clone()
            .unwrap_or_else(|| marketplace_endpoint(&self.marketplace).0)
    }

    pub fn catalog_region(&self) -> String {
        self.region
            .clone()
            .unwrap_or_else(|| marketplace_endpoint(&self.marketplace).1.to_string())
    }
}

/// Catalog host and signing region for a marketplace domain.
pub fn marketplace_endpoint(marketplace: &str) -> (String, &'static str) {
    let region = match marketplace {
        "www.amazon.com" | "www.amazon.ca" | "www.amazon.com.br" | "www.amazon.com.mx" => {
            "us-east-1"
        }
        "www.amazon.co.jp" | "www.amazon.com.au" | "www.amazon.sg" => "us-west-2",
        "www.amazon.co.uk" | "www.amazon.de" | "www.amazon.fr" | "www.amazon.it"
        | "www.amazon.es" | "www.amazon.in" | "www.amazon.nl" | "www.amazon.se"
        | "www.amazon.pl" | "www.amazon.com.tr" | "www.amazon.ae" | "www.amazon.sa"
        | "www.amazon.eg" | "www.amazon.com.be" => "eu-west-1",
        _ => "us-east-1",
    };
    let host = match marketplace.strip_prefix("www.") {
        Some(rest) => format!("webservices.{rest}"),
        None => format!("webservices.{marketplace}"),
    };
    (host, region)
}
