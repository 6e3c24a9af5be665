// src/catalog/client.rs
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::histogram;
use reqwest::Client;
use serde::Serialize;

use super::parser::parse_get_items;
use super::signer::RequestSigner;
use super::types::{CatalogProvider, ItemBatch};
use super::{GET_ITEMS_PATH, MAX_BATCH, RESOURCES};
use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemsRequest<'a> {
    pub item_ids: &'a [String],
    pub resources: &'a [&'a str],
    pub partner_tag: &'a str,
    pub partner_type: &'a str,
    pub marketplace: &'a str,
}

/// Serialized exactly once; the same bytes are hashed and sent.
pub fn get_items_payload(ids: &[String], partner_tag: &str, marketplace: &str) -> Result<String> {
    let req = GetItemsRequest {
        item_ids: ids,
        resources: RESOURCES,
        partner_tag,
        partner_type: "Associates",
        marketplace,
    };
    Ok(serde_json::to_string(&req)?)
}

/// Signed HTTP transport for `GetItems`.
pub struct PaApiClient {
    signer: RequestSigner,
    host: String,
    marketplace: String,
    partner_tag: String,
    client: Client,
    timeout: Duration,
}

impl PaApiClient {
    pub fn new(
        signer: RequestSigner,
        host: impl Into<String>,
        marketplace: impl Into<String>,
        partner_tag: impl Into<String>,
    ) -> Self {
        Self {
            signer,
            host: host.into(),
            marketplace: marketplace.into(),
            partner_tag: partner_tag.into(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Fails with `Configuration` when credentials are incomplete.
    pub fn from_config(cfg: &TrackerConfig) -> Result<Self> {
        let signer = RequestSigner::new(&cfg.credentials, cfg.catalog_region())?;
        let tag = cfg
            .credentials
            .partner_tag()
            .ok_or_else(|| TrackerError::Configuration("missing PARTNER_TAG".into()))?
            .to_string();
        Ok(Self::new(signer, cfg.catalog_host(), cfg.marketplace.clone(), tag)
            .with_timeout(cfg.request_timeout_secs))
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs.max(1));
        self
    }
}

#[async_trait]
impl CatalogProvider for PaApiClient {
    async fn get_items(&self, ids: &[String]) -> Result<ItemBatch> {
        if ids.is_empty() {
            return Ok(ItemBatch::new());
        }
        if ids.len() > MAX_BATCH {
            return Err(TrackerError::Configuration(format!(
                "batch of {} ids exceeds limit of {MAX_BATCH}",
                ids.len()
            )));
        }

        let payload = get_items_payload(ids, &self.partner_tag, &self.marketplace)?;
        let headers = self.signer.sign(&self.host, GET_ITEMS_PATH, &payload);

        let url = format!("https://{}{}", self.host, GET_ITEMS_PATH);
        let mut req = self.client.post(&url).timeout(self.timeout);
        for (name, value) in headers.iter() {
            // reqwest derives Host from the URL.
            if name != "host" {
                req = req.header(name, value);
            }
        }

        let t0 = Instant::now();
        let resp = req.body(payload).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        histogram!("catalog_request_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        if !status.is_success() {
            let snippet: String = body.chars().take(200).collect();
            return Err(TrackerError::Transport(format!(
                "catalog returned {status}: {snippet}"
            )));
        }

        Ok(parse_get_items(&body, &self.marketplace))
    }

    fn name(&self) -> &'static str {
        "pa-api"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_uses_provider_field_names() {
        let ids = vec!["B0AAAAAAA1".to_string(), "B0AAAAAAA2".to_string()];
        let body = get_items_payload(&ids, "tracker-22", "www.amazon.co.jp").unwrap();
        let v: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(v["ItemIds"][1], "B0AAAAAAA2");
        assert_eq!(v["PartnerTag"], "tracker-22");
        assert_eq!(v["PartnerType"], "Associates");
        assert_eq!(v["Marketplace"], "www.amazon.co.jp");
        assert_eq!(v["Resources"].as_array().unwrap().len(), RESOURCES.len());
    }

    #[test]
    fn from_config_requires_credentials() {
        let cfg = TrackerConfig::default();
        assert!(matches!(
            PaApiClient::from_config(&cfg),
            Err(TrackerError::Configuration(_))
        ));
    }
}
