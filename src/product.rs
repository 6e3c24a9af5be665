// src/product.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{with_affiliate_tag, ItemRecord};
use crate::history::{deserialize_timestamp, PriceHistory};

/// A watched catalog item and its last observed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedProduct {
    pub asin: String,
    pub name: String,
    pub url: String,
    pub last_price: Option<i64>,
    pub last_availability: Option<String>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub last_checked: DateTime<Utc>,
    #[serde(default)]
    pub price_history: PriceHistory,
}

impl TrackedProduct {
    /// First observation of an item: history starts with one entry.
    pub fn from_record(
        asin: &str,
        record: &ItemRecord,
        partner_tag: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            asin: asin.to_string(),
            name: record.title.clone(),
            url: with_affiliate_tag(&record.detail_url, partner_tag),
            last_price: record.price,
            last_availability: record.availability.clone(),
            last_checked: now,
            price_history: PriceHistory::starting_at(record.price, now),
        }
    }
}
