// src/catalog/types.rs
use std::collections::HashMap;

use crate::error::Result;

/// Stand-in for a title or availability label the catalog did not return.
pub const UNKNOWN: &str = "unknown";

/// Flat, normalized view of one catalog item.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ItemRecord {
    pub title: String,
    /// Floored to integer minor units.
    pub price: Option<i64>,
    pub availability: Option<String>,
    pub detail_url: String,
    pub prime_eligible: bool,
}

pub type ItemBatch = HashMap<String, ItemRecord>;

/// Source of fresh item records, one call per batch of at most
/// [`crate::catalog::MAX_BATCH`] ids.
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn get_items(&self, ids: &[String]) -> Result<ItemBatch>;
    fn name(&self) -> &'static str;
}
