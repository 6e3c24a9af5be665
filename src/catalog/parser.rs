// src/catalog/parser.rs
//! Normalizes a `GetItems` response into flat [`ItemRecord`]s.
//!
//! Missing substructures never fail the batch: each field falls back to its
//! own sentinel. Only a document that is not a JSON object is rejected.

use serde_json::Value;

use super::types::{ItemBatch, ItemRecord, UNKNOWN};
use crate::error::{Result, TrackerError};

/// Lenient entry point: a malformed document is logged and yields no items.
pub fn parse_get_items(body: &str, marketplace: &str) -> ItemBatch {
    match try_parse_get_items(body, marketplace) {
        Ok(items) => items,
        Err(e) => {
            tracing::error!(error = %e, "catalog response unusable; treating batch as empty");
            ItemBatch::new()
        }
    }
}

pub fn try_parse_get_items(body: &str, marketplace: &str) -> Result<ItemBatch> {
    let doc: Value = serde_json::from_str(body.trim())?;
    if !doc.is_object() {
        return Err(TrackerError::MalformedResponse(
            "top-level document is not an object".into(),
        ));
    }

    log_provider_errors(&doc);

    let mut out = ItemBatch::new();
    let Some(items) = doc
        .get("ItemsResult")
        .and_then(|r| r.get("Items"))
        .and_then(Value::as_array)
    else {
        return Ok(out);
    };

    for item in items {
        let Some(asin) = item.get("ASIN").and_then(Value::as_str) else {
            tracing::warn!("catalog item without ASIN skipped");
            continue;
        };
        out.insert(asin.to_string(), normalize_item(asin, item, marketplace));
    }
    Ok(out)
}

/// One item's nested offer graph → flat record.
pub fn normalize_item(asin: &str, item: &Value, marketplace: &str) -> ItemRecord {
    let listing = item
        .pointer("/Offers/Listings")
        .and_then(Value::as_array)
        .and_then(|l| l.first());

    let price = listing
        .and_then(|l| l.pointer("/Price/Amount"))
        .and_then(Value::as_f64)
        .map(|amount| amount.floor() as i64);

    let availability = listing
        .and_then(|l| l.pointer("/Availability/Message"))
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN)
        .to_string();

    let prime_eligible = listing
        .and_then(|l| l.pointer("/DeliveryInfo/IsPrimeEligible"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let title = item
        .pointer("/ItemInfo/Title/DisplayValue")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN)
        .to_string();

    let detail_url = item
        .get("DetailPageURL")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("https://{marketplace}/dp/{asin}"));

    ItemRecord {
        title,
        price,
        availability: Some(availability),
        detail_url,
        prime_eligible,
    }
}

fn log_provider_errors(doc: &Value) {
    let Some(errors) = doc.get("Errors").and_then(Value::as_array) else {
        return;
    };
    for e in errors {
        tracing::warn!(
            code = e.get("Code").and_then(|v| v.as_str()).unwrap_or_default(),
            message = e.get("Message").and_then(|v| v.as_str()).unwrap_or_default(),
            "catalog reported item error"
        );
    }
}
