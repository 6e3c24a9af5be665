//! # Change Detector
//! Compares a fresh catalog record against the last observed state of a
//! tracked product, yields typed change events and updates the product.
//!
//! This is the only code that mutates persisted product state. It runs once
//! per product per cycle, sequentially.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{ItemBatch, ItemRecord};
use crate::error::{Result, TrackerError};
use crate::product::TrackedProduct;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeEvent {
    PriceChanged {
        old: i64,
        new: i64,
        /// `new - old`
        delta_abs: i64,
        /// Signed; `0.0` when the old price was zero.
        delta_percent: f64,
        direction: Direction,
    },
    AvailabilityChanged {
        old: String,
        new: String,
    },
}

impl ChangeEvent {
    pub fn price(old: i64, new: i64) -> Self {
        let delta_abs = new - old;
        let delta_percent = if old > 0 {
            delta_abs as f64 * 100.0 / old as f64
        } else {
            0.0
        };
        let direction = if delta_abs > 0 {
            Direction::Up
        } else {
            Direction::Down
        };
        ChangeEvent::PriceChanged {
            old,
            new,
            delta_abs,
            delta_percent,
            direction,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::PriceChanged { .. } => "price",
            ChangeEvent::AvailabilityChanged { .. } => "availability",
        }
    }
}

/// Diff `product` against `fresh`. Events come out price first, then
/// availability. State is only touched when at least one event fired.
pub fn detect_changes(
    product: &mut TrackedProduct,
    fresh: &ItemRecord,
    now: DateTime<Utc>,
) -> Vec<ChangeEvent> {
    let mut events = Vec::new();

    if let (Some(old), Some(new)) = (product.last_price, fresh.price) {
        if old != new {
            let ev = ChangeEvent::price(old, new);
            tracing::info!(asin = %product.asin, old, new, "price change detected");
            product.price_history.push(Some(new), now);
            events.push(ev);
        }
    }

    if let (Some(old), Some(new)) = (&product.last_availability, &fresh.availability) {
        if old != new {
            tracing::info!(asin = %product.asin, %old, %new, "availability change detected");
            events.push(ChangeEvent::AvailabilityChanged {
                old: old.clone(),
                new: new.clone(),
            });
        }
    }

    if events.is_empty() {
        tracing::debug!(asin = %product.asin, "no change");
    } else {
        product.last_price = fresh.price;
        product.last_availability = fresh.availability.clone();
        product.last_checked = now;
    }

    events
}

/// Looks the product up in `batch` first. A miss leaves the product untouched.
pub fn detect_in_batch(
    product: &mut TrackedProduct,
    batch: &ItemBatch,
    now: DateTime<Utc>,
) -> Result<Vec<ChangeEvent>> {
    let fresh = batch
        .get(&product.asin)
        .ok_or_else(|| TrackerError::LookupMiss(product.asin.clone()))?;
    Ok(detect_changes(product, fresh, now))
}
