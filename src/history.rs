//! history.rs: append-only price log kept per tracked product.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Local wall-clock form written by older tracker versions.
pub const LEGACY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: Option<i64>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// RFC 3339, or the legacy `YYYY-MM-DD HH:MM:SS` form read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, LEGACY_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp `{raw}`")))
}

/// Observations ordered by time. Entries are only ever appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceHistory {
    points: Vec<PricePoint>,
}

impl PriceHistory {
    pub fn starting_at(price: Option<i64>, ts: DateTime<Utc>) -> Self {
        Self {
            points: vec![PricePoint {
                price,
                timestamp: ts,
            }],
        }
    }

    /// An observation older than the last one is clamped to the last
    /// timestamp so ordering holds even if the clock steps back.
    pub fn push(&mut self, price: Option<i64>, ts: DateTime<Utc>) {
        let timestamp = match self.points.last() {
            Some(last) if last.timestamp > ts => last.timestamp,
            _ => ts,
        };
        self.points.push(PricePoint { price, timestamp });
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

}
