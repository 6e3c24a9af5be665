//! Error taxonomy for the catalog → detect → render pipeline.
//!
//! Every variant is recoverable at batch or product granularity; the tracker
//! logs and moves on. Only `Configuration` at startup leaves the core unusable.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    /// Missing or blank credentials / partner tag; signing cannot proceed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Catalog call failed or returned a non-success status.
    #[error("transport error: {0}")]
    Transport(String),

    /// Top-level catalog document could not be parsed.
    #[error("malformed catalog response: {0}")]
    MalformedResponse(String),

    /// Item id absent from a batch's fresh results.
    #[error("item {0} missing from catalog results")]
    LookupMiss(String),
}

impl From<reqwest::Error> for TrackerError {
    fn from(e: reqwest::Error) -> Self {
        TrackerError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(e: serde_json::Error) -> Self {
        TrackerError::MalformedResponse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
