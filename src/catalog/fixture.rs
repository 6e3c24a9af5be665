// src/catalog/fixture.rs
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::parser::parse_get_items;
use super::types::{CatalogProvider, ItemBatch};
use crate::error::{Result, TrackerError};

enum Canned {
    Body(String),
    Transport(String),
}

/// Replays canned `GetItems` bodies in order, through the real parser.
/// Once the queue is exhausted every call yields an empty batch.
pub struct FixtureCatalog {
    marketplace: String,
    queue: Mutex<VecDeque<Canned>>,
    calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl FixtureCatalog {
    pub fn new(marketplace: impl Into<String>) -> Self {
        Self {
            marketplace: marketplace.into(),
            queue: Mutex::new(VecDeque::new()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn from_fixture(body: &str) -> Self {
        Self::new("www.amazon.co.jp").with_body(body)
    }

    pub fn with_body(self, body: impl Into<String>) -> Self {
        self.lock_queue().push_back(Canned::Body(body.into()));
        self
    }

    pub fn with_transport_error(self, msg: impl Into<String>) -> Self {
        self.lock_queue().push_back(Canned::Transport(msg.into()));
        self
    }

    /// Ids requested so far, one entry per call.
    pub fn calls(&self) -> Arc<Mutex<Vec<Vec<String>>>> {
        Arc::clone(&self.calls)
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<Canned>> {
        self.queue.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl CatalogProvider for FixtureCatalog {
    async fn get_items(&self, ids: &[String]) -> Result<ItemBatch> {
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(ids.to_vec());

        let next = self.lock_queue().pop_front();
        match next {
            Some(Canned::Body(b)) => Ok(parse_get_items(&b, &self.marketplace)),
            Some(Canned::Transport(msg)) => Err(TrackerError::Transport(msg)),
            None => Ok(ItemBatch::new()),
        }
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
