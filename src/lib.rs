// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod catalog;
pub mod change_detector;
pub mod config;
pub mod error;
pub mod history;
pub mod product;
pub mod store;
pub mod templates;

// Notifications & background jobs
pub mod notify;
pub mod scheduler;
pub mod tracker;

// ---- Re-exports for stable public API ----
pub use crate::catalog::{CatalogProvider, ItemRecord};
pub use crate::change_detector::{ChangeEvent, Direction};
pub use crate::config::TrackerConfig;
pub use crate::error::TrackerError;
pub use crate::notify::{Notifier, NotifierMux, Renderer};
pub use crate::product::TrackedProduct;
pub use crate::templates::{PostTemplate, TemplateStore};
pub use crate::tracker::{CycleReport, Tracker};
