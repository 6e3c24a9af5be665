// src/tracker.rs
//! Check cycle: batch lookup → detect → select template → render → post.
//!
//! Products are processed in batches of at most [`MAX_BATCH`] with a fixed
//! delay between batches. A failed batch is skipped; a missing item leaves its
//! product untouched. The store is written once at the end of the cycle, also
//! when the cycle was interrupted between batches.

use anyhow::{Context, Result};
use chrono::Utc;
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;

use crate::catalog::{CatalogProvider, PaApiClient, MAX_BATCH, UNKNOWN};
use crate::change_detector::detect_in_batch;
use crate::config::TrackerConfig;
use crate::notify::{Notifier, NotifierMux, Renderer};
use crate::product::TrackedProduct;
use crate::store::ProductStore;
use crate::templates::{select_template, TemplateStore};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("tracker_cycles_total", "Check cycles started.");
        describe_counter!(
            "tracker_batch_errors_total",
            "Catalog batches skipped after a transport error."
        );
        describe_counter!(
            "tracker_lookup_miss_total",
            "Tracked items absent from their batch's results."
        );
        describe_counter!("tracker_changes_total", "Change events detected.");
        describe_counter!("tracker_posts_total", "Notifications sent.");
        describe_counter!("tracker_post_errors_total", "Notifications that failed.");
        describe_histogram!("catalog_request_ms", "Catalog GetItems latency in milliseconds.");
    });
}

/// Outcome counts of one check cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub checked: usize,
    pub changed: usize,
    pub posted: usize,
    pub post_failures: usize,
    pub failed_batches: usize,
    pub lookup_misses: usize,
    pub interrupted: bool,
}

pub struct Tracker {
    products: Vec<TrackedProduct>,
    store: ProductStore,
    templates: TemplateStore,
    catalog: Box<dyn CatalogProvider>,
    notifier: Box<dyn Notifier>,
    renderer: Renderer,
    partner_tag: Option<String>,
    batch_delay: Duration,
}

impl Tracker {
    pub fn new(
        store: ProductStore,
        templates: TemplateStore,
        catalog: Box<dyn CatalogProvider>,
        notifier: Box<dyn Notifier>,
        partner_tag: Option<String>,
    ) -> Result<Self> {
        ensure_metrics_described();
        let products = store.load()?;
        tracing::info!(count = products.len(), catalog = catalog.name(), "tracker ready");
        Ok(Self {
            products,
            store,
            templates,
            catalog,
            notifier,
            renderer: Renderer::new(partner_tag.clone()),
            partner_tag,
            batch_delay: Duration::from_secs(1),
        })
    }

    /// Production wiring. Fails when catalog credentials are incomplete.
    pub fn from_config(cfg: &TrackerConfig) -> Result<Self> {
        let catalog = PaApiClient::from_config(cfg).context("catalog client")?;
        let templates = TemplateStore::load_or_seed(&cfg.templates_path)?;
        let notifier = NotifierMux::from_config(&cfg.notify);
        tracing::info!(channels = ?notifier.channel_names(), "notification channels");
        Ok(Self::new(
            ProductStore::new(&cfg.products_path),
            templates,
            Box::new(catalog),
            Box::new(notifier),
            cfg.credentials.partner_tag().map(str::to_string),
        )?
        .with_batch_delay(Duration::from_millis(cfg.batch_delay_ms)))
    }

    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    pub fn products(&self) -> &[TrackedProduct] {
        &self.products
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    /// Look the item up and start tracking it. `Ok(false)` when the item is
    /// already tracked or the lookup failed.
    pub async fn add_product(&mut self, asin: &str) -> Result<bool> {
        let asin = asin.trim();
        anyhow::ensure!(!asin.is_empty(), "item id must not be empty");

        if self.products.iter().any(|p| p.asin == asin) {
            tracing::warn!(%asin, "already tracked");
            return Ok(false);
        }

        let batch = match self.catalog.get_items(&[asin.to_string()]).await {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(%asin, error = %e, "lookup failed; product not added");
                return Ok(false);
            }
        };
        let Some(record) = batch.get(asin) else {
            tracing::warn!(%asin, "catalog returned no record; product not added");
            return Ok(false);
        };

        let mut product =
            TrackedProduct::from_record(asin, record, self.partner_tag.as_deref(), Utc::now());
        if product.name == UNKNOWN {
            product.name = format!("Item {asin}");
        }
        tracing::info!(%asin, name = %product.name, "product added");
        self.products.push(product);
        self.store.save(&self.products)?;
        Ok(true)
    }

    pub fn add_template(&mut self, name: &str, file: &Path) -> Result<()> {
        self.templates.add_template_from_file(name, file)
    }

    /// One cycle without an external interrupt.
    pub async fn check_once(&mut self) -> Result<CycleReport> {
        let (_tx, rx) = watch::channel(false);
        self.check_products(&rx).await
    }

    pub async fn check_products(&mut self, shutdown: &watch::Receiver<bool>) -> Result<CycleReport> {
        let mut report = CycleReport::default();
        if self.products.is_empty() {
            tracing::info!("no tracked products");
            return Ok(report);
        }
        counter!("tracker_cycles_total").increment(1);

        let total = self.products.len();
        for (n, start) in (0..total).step_by(MAX_BATCH).enumerate() {
            if n > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
            if *shutdown.borrow() {
                tracing::info!(done = start, total, "cycle interrupted between batches");
                report.interrupted = true;
                break;
            }

            let end = (start + MAX_BATCH).min(total);
            self.check_batch(start..end, &mut report).await;
        }

        self.store.save(&self.products)?;
        tracing::info!(
            checked = report.checked,
            changed = report.changed,
            posted = report.posted,
            failed_batches = report.failed_batches,
            lookup_misses = report.lookup_misses,
            "check cycle finished"
        );
        Ok(report)
    }

    async fn check_batch(&mut self, range: std::ops::Range<usize>, report: &mut CycleReport) {
        let ids: Vec<String> = self.products[range.clone()]
            .iter()
            .map(|p| p.asin.clone())
            .collect();

        let fresh = match self.catalog.get_items(&ids).await {
            Ok(f) => f,
            Err(e) => {
                tracing::error!(ids = %ids.join(","), error = %e, "batch lookup failed; skipping");
                counter!("tracker_batch_errors_total").increment(1);
                report.failed_batches += 1;
                return;
            }
        };

        for idx in range {
            let now = Utc::now();
            let product = &mut self.products[idx];
            let events = match detect_in_batch(product, &fresh, now) {
                Ok(ev) => ev,
                Err(e) => {
                    tracing::warn!(asin = %product.asin, error = %e, "no fresh record");
                    counter!("tracker_lookup_miss_total").increment(1);
                    report.lookup_misses += 1;
                    continue;
                }
            };
            report.checked += 1;
            if events.is_empty() {
                continue;
            }

            report.changed += 1;
            counter!("tracker_changes_total").increment(events.len() as u64);

            let template_name = select_template(&events);
            let template = self.templates.resolve(template_name);
            let text = self.renderer.render(product, &events, template);
            let asin = product.asin.clone();

            match self.notifier.post(&text).await {
                Ok(()) => {
                    tracing::info!(%asin, template = template_name, "notification sent");
                    counter!("tracker_posts_total").increment(1);
                    report.posted += 1;
                }
                Err(e) => {
                    tracing::error!(%asin, error = ?e, "notification failed");
                    counter!("tracker_post_errors_total").increment(1);
                    report.post_failures += 1;
                }
            }
        }
    }
}
