// tests/check_cycle.rs
//
// End-to-end check cycles over a fixture catalog, a recording notifier and
// scratch stores in a temp dir.

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::watch;

use catalog_price_tracker::catalog::FixtureCatalog;
use catalog_price_tracker::history::PriceHistory;
use catalog_price_tracker::notify::RecordingNotifier;
use catalog_price_tracker::store::ProductStore;
use catalog_price_tracker::{TemplateStore, TrackedProduct, Tracker};

fn item(asin: &str, price: Option<f64>, availability: &str) -> Value {
    let mut listing = json!({ "Availability": { "Message": availability } });
    if let Some(p) = price {
        listing["Price"] = json!({ "Amount": p, "Currency": "JPY" });
    }
    json!({
        "ASIN": asin,
        "DetailPageURL": format!("https://www.amazon.co.jp/dp/{asin}"),
        "ItemInfo": { "Title": { "DisplayValue": format!("Product {asin}") } },
        "Offers": { "Listings": [listing] }
    })
}

fn body(items: Vec<Value>) -> String {
    json!({ "ItemsResult": { "Items": items } }).to_string()
}

fn tracked(asin: &str, price: i64, availability: &str) -> TrackedProduct {
    let t = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    TrackedProduct {
        asin: asin.into(),
        name: format!("Product {asin}"),
        url: format!("https://www.amazon.co.jp/dp/{asin}?tag=tracker-22"),
        last_price: Some(price),
        last_availability: Some(availability.into()),
        last_checked: t,
        price_history: PriceHistory::starting_at(Some(price), t),
    }
}

fn tracker_with(
    dir: &tempfile::TempDir,
    products: &[TrackedProduct],
    catalog: FixtureCatalog,
    notifier: RecordingNotifier,
) -> Tracker {
    let store = ProductStore::new(dir.path().join("products.jsonl"));
    store.save(products).unwrap();
    Tracker::new(
        store,
        TemplateStore::in_memory(),
        Box::new(catalog),
        Box::new(notifier),
        Some("tracker-22".into()),
    )
    .unwrap()
    .with_batch_delay(Duration::ZERO)
}

#[tokio::test]
async fn flash_sale_drop_is_posted_and_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = FixtureCatalog::new("www.amazon.co.jp").with_body(body(vec![
        item("B0DROP0001", Some(800.0), "In Stock."),
        item("B0SAME0001", Some(1000.0), "In Stock."),
    ]));
    let notifier = RecordingNotifier::new();
    let posts = notifier.posts.clone();

    let mut tracker = tracker_with(
        &dir,
        &[
            tracked("B0DROP0001", 1000, "In Stock."),
            tracked("B0SAME0001", 1000, "In Stock."),
            tracked("B0MISSING1", 1000, "In Stock."),
        ],
        catalog,
        notifier,
    );

    let report = tracker.check_once().await.unwrap();
    assert_eq!(report.checked, 2);
    assert_eq!(report.changed, 1);
    assert_eq!(report.posted, 1);
    assert_eq!(report.lookup_misses, 1);
    assert!(!report.interrupted);

    let posts = posts.lock().unwrap();
    assert_eq!(posts.len(), 1);
    let post = &posts[0];
    assert!(post.starts_with("🔥【緊急値下げ速報】🔥\nProduct B0DROP0001\n"), "{post}");
    assert!(post.contains("【値下げ】200円引き (20.0%オフ)"), "{post}");
    assert!(post.ends_with("https://www.amazon.co.jp/dp/B0DROP0001?tag=tracker-22"));
    assert!(post.chars().count() <= 280);

    let saved = ProductStore::new(dir.path().join("products.jsonl")).load().unwrap();
    assert_eq!(saved.len(), 3);
    assert_eq!(saved[0].last_price, Some(800));
    assert_eq!(saved[0].price_history.len(), 2);
    assert_eq!(saved[1].price_history.len(), 1);
    assert_eq!(saved[2], tracked("B0MISSING1", 1000, "In Stock."));
}

#[tokio::test]
async fn small_drop_uses_default_template() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = FixtureCatalog::new("www.amazon.co.jp")
        .with_body(body(vec![item("B0SMALL001", Some(950.0), "In Stock.")]));
    let notifier = RecordingNotifier::new();
    let posts = notifier.posts.clone();

    let mut tracker = tracker_with(&dir, &[tracked("B0SMALL001", 1000, "In Stock.")], catalog, notifier);
    tracker.check_once().await.unwrap();

    let posts = posts.lock().unwrap();
    assert!(posts[0].starts_with("【Amazon価格・在庫変動】\n"), "{}", posts[0]);
    assert!(posts[0].contains("・⬇️ 50円下落 (5.0%)"));
}

#[tokio::test]
async fn failed_batch_is_skipped_and_next_batch_still_runs() {
    let dir = tempfile::tempdir().unwrap();
    let products: Vec<TrackedProduct> = (0..12)
        .map(|i| tracked(&format!("B0BATCH{i:03}"), 1000, "In Stock."))
        .collect();
    let catalog = FixtureCatalog::new("www.amazon.co.jp")
        .with_transport_error("503 Service Unavailable")
        .with_body(body(vec![
            item("B0BATCH010", Some(1200.0), "In Stock."),
            item("B0BATCH011", Some(1000.0), "In Stock."),
        ]));
    let calls = catalog.calls();
    let notifier = RecordingNotifier::new();

    let mut tracker = tracker_with(&dir, &products, catalog, notifier);
    let report = tracker.check_once().await.unwrap();

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].len(), 10);
    assert_eq!(calls[1], vec!["B0BATCH010".to_string(), "B0BATCH011".to_string()]);

    assert_eq!(report.failed_batches, 1);
    assert_eq!(report.checked, 2);
    assert_eq!(report.posted, 1);
    assert_eq!(tracker.products()[0].last_price, Some(1000));
    assert_eq!(tracker.products()[10].last_price, Some(1200));
}

#[tokio::test]
async fn failed_post_still_updates_state() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = FixtureCatalog::new("www.amazon.co.jp")
        .with_body(body(vec![item("B0POSTFAIL", Some(1000.0), "Temporarily out of stock.")]));
    let notifier = RecordingNotifier::failing();

    let mut tracker = tracker_with(&dir, &[tracked("B0POSTFAIL", 1000, "In Stock.")], catalog, notifier);
    let report = tracker.check_once().await.unwrap();

    assert_eq!(report.post_failures, 1);
    assert_eq!(report.posted, 0);
    assert_eq!(
        tracker.products()[0].last_availability.as_deref(),
        Some("Temporarily out of stock.")
    );
}

#[tokio::test]
async fn interrupt_before_first_batch_still_writes_store() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = FixtureCatalog::new("www.amazon.co.jp");
    let calls = catalog.calls();
    let mut tracker = tracker_with(
        &dir,
        &[tracked("B0STOPPED1", 1000, "In Stock.")],
        catalog,
        RecordingNotifier::new(),
    );
    std::fs::remove_file(dir.path().join("products.jsonl")).unwrap();

    let (_tx, rx) = watch::channel(true);
    let report = tracker.check_products(&rx).await.unwrap();

    assert!(report.interrupted);
    assert!(calls.lock().unwrap().is_empty());
    assert!(dir.path().join("products.jsonl").exists());
}

#[tokio::test]
async fn add_product_tags_url_and_refuses_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = FixtureCatalog::new("www.amazon.co.jp")
        .with_body(body(vec![item("B0NEWITEM1", Some(2480.0), "In Stock.")]))
        .with_body(body(vec![]));
    let mut tracker = tracker_with(&dir, &[], catalog, RecordingNotifier::new());

    assert!(tracker.add_product(" B0NEWITEM1 ").await.unwrap());
    assert!(!tracker.add_product("B0NEWITEM1").await.unwrap());
    assert!(!tracker.add_product("B0NOTFOUND").await.unwrap());

    let saved = ProductStore::new(dir.path().join("products.jsonl")).load().unwrap();
    assert_eq!(saved.len(), 1);
    let p = &saved[0];
    assert_eq!(p.name, "Product B0NEWITEM1");
    assert_eq!(p.url, "https://www.amazon.co.jp/dp/B0NEWITEM1?tag=tracker-22");
    assert_eq!(p.last_price, Some(2480));
    assert_eq!(p.price_history.len(), 1);
}

#[tokio::test]
async fn empty_product_list_makes_no_calls() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = FixtureCatalog::new("www.amazon.co.jp");
    let calls = catalog.calls();
    let mut tracker = tracker_with(&dir, &[], catalog, RecordingNotifier::new());
    let report = tracker.check_once().await.unwrap();
    assert_eq!(report.checked, 0);
    assert!(calls.lock().unwrap().is_empty());
}
