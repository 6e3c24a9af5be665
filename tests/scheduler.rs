// tests/scheduler.rs
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, Mutex};

use catalog_price_tracker::catalog::FixtureCatalog;
use catalog_price_tracker::history::PriceHistory;
use catalog_price_tracker::notify::RecordingNotifier;
use catalog_price_tracker::scheduler::{run_scheduler, shutdown_on_signal};
use catalog_price_tracker::store::ProductStore;
use catalog_price_tracker::{TemplateStore, TrackedProduct, Tracker};

fn one_product_tracker(dir: &tempfile::TempDir, catalog: FixtureCatalog) -> Tracker {
    let now = chrono::Utc::now();
    let store = ProductStore::new(dir.path().join("products.jsonl"));
    store
        .save(&[TrackedProduct {
            asin: "B0SCHED001".into(),
            name: "Scheduled".into(),
            url: "https://www.amazon.co.jp/dp/B0SCHED001".into(),
            last_price: Some(1000),
            last_availability: Some("In Stock.".into()),
            last_checked: now,
            price_history: PriceHistory::starting_at(Some(1000), now),
        }])
        .unwrap();
    Tracker::new(
        store,
        TemplateStore::in_memory(),
        Box::new(catalog),
        Box::new(RecordingNotifier::new()),
        None,
    )
    .unwrap()
    .with_batch_delay(Duration::ZERO)
}

#[tokio::test(start_paused = true)]
async fn runs_once_per_period_until_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = FixtureCatalog::new("www.amazon.co.jp");
    let calls = catalog.calls();
    let mut tracker = one_product_tracker(&dir, catalog);

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(150 * 60)).await;
        let _ = tx.send(true);
    });

    run_scheduler(&mut tracker, Duration::from_secs(60 * 60), rx).await;

    // Ticks at 60 and 120 minutes; shutdown at 150.
    assert_eq!(calls.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn already_stopped_runs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = FixtureCatalog::new("www.amazon.co.jp");
    let calls = catalog.calls();
    let mut tracker = one_product_tracker(&dir, catalog);

    let (_tx, rx) = watch::channel(true);
    run_scheduler(&mut tracker, Duration::from_secs(60), rx).await;
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn oversized_period_is_clamped_not_overflowed() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = FixtureCatalog::new("www.amazon.co.jp");
    let calls = catalog.calls();
    let mut tracker = one_product_tracker(&dir, catalog);

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        // Just past one week, the longest supported period.
        tokio::time::sleep(Duration::from_secs(7 * 24 * 3600 + 60)).await;
        let _ = tx.send(true);
    });

    run_scheduler(&mut tracker, Duration::MAX, rx).await;
    assert_eq!(calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn second_signal_forces_exit() {
    let (sig_tx, sig_rx) = mpsc::unbounded_channel::<()>();
    let sig_rx = Arc::new(Mutex::new(sig_rx));
    let (forced_tx, forced_rx) = oneshot::channel::<()>();

    let mut shutdown = shutdown_on_signal(
        move || {
            let sig_rx = sig_rx.clone();
            async move { sig_rx.lock().await.recv().await.is_some() }
        },
        move || {
            let _ = forced_tx.send(());
        },
    );

    sig_tx.send(()).unwrap();
    shutdown.changed().await.unwrap();
    assert!(*shutdown.borrow());

    sig_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), forced_rx)
        .await
        .expect("force ran")
        .unwrap();
}

#[tokio::test]
async fn closed_signal_source_never_flips() {
    let (forced_tx, mut forced_rx) = oneshot::channel::<()>();
    let shutdown = shutdown_on_signal(|| async { false }, move || {
        let _ = forced_tx.send(());
    });
    tokio::task::yield_now().await;
    assert!(!*shutdown.borrow());
    assert!(forced_rx.try_recv().is_err());
}
