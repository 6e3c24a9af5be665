//! Demo that renders a few sample change sets and sends them through the log channel.

use chrono::Utc;
use catalog_price_tracker::change_detector::detect_changes;
use catalog_price_tracker::notify::LogNotifier;
use catalog_price_tracker::templates::select_template;
use catalog_price_tracker::{ItemRecord, Notifier, Renderer, TemplateStore, TrackedProduct};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).init();
    let templates = TemplateStore::in_memory();
    let renderer = Renderer::new(Some("demo-22".into()));
    let notifier = LogNotifier;

    let first = ItemRecord {
        title: "Stainless Electric Kettle 1.2L".into(),
        price: Some(4_980),
        availability: Some("In Stock.".into()),
        detail_url: "https://www.amazon.co.jp/dp/B0DEMO0001".into(),
        prime_eligible: true,
    };
    let mut product = TrackedProduct::from_record("B0DEMO0001", &first, Some("demo-22"), Utc::now());

    let seq = [
        (Some(4_780), "In Stock."),
        (Some(3_980), "In Stock."),
        (Some(3_980), "Temporarily out of stock."),
        (Some(4_980), "In Stock."),
    ];

    for (price, availability) in seq {
        let fresh = ItemRecord {
            price,
            availability: Some(availability.into()),
            ..first.clone()
        };
        let events = detect_changes(&mut product, &fresh, Utc::now());
        if events.is_empty() {
            continue;
        }
        let template = templates.resolve(select_template(&events));
        let body = renderer.render(&product, &events, template);
        if let Err(e) = notifier.post(&body).await {
            eprintln!("post failed: {e:#}");
        }
    }

    println!("render-demo done");
}
