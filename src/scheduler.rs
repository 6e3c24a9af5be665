// src/scheduler.rs
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::{MAX_INTERVAL_MINUTES, MIN_INTERVAL_MINUTES};
use crate::tracker::Tracker;

/// Shutdown flag flipped to `true` on the first Ctrl-C. A second Ctrl-C
/// exits the process immediately.
pub fn shutdown_on_ctrl_c() -> watch::Receiver<bool> {
    shutdown_on_signal(
        || async { tokio::signal::ctrl_c().await.is_ok() },
        || {
            tracing::warn!("second interrupt; exiting without waiting for the cycle");
            std::process::exit(130);
        },
    )
}

/// `next_signal` resolves `true` per delivered signal. The first one flips
/// the flag, the second one runs `force`.
pub fn shutdown_on_signal<S, Fut, F>(mut next_signal: S, force: F) -> watch::Receiver<bool>
where
    S: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send,
    F: FnOnce() + Send + 'static,
{
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if !next_signal().await {
            return;
        }
        tracing::info!("interrupt received; stopping after the current batch (again to force)");
        let _ = tx.send(true);
        if next_signal().await {
            force();
        }
    });
    rx
}

/// Run a check cycle every `every`, first one after one full period, until
/// `shutdown` turns true. Cycle errors are logged and the loop keeps going.
pub async fn run_scheduler(tracker: &mut Tracker, every: Duration, mut shutdown: watch::Receiver<bool>) {
    let every = every.clamp(
        Duration::from_secs(MIN_INTERVAL_MINUTES * 60),
        Duration::from_secs(MAX_INTERVAL_MINUTES * 60),
    );
    let start = Instant::now().checked_add(every).unwrap_or_else(Instant::now);
    let mut ticker = interval_at(start, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(every_secs = every.as_secs(), "scheduler started");

    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => {}
            Ok(()) = shutdown.changed() => continue,
        }

        match tracker.check_products(&shutdown).await {
            Ok(report) => tracing::debug!(?report, "scheduled cycle done"),
            Err(e) => tracing::warn!("scheduled cycle failed: {e:#}"),
        }
    }

    tracing::info!("scheduler stopped");
}
