//! Catalog price tracker, binary entrypoint.
//! Adds products, registers templates, runs one check or the periodic loop.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use catalog_price_tracker::scheduler::{run_scheduler, shutdown_on_ctrl_c};
use catalog_price_tracker::templates::TemplateStore;
use catalog_price_tracker::{Tracker, TrackerConfig};

#[derive(Parser, Debug)]
#[command(name = "catalog-price-tracker", version, about = "Watch catalog prices and availability and post changes")]
struct Cli {
    /// Start tracking an item id (ASIN)
    #[arg(long, value_name = "ASIN")]
    add: Option<String>,

    /// Check all tracked products now and exit
    #[arg(long)]
    check: bool,

    /// Minutes between scheduled checks (overrides config)
    #[arg(long, value_name = "MIN")]
    interval: Option<u64>,

    /// Register a post template from a JSON file
    #[arg(long, num_args = 2, value_names = ["NAME", "JSON_FILE"])]
    add_template: Option<Vec<String>>,

    /// Log posts instead of sending them
    #[arg(long)]
    dry_run: bool,
}

const ENV_LOG_FILE: &str = "TRACKER_LOG_FILE";
const DEFAULT_LOG_FILE: &str = "tracker.log";

/// `$TRACKER_LOG_FILE`, defaulting to `tracker.log`; set it empty to disable.
fn log_file_path() -> Option<PathBuf> {
    match std::env::var(ENV_LOG_FILE) {
        Ok(p) if p.trim().is_empty() => None,
        Ok(p) => Some(PathBuf::from(p.trim())),
        Err(_) => Some(PathBuf::from(DEFAULT_LOG_FILE)),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("catalog_price_tracker=info,warn"));

    let file_layer = log_file_path().and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))),
            Err(e) => {
                eprintln!("log file {} unavailable: {e}", path.display());
                None
            }
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .with(file_layer)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut cfg = TrackerConfig::load_default()?;
    if cli.dry_run {
        cfg.notify.dry_run = true;
    }
    if let Some(min) = cli.interval {
        cfg.set_interval_minutes(min);
    }

    // Template registration needs no catalog credentials.
    if let Some(args) = cli.add_template {
        let (name, file) = match args.as_slice() {
            [name, file] => (name.as_str(), PathBuf::from(file)),
            _ => anyhow::bail!("--add-template takes NAME and JSON_FILE"),
        };
        let mut templates = TemplateStore::load_or_seed(&cfg.templates_path)?;
        templates
            .add_template_from_file(name, &file)
            .with_context(|| format!("adding template `{name}`"))?;
        return Ok(());
    }

    let mut tracker = Tracker::from_config(&cfg)?;

    if let Some(asin) = cli.add {
        if !tracker.add_product(&asin).await? {
            anyhow::bail!("could not add {asin}");
        }
        return Ok(());
    }

    if cli.check {
        tracker.check_once().await?;
        return Ok(());
    }

    let shutdown = shutdown_on_ctrl_c();
    run_scheduler(&mut tracker, cfg.interval(), shutdown).await;
    Ok(())
}
