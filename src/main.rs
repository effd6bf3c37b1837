//! Demo front end for the platecache data layer.
//!
//! Stands in for the restaurant listing page: initializes logging, loads
//! configuration, registers the asset cache worker, and issues the queries
//! the page would.

use std::io;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use platecache::{ApiClient, Config, DataService, RecordStore, FILTER_ALL};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();
    info!("platecache starting");

    let config = Config::load()?;
    let api = ApiClient::new(&config.api_base_url)?;

    let store = config
        .record_store_dir()
        .ok()
        .and_then(|dir| RecordStore::open(dir));
    if store.is_none() {
        info!("record store unavailable, running network-only");
    }
    let service = DataService::new(api, store);

    // Register the asset cache worker; success or failure is logged only.
    if let Ok(cache_root) = config.asset_cache_root() {
        let _worker = platecache::register(cache_root, &config.api_base_url);
    }

    let neighborhoods = service.distinct_neighborhoods().await?;
    let cuisines = service.distinct_cuisines().await?;
    println!("Neighborhoods: {}", neighborhoods.join(", "));
    println!("Cuisines: {}", cuisines.join(", "));

    let listing = service.filtered(FILTER_ALL, FILTER_ALL, false).await?;
    println!("\n{} restaurants:", listing.len());
    for restaurant in &listing {
        println!(
            "  #{} {} - {} ({})",
            restaurant.id, restaurant.name, restaurant.cuisine_type, restaurant.neighborhood
        );
    }

    info!("platecache done");
    Ok(())
}
