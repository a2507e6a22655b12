/// Standalone utility running a single sync pass and exiting
/// Usage: cargo run --bin sync_once [-- --dry-run]
///
/// With --dry-run, points go to an in-memory store and the run summary is
/// printed as JSON instead of being written to InfluxDB.

use awattar_sync::config::load_settings;
use awattar_sync::data::SyncRun;
use awattar_sync::provider::{AwattarClient, DataProvider};
use awattar_sync::store::{InfluxClient, MemoryStore, TimeSeriesStore};
use awattar_sync::utils::init_logging;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let dry_run = std::env::args().skip(1).any(|arg| arg == "--dry-run");

    let settings = load_settings()?;
    init_logging(settings.log_format);

    info!("Single sync run{}", if dry_run { " (dry run)" } else { "" });

    let store: Arc<dyn TimeSeriesStore> = if dry_run {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(InfluxClient::from_settings(&settings)?)
    };
    let provider: Arc<dyn DataProvider> = Arc::new(AwattarClient::new(
        &settings.awattar_base_url,
        settings.http_timeout_secs,
    )?);

    let summary = match SyncRun::from_settings(store, provider, &settings).run().await {
        Ok(summary) => summary,
        Err(e) => {
            error!("Sync run failed: {} ({})", e, e.error_code());
            return Err(e.into());
        }
    };

    for series in &summary.series {
        info!(
            "{}: window {}, fetched {}, written {}, dropped {}{}",
            series.series,
            series.window,
            series.fetched,
            series.written,
            series.dropped,
            if series.skipped { " (up to date)" } else { "" }
        );
    }
    info!("Flushed {} points", summary.flushed);

    if dry_run {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}
