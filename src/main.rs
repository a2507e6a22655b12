/// Main entry point for the recurring ingestion service
use std::sync::Arc;
use tracing::{error, info, warn};

use awattar_sync::{
    config::load_settings,
    data::SyncRun,
    error::Result,
    provider::{AwattarClient, DataProvider},
    store::{InfluxClient, TimeSeriesStore},
    time::CronSchedule,
    trigger::RecurringTrigger,
    utils::init_logging,
    LogFormat, Settings,
};

/// Application state
pub struct SyncApp {
    settings: Arc<Settings>,
    trigger: Arc<RecurringTrigger>,
}

impl SyncApp {
    pub fn new(settings: Settings) -> Result<Self> {
        let settings = Arc::new(settings);

        let store: Arc<dyn TimeSeriesStore> = Arc::new(InfluxClient::from_settings(&settings)?);
        let provider: Arc<dyn DataProvider> = Arc::new(AwattarClient::new(
            &settings.awattar_base_url,
            settings.http_timeout_secs,
        )?);

        let sync_run = Arc::new(SyncRun::from_settings(store, provider, &settings));
        let schedule = CronSchedule::parse(&settings.cron_expression, settings.timezone)?;
        let trigger = Arc::new(RecurringTrigger::for_sync_run(schedule, sync_run));

        Ok(SyncApp { settings, trigger })
    }

    /// Eager run, then scheduled runs until Ctrl+C
    pub async fn run(&self) -> Result<()> {
        info!(
            "Syncing into {} (org {}, bucket {})",
            self.settings.influxdb_url,
            self.settings.influxdb_org,
            self.settings.influxdb_bucket
        );

        tokio::select! {
            _ = Arc::clone(&self.trigger).run_forever() => {
                warn!("Scheduler stopped");
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("Ctrl+C received - shutting down");
            }
        }

        Ok(())
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let settings = match load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            init_logging(LogFormat::default());
            error!("{} ({})", e, e.error_code());
            std::process::exit(1);
        }
    };

    init_logging(settings.log_format);
    info!("Configuration loaded: {:?}", settings);

    let app = match SyncApp::new(settings) {
        Ok(app) => app,
        Err(e) => {
            error!("Startup failed: {} ({})", e, e.error_code());
            std::process::exit(1);
        }
    };

    if let Err(e) = app.run().await {
        error!("Service stopped with error: {} ({})", e, e.error_code());
        std::process::exit(1);
    }
}
