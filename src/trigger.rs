/// Recurring trigger: one eager run at startup, then runs on a cron schedule
use chrono::Utc;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::data::SyncRun;
use crate::error::Result;
use crate::time::CronSchedule;
use crate::types::RunSummary;

pub type SyncJob = Arc<dyn Fn() -> BoxFuture<'static, Result<RunSummary>> + Send + Sync>;

pub struct RecurringTrigger {
    schedule: CronSchedule,
    job: SyncJob,
    /// Held for the duration of a run; a trigger firing meanwhile is skipped
    in_flight: Arc<Mutex<()>>,
}

impl RecurringTrigger {
    pub fn new(schedule: CronSchedule, job: SyncJob) -> Self {
        RecurringTrigger {
            schedule,
            job,
            in_flight: Arc::new(Mutex::new(())),
        }
    }

    pub fn for_sync_run(schedule: CronSchedule, sync_run: Arc<SyncRun>) -> Self {
        let job: SyncJob = Arc::new(move || {
            let sync_run = Arc::clone(&sync_run);
            async move { sync_run.run().await }.boxed()
        });
        Self::new(schedule, job)
    }

    /// Invoke the job unless a previous invocation is still running.
    ///
    /// Returns `None` when skipped. Failures are logged here and never
    /// propagate to the scheduling loop.
    pub async fn fire(&self) -> Option<Result<RunSummary>> {
        let _guard = match Arc::clone(&self.in_flight).try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                warn!("Previous sync run still in flight, skipping this invocation");
                return None;
            }
        };

        let result = (self.job)().await;

        match &result {
            Ok(summary) => info!(
                run_id = %summary.run_id,
                fetched = summary.total_fetched(),
                flushed = summary.flushed,
                "Sync run succeeded"
            ),
            Err(e) if e.is_recoverable() => warn!(
                "Sync run failed: {} ({}), next scheduled run retries",
                e,
                e.error_code()
            ),
            Err(e) => error!("Sync run failed: {} ({})", e, e.error_code()),
        }

        Some(result)
    }

    /// Run once immediately, then on every schedule tick until the task is
    /// dropped. Each scheduled run executes on its own task so a panic inside
    /// one run cannot take down the loop.
    pub async fn run_forever(self: Arc<Self>) {
        info!("Running initial sync at startup");
        let trigger = Arc::clone(&self);
        if let Err(e) = tokio::spawn(async move { trigger.fire().await }).await {
            error!("Initial sync run aborted: {}", e);
        }

        info!(
            "Scheduling sync runs with '{}' ({})",
            self.schedule.expression(),
            self.schedule.timezone()
        );

        loop {
            let now = Utc::now();
            let Some(next) = self.schedule.next_after(now) else {
                warn!("Schedule '{}' has no upcoming fire time, stopping", self.schedule.expression());
                return;
            };

            debug!("Next sync run at {}", next.to_rfc3339());
            tokio::time::sleep((next - now).to_std().unwrap_or_default()).await;

            info!("Starting scheduled sync run");
            let trigger = Arc::clone(&self);
            tokio::spawn(async move {
                trigger.fire().await;
            });
        }
    }
}
