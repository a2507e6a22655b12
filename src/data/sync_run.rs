/// Incremental sync run: watermark -> window -> fetch -> convert -> flush
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::converter::convert;
use super::watermark::resolve_resume_point;
use super::window::plan_window;
use crate::error::Result;
use crate::provider::DataProvider;
use crate::store::{TimeSeriesStore, WriteBuffer};
use crate::types::{FlushPolicy, RunSummary, Series, SeriesSummary, Settings};

const DEFAULT_BATCH_SIZE: usize = 5000;

/// One pass over all series against a store and a provider.
///
/// Holds no state between runs: every run re-derives its watermarks from the
/// store, so a failed run is retried from the same point by the next one.
pub struct SyncRun {
    store: Arc<dyn TimeSeriesStore>,
    provider: Arc<dyn DataProvider>,
    timezone: Tz,
    write_batch_size: usize,
    flush_policy: FlushPolicy,
}

impl SyncRun {
    pub fn new(store: Arc<dyn TimeSeriesStore>, provider: Arc<dyn DataProvider>) -> Self {
        SyncRun {
            store,
            provider,
            timezone: chrono_tz::Europe::Berlin,
            write_batch_size: DEFAULT_BATCH_SIZE,
            flush_policy: FlushPolicy::EndOfRun,
        }
    }

    pub fn from_settings(
        store: Arc<dyn TimeSeriesStore>,
        provider: Arc<dyn DataProvider>,
        settings: &Settings,
    ) -> Self {
        Self::new(store, provider)
            .with_timezone(settings.timezone)
            .with_write_batch_size(settings.write_batch_size)
            .with_flush_policy(settings.flush_policy)
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_write_batch_size(mut self, write_batch_size: usize) -> Self {
        self.write_batch_size = write_batch_size;
        self
    }

    pub fn with_flush_policy(mut self, flush_policy: FlushPolicy) -> Self {
        self.flush_policy = flush_policy;
        self
    }

    pub async fn run(&self) -> Result<RunSummary> {
        self.run_at(Utc::now()).await
    }

    /// Run with `now` as the reference for lookback and window ends.
    ///
    /// Any query, fetch or flush failure aborts the run. With the default
    /// end-of-run policy, nothing buffered before the failure is stored.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunSummary> {
        let mut summary = RunSummary::new(now);
        let mut buffer = WriteBuffer::new(self.write_batch_size);

        info!(run_id = %summary.run_id, "Starting sync run");

        for series in Series::all() {
            let series_summary = self.sync_series(series, now, &mut buffer).await?;
            summary.series.push(series_summary);

            if self.flush_policy == FlushPolicy::PerSeries {
                summary.flushed += self.flush(&mut buffer, Some(series)).await?;
            }
        }

        if self.flush_policy == FlushPolicy::EndOfRun {
            summary.flushed += self.flush(&mut buffer, None).await?;
        }

        summary.finished_at = Some(Utc::now());
        info!(
            run_id = %summary.run_id,
            fetched = summary.total_fetched(),
            written = summary.total_written(),
            flushed = summary.flushed,
            "Sync run complete"
        );

        Ok(summary)
    }

    async fn sync_series(
        &self,
        series: Series,
        now: DateTime<Utc>,
        buffer: &mut WriteBuffer,
    ) -> Result<SeriesSummary> {
        let resume = resolve_resume_point(self.store.as_ref(), series, now)
            .await
            .inspect_err(|e| warn!("Watermark query for {} failed: {} ({})", series, e, e.error_code()))?;

        let window = plan_window(series, resume, now, &self.timezone);

        if window.is_empty() {
            debug!("{} is up to date, window {} is empty", series, window);
            return Ok(SeriesSummary {
                series,
                window,
                fetched: 0,
                written: 0,
                dropped: 0,
                skipped: true,
            });
        }

        let records = self
            .provider
            .fetch(series, &window)
            .await
            .inspect_err(|e| warn!("Fetch of {} for {} failed: {} ({})", series, window, e, e.error_code()))?;

        info!("Found {} new {} entries", records.len(), series);

        let mut written = 0;
        for point in records.iter().filter_map(|record| convert(series, record)) {
            buffer.write_point(point);
            written += 1;
        }

        let dropped = records.len() - written;
        if dropped > 0 {
            debug!("Dropped {} incomplete {} records", dropped, series);
        }

        Ok(SeriesSummary {
            series,
            window,
            fetched: records.len(),
            written,
            dropped,
            skipped: false,
        })
    }

    async fn flush(&self, buffer: &mut WriteBuffer, series: Option<Series>) -> Result<usize> {
        let pending = buffer.len();
        let flushed = buffer
            .flush(self.store.as_ref())
            .await
            .inspect_err(|e| warn!("Flush of {} points failed: {} ({})", pending, e, e.error_code()))?;

        match series {
            Some(series) => debug!("Flushed {} {} points", flushed, series),
            None => debug!("Flushed {} points", flushed),
        }
        Ok(flushed)
    }
}
