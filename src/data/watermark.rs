/// Resume point of a series, derived from what the store already holds
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::error::Result;
use crate::store::TimeSeriesStore;
use crate::types::Series;

/// Timestamp from which to resume fetching `series`.
///
/// One nanosecond past the last stored point, or `now` minus the series'
/// fallback lookback when nothing is stored yet. Query errors propagate.
pub async fn resolve_resume_point(
    store: &dyn TimeSeriesStore,
    series: Series,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    match store.query_last_point(series).await? {
        Some(last) => {
            let resume = last.timestamp + Duration::nanoseconds(1);
            debug!(
                "Last stored {} point at {}, resuming from {}",
                series,
                last.timestamp.to_rfc3339(),
                resume.to_rfc3339()
            );
            Ok(resume)
        }
        None => {
            let resume = now - series.fallback_lookback();
            info!(
                "No stored {} points, bootstrapping from {}",
                series,
                resume.to_rfc3339()
            );
            Ok(resume)
        }
    }
}
