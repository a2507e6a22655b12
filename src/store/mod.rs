pub mod buffer;
pub mod influx;
pub mod line_protocol;
pub mod memory;

pub use buffer::WriteBuffer;
pub use influx::InfluxClient;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DataPoint, Series, StoredPoint};

/// Backing time-series store
///
/// Writes are idempotent by timestamp: a point with the same series and
/// timestamp overwrites the stored fields instead of adding a second row.
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// Most recent point of `series` across the whole retained range
    async fn query_last_point(&self, series: Series) -> Result<Option<StoredPoint>>;

    /// Durably commit a batch of points
    async fn write_points(&self, points: &[DataPoint]) -> Result<()>;
}
