/// Run-scoped write buffer with an explicit flush barrier
use tracing::debug;

use super::TimeSeriesStore;
use crate::error::Result;
use crate::types::DataPoint;

/// Points queued during a run; nothing reaches the store until `flush`
pub struct WriteBuffer {
    points: Vec<DataPoint>,
    batch_size: usize,
}

impl WriteBuffer {
    pub fn new(batch_size: usize) -> Self {
        WriteBuffer {
            points: Vec::new(),
            batch_size: batch_size.max(1),
        }
    }

    /// Queue a point (buffered, not yet durable)
    pub fn write_point(&mut self, point: DataPoint) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Commit all queued points, `batch_size` per request.
    ///
    /// Returns the number of points committed. On failure the buffer keeps its
    /// points; chunks sent before the failing one are already stored.
    pub async fn flush(&mut self, store: &dyn TimeSeriesStore) -> Result<usize> {
        if self.points.is_empty() {
            return Ok(0);
        }

        for chunk in self.points.chunks(self.batch_size) {
            store.write_points(chunk).await?;
            debug!("Flushed chunk of {} points", chunk.len());
        }

        let flushed = self.points.len();
        self.points.clear();
        Ok(flushed)
    }
}
