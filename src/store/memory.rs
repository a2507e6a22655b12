/// In-process time-series store (dry runs and tests)
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::TimeSeriesStore;
use crate::error::Result;
use crate::types::{DataPoint, FieldValue, Series, StoredPoint};

type SeriesData = BTreeMap<DateTime<Utc>, BTreeMap<String, FieldValue>>;

/// Store keyed by series and timestamp, so rewrites overwrite
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<HashMap<Series, SeriesData>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct timestamps stored for a series
    pub async fn count(&self, series: Series) -> usize {
        let data = self.data.read().await;
        data.get(&series).map(|s| s.len()).unwrap_or(0)
    }

    /// All stored points of a series, oldest first
    pub async fn points(&self, series: Series) -> Vec<DataPoint> {
        let data = self.data.read().await;
        data.get(&series)
            .map(|s| {
                s.iter()
                    .map(|(timestamp, fields)| DataPoint {
                        series,
                        timestamp: *timestamp,
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl TimeSeriesStore for MemoryStore {
    async fn query_last_point(&self, series: Series) -> Result<Option<StoredPoint>> {
        let data = self.data.read().await;
        Ok(data
            .get(&series)
            .and_then(|s| s.iter().next_back())
            .map(|(timestamp, fields)| StoredPoint {
                timestamp: *timestamp,
                fields: fields.clone(),
            }))
    }

    async fn write_points(&self, points: &[DataPoint]) -> Result<()> {
        let mut data = self.data.write().await;
        for point in points {
            data.entry(point.series)
                .or_default()
                .entry(point.timestamp)
                .or_default()
                .extend(point.fields.clone());
        }
        debug!("Stored {} points in memory", points.len());
        Ok(())
    }
}
