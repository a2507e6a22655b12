pub mod awattar;

pub use awattar::AwattarClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{FetchWindow, RawRecord, Series};

/// Remote source of time-indexed records
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Fetch all records of `series` whose start lies in `window`
    async fn fetch(&self, series: Series, window: &FetchWindow) -> Result<Vec<RawRecord>>;
}
