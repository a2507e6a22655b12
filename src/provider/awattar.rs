/// aWATTar REST client (market prices and power production)
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::DataProvider;
use crate::error::{Result, SyncError};
use crate::types::{FetchWindow, RawRecord, Series};

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    data: Vec<RawRecord>,
}

/// aWATTar API client
pub struct AwattarClient {
    client: Client,
    base_url: String,
}

impl AwattarClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(AwattarClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl DataProvider for AwattarClient {
    async fn fetch(&self, series: Series, window: &FetchWindow) -> Result<Vec<RawRecord>> {
        let url = format!("{}/{}", self.base_url, series.endpoint());

        info!(
            series = %series,
            start = %window.start.to_rfc3339(),
            end = %window.end.to_rfc3339(),
            "Fetching data from provider"
        );

        let response = self.client
            .get(&url)
            .header("Accept", "application/json")
            .query(&[("start", window.start_millis()), ("end", window.end_millis())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SyncError::Provider {
                status: status.as_u16(),
                message: truncate(&body, 512),
            });
        }

        let list: ListResponse = serde_json::from_str(&body)?;

        debug!("Provider returned {} {} records", list.data.len(), series);
        Ok(list.data)
    }
}

fn truncate(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}
