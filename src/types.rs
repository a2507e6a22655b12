/// Core type definitions for the ingestion pipeline
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::SyncError;

/// Named category of ingested time-series data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Series {
    MarketPrice,
    Production,
}

impl Series {
    /// Processing order within a run: prices first, then production
    pub fn all() -> [Series; 2] {
        [Series::MarketPrice, Series::Production]
    }

    /// Measurement name in the store
    pub fn as_str(&self) -> &'static str {
        match self {
            Series::MarketPrice => "marketprice",
            Series::Production => "production",
        }
    }

    /// Path segment selecting the provider endpoint
    pub fn endpoint(&self) -> &'static str {
        match self {
            Series::MarketPrice => "marketdata",
            Series::Production => "power/productions",
        }
    }

    /// Lookback used when the store holds no point for this series yet
    pub fn fallback_lookback(&self) -> Duration {
        Duration::days(1)
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed field value of a stored point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Float(f64),
    String(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::String(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            FieldValue::Float(_) => None,
        }
    }
}

/// Converted, storeable record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub series: Series,
    pub timestamp: DateTime<Utc>,
    pub fields: BTreeMap<String, FieldValue>,
}

impl DataPoint {
    pub fn new(series: Series, timestamp: DateTime<Utc>) -> Self {
        DataPoint {
            series,
            timestamp,
            fields: BTreeMap::new(),
        }
    }

    pub fn float_field(mut self, name: &str, value: f64) -> Self {
        self.fields.insert(name.to_string(), FieldValue::Float(value));
        self
    }

    pub fn string_field(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), FieldValue::String(value.to_string()));
        self
    }
}

/// Record as delivered by the data provider; every payload field may be null
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    /// Epoch milliseconds; `None` when missing or not an integer
    #[serde(default, deserialize_with = "lenient_millis")]
    pub start_timestamp: Option<i64>,
    #[serde(default, deserialize_with = "lenient_millis")]
    pub end_timestamp: Option<i64>,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl RawRecord {
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start_timestamp.and_then(DateTime::from_timestamp_millis)
    }

    /// Numeric field, `None` when absent or null
    pub fn float(&self, name: &str) -> Option<f64> {
        self.fields.get(name)?.as_f64()
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.fields.get(name)?.as_str()
    }
}

/// A malformed timestamp drops its record in conversion instead of failing the
/// whole provider response.
fn lenient_millis<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_i64()))
}

/// Half-open interval `[start, end)` requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl FetchWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        FetchWindow { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Start in epoch milliseconds, rounded up so a sub-millisecond watermark
    /// never re-requests the stored instant
    pub fn start_millis(&self) -> i64 {
        let millis = self.start.timestamp_millis();
        if self.start.timestamp_subsec_nanos() % 1_000_000 != 0 {
            millis + 1
        } else {
            millis
        }
    }

    pub fn end_millis(&self) -> i64 {
        self.end.timestamp_millis()
    }
}

impl fmt::Display for FetchWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Last point found in the store for a series
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPoint {
    pub timestamp: DateTime<Utc>,
    pub fields: BTreeMap<String, FieldValue>,
}

/// Per-series outcome of a sync run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub series: Series,
    pub window: FetchWindow,
    pub fetched: usize,
    pub written: usize,
    pub dropped: usize,
    /// Window was empty, no fetch issued
    pub skipped: bool,
}

/// Outcome of one sync run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub series: Vec<SeriesSummary>,
    pub flushed: usize,
}

impl RunSummary {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        RunSummary {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: None,
            series: Vec::new(),
            flushed: 0,
        }
    }

    pub fn for_series(&self, series: Series) -> Option<&SeriesSummary> {
        self.series.iter().find(|s| s.series == series)
    }

    pub fn total_fetched(&self) -> usize {
        self.series.iter().map(|s| s.fetched).sum()
    }

    pub fn total_written(&self) -> usize {
        self.series.iter().map(|s| s.written).sum()
    }
}

/// When buffered points are committed to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushPolicy {
    /// One durability barrier after all series
    #[default]
    EndOfRun,
    /// Flush after each series to keep partial progress
    PerSeries,
}

impl FromStr for FlushPolicy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "end_of_run" | "end-of-run" => Ok(FlushPolicy::EndOfRun),
            "per_series" | "per-series" => Ok(FlushPolicy::PerSeries),
            other => Err(SyncError::Config(format!("Invalid FLUSH_POLICY: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(SyncError::Config(format!("Invalid LOG_FORMAT: {}", other))),
        }
    }
}

/// Validated, immutable process configuration
#[derive(Clone)]
pub struct Settings {
    // Store
    pub influxdb_url: String,
    pub influxdb_token: String,
    pub influxdb_org: String,
    pub influxdb_bucket: String,
    pub write_batch_size: usize,
    pub flush_policy: FlushPolicy,

    // Provider
    pub awattar_base_url: String,
    pub http_timeout_secs: u64,

    // Scheduling
    pub cron_expression: String,
    pub timezone: Tz,

    pub log_format: LogFormat,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("influxdb_url", &self.influxdb_url)
            .field("influxdb_token", &"<redacted>")
            .field("influxdb_org", &self.influxdb_org)
            .field("influxdb_bucket", &self.influxdb_bucket)
            .field("write_batch_size", &self.write_batch_size)
            .field("flush_policy", &self.flush_policy)
            .field("awattar_base_url", &self.awattar_base_url)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("cron_expression", &self.cron_expression)
            .field("timezone", &self.timezone)
            .field("log_format", &self.log_format)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_raw_record_null_fields() {
        let record: RawRecord = serde_json::from_str(
            r#"{"start_timestamp": 1704067200000, "end_timestamp": 1704070800000, "marketprice": null, "unit": "Eur/MWh"}"#,
        )
        .unwrap();

        assert_eq!(record.float("marketprice"), None);
        assert_eq!(record.string("unit"), Some("Eur/MWh"));
        assert_eq!(record.float("solar"), None);
        assert_eq!(
            record.start(),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_raw_record_malformed_start() {
        for body in [
            r#"{"start_timestamp": null, "marketprice": 1.0}"#,
            r#"{"start_timestamp": "yesterday", "marketprice": 1.0}"#,
            r#"{"start_timestamp": 1.5, "marketprice": 1.0}"#,
            r#"{"marketprice": 1.0}"#,
        ] {
            let record: RawRecord = serde_json::from_str(body).unwrap();
            assert_eq!(record.start(), None, "{}", body);
            assert_eq!(record.float("marketprice"), Some(1.0));
        }
    }

    #[test]
    fn test_window_millis_round_up() {
        let stored = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

        let window = FetchWindow::new(stored + Duration::nanoseconds(1), end);
        assert_eq!(window.start_millis(), stored.timestamp_millis() + 1);
        assert_eq!(window.end_millis(), end.timestamp_millis());

        let aligned = FetchWindow::new(stored, end);
        assert_eq!(aligned.start_millis(), stored.timestamp_millis());
        assert!(!aligned.is_empty());
        assert!(FetchWindow::new(end, stored).is_empty());
    }

    #[test]
    fn test_settings_debug_redacts_token() {
        let settings = Settings {
            influxdb_url: "http://localhost:8086".to_string(),
            influxdb_token: "super-secret".to_string(),
            influxdb_org: "home".to_string(),
            influxdb_bucket: "awattar".to_string(),
            write_batch_size: 5000,
            flush_policy: FlushPolicy::EndOfRun,
            awattar_base_url: "https://api.awattar.de/v1".to_string(),
            http_timeout_secs: 30,
            cron_expression: "0 * * * *".to_string(),
            timezone: chrono_tz::Europe::Berlin,
            log_format: LogFormat::Pretty,
        };

        let debug = format!("{:?}", settings);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("per_series".parse::<FlushPolicy>().unwrap(), FlushPolicy::PerSeries);
        assert_eq!("END_OF_RUN".parse::<FlushPolicy>().unwrap(), FlushPolicy::EndOfRun);
        assert!("sometimes".parse::<FlushPolicy>().is_err());
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
    }
}
