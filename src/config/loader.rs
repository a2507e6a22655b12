/// Configuration loading from the environment and an optional TOML file
use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File};
use reqwest::Url;
use std::path::Path;

use crate::error::{Result, SyncError};
use crate::time::CronSchedule;
use crate::types::{FlushPolicy, LogFormat, Settings};

/// Settings without a default; absent or empty values stop startup
const REQUIRED_KEYS: [&str; 5] = [
    "influxdb_url",
    "influxdb_token",
    "influxdb_org",
    "influxdb_bucket",
    "cron_expression",
];

const DEFAULT_AWATTAR_BASE_URL: &str = "https://api.awattar.de/v1";
const DEFAULT_TIMEZONE: &str = "Europe/Berlin";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_WRITE_BATCH_SIZE: usize = 5000;

/// Load settings: TOML file at `CONFIG_PATH` (optional, default `config.toml`),
/// overridden by process environment variables.
pub fn load_settings() -> Result<Settings> {
    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());

    let raw = Config::builder()
        .add_source(File::from(Path::new(&config_path)).required(false))
        .add_source(Environment::default())
        .build()?;

    settings_from(&raw)
}

/// Build and validate settings from an already-layered configuration
pub fn settings_from(raw: &Config) -> Result<Settings> {
    let [influxdb_url, influxdb_token, influxdb_org, influxdb_bucket, cron_expression] =
        REQUIRED_KEYS.map(|key| required(raw, key));
    let (influxdb_url, influxdb_token, influxdb_org, influxdb_bucket, cron_expression) = (
        influxdb_url?,
        influxdb_token?,
        influxdb_org?,
        influxdb_bucket?,
        cron_expression?,
    );

    let awattar_base_url = optional(raw, "awattar_base_url")?
        .unwrap_or_else(|| DEFAULT_AWATTAR_BASE_URL.to_string());

    let timezone_name = optional(raw, "timezone")?.unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
    let timezone: Tz = timezone_name
        .parse()
        .map_err(|_| SyncError::Config(format!("Unknown TIMEZONE: {}", timezone_name)))?;

    let http_timeout_secs = match optional(raw, "http_timeout_secs")? {
        Some(v) => parse_positive(&v, "HTTP_TIMEOUT_SECS")? as u64,
        None => DEFAULT_HTTP_TIMEOUT_SECS,
    };

    let write_batch_size = match optional(raw, "write_batch_size")? {
        Some(v) => parse_positive(&v, "WRITE_BATCH_SIZE")?,
        None => DEFAULT_WRITE_BATCH_SIZE,
    };

    let flush_policy = match optional(raw, "flush_policy")? {
        Some(v) => v.parse()?,
        None => FlushPolicy::default(),
    };

    let log_format = match optional(raw, "log_format")? {
        Some(v) => v.parse()?,
        None => LogFormat::default(),
    };

    let settings = Settings {
        influxdb_url: validate_url(&influxdb_url, "INFLUXDB_URL")?,
        influxdb_token,
        influxdb_org,
        influxdb_bucket,
        write_batch_size,
        flush_policy,
        awattar_base_url: validate_url(&awattar_base_url, "AWATTAR_BASE_URL")?,
        http_timeout_secs,
        cron_expression,
        timezone,
        log_format,
    };

    // Fail at startup rather than at the first scheduled tick
    CronSchedule::parse(&settings.cron_expression, settings.timezone)?;

    Ok(settings)
}

fn required(raw: &Config, key: &str) -> Result<String> {
    optional(raw, key)?
        .ok_or_else(|| SyncError::Config(format!("{} is not set", key.to_uppercase())))
}

fn optional(raw: &Config, key: &str) -> Result<Option<String>> {
    match raw.get_string(key) {
        Ok(v) if v.trim().is_empty() => Ok(None),
        Ok(v) => Ok(Some(v.trim().to_string())),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn parse_positive(value: &str, name: &str) -> Result<usize> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(SyncError::Config(format!("Invalid {}: {}", name, value))),
    }
}

fn validate_url(value: &str, name: &str) -> Result<String> {
    Url::parse(value).map_err(|e| SyncError::Config(format!("Invalid {}: {}", name, e)))?;
    Ok(value.trim_end_matches('/').to_string())
}
