/// Centralized error types for the ingestion pipeline
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    // Configuration Errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid schedule expression: {0}")]
    InvalidSchedule(String),

    // Network Errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider API error: {status} - {message}")]
    Provider { status: u16, message: String },

    #[error("Store API error: {status} - {message}")]
    Store { status: u16, message: String },

    // Data Errors
    #[error("Deserialization failed: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    // File I/O Errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;

impl From<config::ConfigError> for SyncError {
    fn from(err: config::ConfigError) -> Self {
        SyncError::Config(err.to_string())
    }
}

impl SyncError {
    /// Transient failures: the next scheduled run retries from the same watermark
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SyncError::Http(_)
                | SyncError::Provider { .. }
                | SyncError::Store { .. }
        )
    }

    /// Errors that must stop the process before any run starts
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::Config(_) | SyncError::InvalidSchedule(_))
    }

    /// Get error code for logging/monitoring
    pub fn error_code(&self) -> &str {
        match self {
            SyncError::Config(_) => "CFG_001",
            SyncError::InvalidSchedule(_) => "CFG_002",
            SyncError::Http(_) => "NET_001",
            SyncError::Provider { .. } => "NET_002",
            SyncError::Store { .. } => "STORE_001",
            SyncError::Deserialization(_) => "DATA_001",
            SyncError::Csv(_) => "DATA_002",
            SyncError::InvalidTimestamp(_) => "DATA_003",
            SyncError::Io(_) => "FILE_001",
            SyncError::Internal(_) => "INT_001",
        }
    }
}
