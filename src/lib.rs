pub mod types;
pub mod error;
pub mod config;
pub mod time;
pub mod provider;
pub mod store;
pub mod data;
pub mod trigger;
pub mod utils;

pub use types::*;
pub use error::{Result, SyncError};
