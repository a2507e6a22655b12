/// Tracing subscriber setup shared by all binaries
use tracing_subscriber::EnvFilter;

use crate::types::LogFormat;

const DEFAULT_FILTER: &str = "awattar_sync=debug,info";

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
