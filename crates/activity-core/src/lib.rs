pub mod config;
pub mod error;

pub use config::{
    Config, ConfigValidationError, GraphConfig, LoggingConfig, ScanConfig, ValidationResult,
};
pub use error::ConfigError;

use anyhow::Result;

/// Initialize logging.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` (normally the
/// configured `logging.filter`) is used.
pub fn init(default_filter: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!("Activity importer core initialized");
    Ok(())
}
