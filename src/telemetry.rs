//! Telemetry initialization (structured logging).

use crate::config::TelemetryConfig;
use crate::error::{BedrockError, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize structured logging.
///
/// `RUST_LOG` takes precedence over the configured default filter.
pub fn init(config: &TelemetryConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| BedrockError::Internal(format!("Failed to init logging: {}", e)))?;
    } else {
        subscriber
            .with(fmt::layer())
            .try_init()
            .map_err(|e| BedrockError::Internal(format!("Failed to init logging: {}", e)))?;
    }

    Ok(())
}
