//! Configuration for the Bedrock metadata service.

use crate::error::{BedrockError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration for a Bedrock master.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BedrockConfig {
    /// Node registry configuration.
    pub registry: RegistryConfig,
    /// Chunk placement configuration.
    pub placement: PlacementConfig,
    /// Chunk reclamation configuration.
    pub reclaimer: ReclaimerConfig,
    /// Telemetry configuration.
    pub telemetry: TelemetryConfig,
}

impl BedrockConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BedrockError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| BedrockError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.registry.staleness.is_zero() {
            return Err(BedrockError::InvalidConfig {
                field: "registry.staleness".to_string(),
                reason: "Staleness threshold must be non-zero".to_string(),
            });
        }

        if self.reclaimer.worker_count == 0 {
            return Err(BedrockError::InvalidConfig {
                field: "reclaimer.worker_count".to_string(),
                reason: "Reclaimer needs at least one worker".to_string(),
            });
        }

        if self.reclaimer.queue_depth == 0 {
            return Err(BedrockError::InvalidConfig {
                field: "reclaimer.queue_depth".to_string(),
                reason: "Reclamation queue depth must be non-zero".to_string(),
            });
        }

        if self.reclaimer.retry.max_attempts == 0 {
            return Err(BedrockError::InvalidConfig {
                field: "reclaimer.retry.max_attempts".to_string(),
                reason: "At least one removal attempt is required".to_string(),
            });
        }

        if self.reclaimer.retry.multiplier < 1.0 {
            return Err(BedrockError::InvalidConfig {
                field: "reclaimer.retry.multiplier".to_string(),
                reason: "Backoff multiplier must be >= 1.0".to_string(),
            });
        }

        Ok(())
    }

    /// Create a minimal development configuration.
    pub fn development() -> Self {
        Self {
            registry: RegistryConfig {
                staleness: Duration::from_secs(15),
            },
            placement: PlacementConfig { seed: None },
            reclaimer: ReclaimerConfig {
                worker_count: 2,
                queue_depth: 256,
                retry: RetryConfig::quick(),
            },
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// Node registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// A node whose last heartbeat is older than this is not considered
    /// live for chunk placement.
    pub staleness: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            staleness: Duration::from_secs(30),
        }
    }
}

/// Chunk placement configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Fixed RNG seed for deterministic placement. Leave unset in
    /// production; set in tests to make placement reproducible.
    pub seed: Option<u64>,
}

/// Chunk reclamation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReclaimerConfig {
    /// Number of worker tasks consuming removal tasks.
    pub worker_count: usize,
    /// Capacity of the removal task queue.
    pub queue_depth: usize,
    /// Retry policy for failed removals.
    pub retry: RetryConfig,
}

impl Default for ReclaimerConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            queue_depth: 1024,
            retry: RetryConfig::default(),
        }
    }
}

/// Retry configuration with exponential backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Initial delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
    /// Add jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Quick retry configuration for tests and development.
    pub fn quick() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            multiplier: 2.0,
            jitter: false,
        }
    }

    /// Calculate the delay before the retry following `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32 - 1);
        let delay = Duration::from_secs_f64(base.min(self.max_delay.as_secs_f64()));

        if self.jitter {
            // Up to 25% jitter
            let factor = 1.0 + rand::random::<f64>() * 0.25;
            Duration::from_secs_f64(delay.as_secs_f64() * factor)
        } else {
            delay
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Emit logs as JSON.
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
