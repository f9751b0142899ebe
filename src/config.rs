//! Bridge configuration.
//!
//! Loads configuration from a TOML file. Every endpoint and tuning constant
//! is externalized here, with defaults matching the studio deployment the
//! bridge was built for, so it also runs without a config file.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub acquisition: AcquisitionConfig,
    pub osc: OscConfig,
    pub telemetry: TelemetryConfig,
    pub analyzer: AnalyzerConfig,
    pub logging: LoggingConfig,
}

/// Acquisition-server endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AcquisitionConfig {
    pub host: String,
    /// One TCP port per channel. Connection order fixes the roles:
    /// command, response, data, analyses.
    pub ports: [u16; 4],
}

/// OSC endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OscConfig {
    /// Destination for outbound telemetry messages
    pub telemetry_addr: String,
    /// Bind address of the inbound control server
    pub control_bind: String,
}

/// Telemetry forwarding parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// Scale factor applied to every raw sample value
    pub data_multiplier: f64,
    /// Emitted-timestamp window capacity for the data stream
    pub dedup_window: usize,
}

/// Analyzer defaults registered at startup
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalyzerConfig {
    /// Device the trigger conditions read from
    pub device: String,
    /// Device providing the analyzer's time reference
    pub time_reference: String,
    pub learning_rate: f64,
    /// Initial phase durations in milliseconds
    pub initial_phase_durations: Vec<u32>,
    /// 1-based trigger channels
    pub left_channel: u32,
    pub right_channel: u32,
    pub left_threshold: f64,
    pub right_threshold: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Defaults matching the original studio deployment
    ///
    /// Suitable for local testing against an acquisition server on the same
    /// machine. Production deployments should use a TOML configuration file.
    pub fn studio_defaults() -> Self {
        Self {
            acquisition: AcquisitionConfig {
                host: "127.0.0.1".to_string(),
                ports: [5123, 5124, 5125, 5126],
            },
            osc: OscConfig {
                telemetry_addr: "127.0.0.1:8000".to_string(),
                control_bind: "127.0.0.1:8001".to_string(),
            },
            telemetry: TelemetryConfig {
                data_multiplier: 10000.0,
                dedup_window: 65536,
            },
            analyzer: AnalyzerConfig {
                device: "DelsysEmgDataCollector".to_string(),
                time_reference: "DelsysEmgDataCollector".to_string(),
                learning_rate: 0.5,
                initial_phase_durations: vec![400, 600],
                left_channel: 13,
                right_channel: 14,
                left_threshold: 5.0,
                right_threshold: 5.0,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::studio_defaults()
    }
}
