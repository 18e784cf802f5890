//! Logging configuration and initialization.
//!
//! Supports JSON and pretty-printed formats with configurable output paths.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON structured logging (default for production).
    #[default]
    Json,
    /// Human-readable pretty printing (for development).
    Pretty,
}

impl LogFormat {
    /// Parse a format name; unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Log level filter (e.g., "info", "debug", "semroute=trace").
    pub level: String,
    /// Optional file path for log output. If None, logs to stderr.
    pub output_path: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            level: "info".to_string(),
            output_path: None,
        }
    }
}

/// Errors that can occur during logging initialization.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),
    #[error("Failed to open log file: {0}")]
    FileOpen(String),
    #[error("Subscriber already initialized")]
    AlreadyInitialized,
}

/// Initialize the tracing subscriber with the given configuration.
///
/// Call once at host startup; later calls fail with `AlreadyInitialized`.
pub fn init_logging(config: &LogConfig) -> Result<(), LogError> {
    let filter =
        EnvFilter::try_new(&config.level).map_err(|e| LogError::InvalidFilter(e.to_string()))?;

    match config.format {
        LogFormat::Json => init_json_subscriber(filter, config.output_path.as_ref()),
        LogFormat::Pretty => init_pretty_subscriber(filter),
    }
}

fn init_json_subscriber(filter: EnvFilter, path: Option<&PathBuf>) -> Result<(), LogError> {
    let registry = tracing_subscriber::registry().with(filter);

    if let Some(path) = path {
        let file = std::fs::File::create(path).map_err(|e| LogError::FileOpen(e.to_string()))?;
        registry
            .with(fmt::layer().json().with_writer(std::sync::Mutex::new(file)))
            .try_init()
            .map_err(|_| LogError::AlreadyInitialized)?;
    } else {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .map_err(|_| LogError::AlreadyInitialized)?;
    }

    Ok(())
}

fn init_pretty_subscriber(filter: EnvFilter) -> Result<(), LogError> {
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().pretty().with_writer(std::io::stderr))
        .try_init()
        .map_err(|_| LogError::AlreadyInitialized)?;
    Ok(())
}
