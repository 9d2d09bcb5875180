//! Logging configuration and initialization
//!
//! Console output is compact text by default or JSON on request; an optional
//! log file is written through a non-blocking appender.

use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::settings::PlayerSettings;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "VIDEO_BRIDGE_LOG";
/// Environment variable selecting the console format ("json")
pub const LOG_FORMAT_ENV: &str = "VIDEO_BRIDGE_LOG_FORMAT";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Enable console output (default: true)
    pub console_enabled: bool,
    /// Write logs to this file as well
    pub file_path: Option<PathBuf>,
    /// Use JSON format for console logs (default: false)
    pub json_format: bool,
    /// Filter used when no environment override is set (default: "info")
    pub default_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_enabled: true,
            file_path: None,
            json_format: false,
            default_level: "info".to_string(),
        }
    }
}

impl LogConfig {
    pub fn from_settings(settings: &PlayerSettings) -> Self {
        Self {
            file_path: settings.log_file.as_ref().map(PathBuf::from),
            default_level: settings.log_level.clone(),
            ..Self::default()
        }
    }

    /// JSON console output, from the environment or the config.
    fn use_json(&self) -> bool {
        std::env::var(LOG_FORMAT_ENV)
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(self.json_format)
    }

    /// `VIDEO_BRIDGE_LOG`, then `RUST_LOG`, then the configured level.
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
            .or_else(|_| EnvFilter::try_new(&self.default_level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

#[derive(Error, Debug)]
pub enum LogError {
    #[error("Failed to create log file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Logging already initialized: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Initialize the logging system with the given configuration
///
/// Returns a guard that must be kept alive for the duration of the program
/// when file logging is enabled.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>, LogError> {
    let use_json = config.use_json();

    let (file_layer, file_guard) = match &config.file_path {
        Some(path) => {
            let file = std::fs::File::create(path).map_err(|source| LogError::File {
                path: path.clone(),
                source,
            })?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false); // No ANSI colors in file
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let json_layer = (config.console_enabled && use_json).then(|| {
        fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
    });

    let console_layer = (config.console_enabled && !use_json).then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(file_layer)
        .with(json_layer)
        .with(console_layer)
        .try_init()?;

    tracing::info!(
        target: "video_bridge",
        version = env!("CARGO_PKG_VERSION"),
        json_format = use_json,
        log_file = ?config.file_path,
        "Logging initialized"
    );

    Ok(file_guard)
}
