//! Tracing setup for embedders and the CLI
//!
//! Renderers that own the terminal cannot share stdout with log output, so
//! logs can be sent to a file instead of stderr.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Default log file name when file logging is requested without a path
pub const DEFAULT_LOG_FILE: &str = "panelflow.log";

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default filter directive (overridden by `RUST_LOG`)
    pub level: String,
    /// Write to this file (truncated on start) instead of stderr
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl LogConfig {
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Filter from `RUST_LOG`, falling back to `level`
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }
}

/// Install the global tracing subscriber. Call once per process.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(config.filter());

    match &config.file {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create log directory {:?}", dir))?;
            }
            let file = File::create(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;
        }
        None => {
            builder
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;
        }
    }

    tracing::debug!(level = %config.level, file = ?config.file, "logging initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_logs_info_to_stderr() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.file.is_none());
    }

    #[test]
    fn builder_methods_set_fields() {
        let config = LogConfig::default()
            .with_level("debug")
            .with_file(DEFAULT_LOG_FILE);
        assert_eq!(config.level, "debug");
        assert_eq!(config.file, Some(PathBuf::from("panelflow.log")));
    }
}
