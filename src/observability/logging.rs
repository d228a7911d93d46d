//! # Structured Logging
//!
//! JSON log lines through `tracing-subscriber`, written to a file by a
//! `tracing-appender` non-blocking worker.
//!
//! No global subscriber is installed. [`LoggingGuard`] sets the subscriber as
//! the thread's default dispatcher and restores the previous one when dropped,
//! flushing the file writer on the way out. Logs never go to stdout: stdout
//! carries the credential provider response.

use std::fmt;
use std::fs::OpenOptions;
use std::path::Path;
use std::str::FromStr;

use tracing::subscriber::{DefaultGuard, NoSubscriber};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, LogConfig};
use crate::errors::{Error, Result};

/// Levels accepted in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub const VALID_VALUES: &'static [&'static str] = &["debug", "info", "warn", "error"];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(Error::configuration(format!(
                "log level is invalid. valid values are: {}",
                LogLevel::VALID_VALUES.join(", ")
            ))),
        }
    }
}

/// Scoped logging sink for one run.
///
/// Fields drop in declaration order: the dispatcher is restored before the
/// worker flushes.
pub struct LoggingGuard {
    _default: DefaultGuard,
    _worker: Option<WorkerGuard>,
}

impl fmt::Debug for LoggingGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingGuard")
            .field("file", &self._worker.is_some())
            .finish()
    }
}

impl LoggingGuard {
    /// Error-level JSON on stderr, used until configuration is loaded.
    pub fn bootstrap() -> Self {
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_max_level(Level::ERROR)
            .with_writer(std::io::stderr)
            .finish();

        Self {
            _default: tracing::subscriber::set_default(subscriber),
            _worker: None,
        }
    }

    /// Discard every event.
    pub fn disabled() -> Self {
        Self {
            _default: tracing::subscriber::set_default(NoSubscriber::default()),
            _worker: None,
        }
    }

    /// Install the configured sink.
    ///
    /// # Errors
    ///
    /// Configuration error for an unknown level, I/O error when the log file
    /// cannot be opened.
    pub fn init(config: &LogConfig) -> Result<Self> {
        if !config.enabled {
            return Ok(Self::disabled());
        }

        let level: LogLevel = config.level.parse()?;
        let path = Path::new(&config.file);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::io_with_source(
                    format!("failed to create log directory {}: {}", parent.display(), e),
                    e,
                )
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                Error::io_with_source(
                    format!("failed to open log file {}: {}", config.file, e),
                    e,
                )
            })?;
        let (writer, worker) = tracing_appender::non_blocking(file);

        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_env_filter(EnvFilter::new(level.as_str()))
            .with_ansi(false)
            .with_writer(writer)
            .finish();

        Ok(Self {
            _default: tracing::subscriber::set_default(subscriber),
            _worker: Some(worker),
        })
    }
}

/// Log the non-secret parts of the effective configuration.
pub fn log_config_info(config: &AppConfig) {
    tracing::info!(
        vault_address = %config.vault.address,
        insecure_skip_verify = config.vault.insecure_skip_verify,
        auth_method = %config.vault.auth.method,
        auth_mount = %config.vault.auth.mount,
        auth_role = %config.vault.auth.role,
        secret_mount = %config.vault.secret.mount,
        secret_path = %config.vault.secret.path,
        log_level = %config.log.level,
        "Credential provider configuration"
    );
}
