//! # Observability Infrastructure
//!
//! Structured logging for the credential provider.

pub mod logging;

pub use logging::{log_config_info, LogLevel, LoggingGuard};
