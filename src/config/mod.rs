//! # Configuration Management
//!
//! Settings for the credential provider, merged from defaults, an optional
//! config file, environment variables and command-line flags by
//! [`ConfigLoader`], then validated as a whole.

pub mod loader;
pub mod settings;

pub use loader::{ConfigLoader, ConfigOverrides, DEFAULT_CONFIG_STEM, ENV_BINDINGS};
pub use settings::{
    AppConfig, LogConfig, VaultAuthConfig, VaultConfig, VaultSecretConfig, DEFAULT_LOG_FILE,
};
