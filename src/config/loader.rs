//! Layered configuration loading.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. the config file (`--config`, or `./kubelet-credential-provider-vault.{yaml,yml,toml,json}`)
//! 3. environment variables (a `.env` file is loaded into the environment by the binary)
//! 4. command-line flags
//!
//! Empty environment variables are treated as unset.

use config::{Config, File};
use std::collections::HashMap;
use std::path::PathBuf;

use super::settings::{AppConfig, DEFAULT_LOG_FILE};
use crate::errors::{Error, Result};

/// File stem searched for in the working directory when no file is given
pub const DEFAULT_CONFIG_STEM: &str = "kubelet-credential-provider-vault";

/// Config keys and the environment variables that set them
pub const ENV_BINDINGS: &[(&str, &str)] = &[
    ("log.enabled", "LOG_ENABLED"),
    ("log.file", "LOG_FILE"),
    ("log.level", "LOG_LEVEL"),
    ("vault.address", "VAULT_ADDR"),
    ("vault.insecure_skip_verify", "VAULT_INSECURE_SKIP_VERIFY"),
    ("vault.auth.method", "VAULT_AUTH_METHOD"),
    ("vault.auth.mount", "VAULT_AUTH_MOUNT"),
    ("vault.auth.role", "VAULT_AUTH_ROLE"),
    ("vault.secret.mount", "VAULT_SECRET_MOUNT"),
    ("vault.secret.path", "VAULT_SECRET_PATH"),
];

/// Values given on the command line; `None` leaves lower layers in effect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub log_enabled: Option<bool>,
    pub log_file: Option<String>,
    pub log_level: Option<String>,
    pub vault_address: Option<String>,
    pub vault_insecure_skip_verify: Option<bool>,
    pub vault_auth_method: Option<String>,
    pub vault_auth_mount: Option<String>,
    pub vault_auth_role: Option<String>,
    pub vault_secret_mount: Option<String>,
    pub vault_secret_path: Option<String>,
}

enum EnvSource {
    Process,
    Fixed(HashMap<String, String>),
}

impl EnvSource {
    fn lookup(&self, name: &str) -> Option<String> {
        let value = match self {
            EnvSource::Process => std::env::var(name).ok(),
            EnvSource::Fixed(vars) => vars.get(name).cloned(),
        };
        value.filter(|v| !v.is_empty())
    }
}

/// Builds an [`AppConfig`] from all configuration layers.
pub struct ConfigLoader {
    file: Option<PathBuf>,
    search_dir: PathBuf,
    env: EnvSource,
    overrides: ConfigOverrides,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            file: None,
            search_dir: PathBuf::from("."),
            env: EnvSource::Process,
            overrides: ConfigOverrides::default(),
        }
    }

    /// Explicit config file; it must exist.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Directory searched for the default config file
    pub fn search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dir = dir.into();
        self
    }

    /// Read environment variables from `vars` instead of the process environment
    pub fn env_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.env = EnvSource::Fixed(vars);
        self
    }

    pub fn overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Merge every layer and deserialize. Does not validate.
    pub fn load(&self) -> Result<AppConfig> {
        let mut builder = Config::builder()
            .set_default("log.enabled", true)?
            .set_default("log.file", DEFAULT_LOG_FILE)?
            .set_default("log.level", "info")?
            .set_default("vault.insecure_skip_verify", false)?
            .set_default("vault.auth.method", "kubernetes")?;

        let file = match &self.file {
            Some(path) => File::from(path.as_path()).required(true),
            None => {
                // with_name tries every supported extension
                let stem = self.search_dir.join(DEFAULT_CONFIG_STEM);
                File::with_name(&stem.to_string_lossy()).required(false)
            }
        };
        builder = builder.add_source(file);

        for (key, var) in ENV_BINDINGS {
            builder = builder.set_override_option(*key, self.env.lookup(var))?;
        }

        let o = &self.overrides;
        builder = builder
            .set_override_option("log.enabled", o.log_enabled)?
            .set_override_option("log.file", o.log_file.clone())?
            .set_override_option("log.level", o.log_level.clone())?
            .set_override_option("vault.address", o.vault_address.clone())?
            .set_override_option("vault.insecure_skip_verify", o.vault_insecure_skip_verify)?
            .set_override_option("vault.auth.method", o.vault_auth_method.clone())?
            .set_override_option("vault.auth.mount", o.vault_auth_mount.clone())?
            .set_override_option("vault.auth.role", o.vault_auth_role.clone())?
            .set_override_option("vault.secret.mount", o.vault_secret_mount.clone())?
            .set_override_option("vault.secret.path", o.vault_secret_path.clone())?;

        let config = builder.build()?;
        config.try_deserialize::<AppConfig>().map_err(Error::from)
    }

    /// Load and validate.
    pub fn load_validated(&self) -> Result<AppConfig> {
        let config = self.load()?;
        config.validate()?;
        Ok(config)
    }
}
