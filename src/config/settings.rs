//! # Configuration Settings
//!
//! Defines the configuration structure for the credential provider.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{Error, Result};
use crate::observability::LogLevel;
use crate::resolver::ResolverSettings;
use crate::secrets::{AuthMethod, LoginSettings};

/// Default log file, relative to the kubelet's working directory
pub const DEFAULT_LOG_FILE: &str = "kubelet-credential-provider-vault.log";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Logging configuration
    #[validate(nested)]
    pub log: LogConfig,

    /// Vault connection, login and secret location
    #[validate(nested)]
    pub vault: VaultConfig,
}

impl AppConfig {
    /// Validate the entire configuration.
    ///
    /// Every problem is reported, sorted, in a single configuration error.
    pub fn validate(&self) -> Result<()> {
        let mut issues = match Validate::validate(self) {
            Ok(()) => Vec::new(),
            Err(errors) => match Error::from(errors) {
                Error::Configuration(issues) => issues,
                other => vec![other.to_string()],
            },
        };

        issues.extend(self.validate_custom());

        if issues.is_empty() {
            return Ok(());
        }
        issues.sort();
        issues.dedup();
        Err(Error::configuration_issues(issues))
    }

    /// Checks that go beyond what the validator derive expresses
    fn validate_custom(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !self.vault.auth.method.is_empty()
            && self.vault.auth.method.parse::<AuthMethod>().is_err()
        {
            issues.push(format!(
                "vault auth method is invalid. valid values are: {}",
                AuthMethod::VALID_VALUES.join(", ")
            ));
        }

        if !self.log.level.is_empty() && self.log.level.parse::<LogLevel>().is_err() {
            issues.push(format!(
                "log level is invalid. valid values are: {}",
                LogLevel::VALID_VALUES.join(", ")
            ));
        }

        issues
    }

    /// Auth method, mount and role used to log in to Vault
    pub fn login_settings(&self) -> LoginSettings {
        LoginSettings::new(
            self.vault.auth.method.as_str(),
            self.vault.auth.mount.as_str(),
            self.vault.auth.role.as_str(),
        )
    }

    /// Login and secret coordinates for the resolver
    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            login: self.login_settings(),
            secret_mount: self.vault.secret.mount.clone(),
            secret_path: self.vault.secret.path.clone(),
        }
    }
}

/// Log sink configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Write logs at all
    pub enabled: bool,

    /// File the JSON log lines are appended to
    #[validate(length(min = 1, message = "log file is required"))]
    pub file: String,

    /// One of debug, info, warn, error
    #[validate(length(min = 1, message = "log level is required"))]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file: DEFAULT_LOG_FILE.to_string(),
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default, PartialEq)]
#[serde(default)]
pub struct VaultConfig {
    /// Vault server address, e.g. https://vault.example.com:8200
    #[validate(length(min = 1, message = "vault address is required"))]
    pub address: String,

    /// Skip TLS certificate verification
    pub insecure_skip_verify: bool,

    #[validate(nested)]
    pub auth: VaultAuthConfig,

    #[validate(nested)]
    pub secret: VaultSecretConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(default)]
pub struct VaultAuthConfig {
    #[validate(length(min = 1, message = "vault auth method is required"))]
    pub method: String,

    /// Mount path of the auth method
    #[validate(length(min = 1, message = "vault auth mount is required"))]
    pub mount: String,

    #[validate(length(min = 1, message = "vault auth role is required"))]
    pub role: String,
}

impl Default for VaultAuthConfig {
    fn default() -> Self {
        Self {
            method: AuthMethod::Kubernetes.to_string(),
            mount: String::new(),
            role: String::new(),
        }
    }
}

/// KV v2 location of the registry credential
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default, PartialEq)]
#[serde(default)]
pub struct VaultSecretConfig {
    #[validate(length(min = 1, message = "vault secret mount is required"))]
    pub mount: String,

    #[validate(length(min = 1, message = "vault secret path is required"))]
    pub path: String,
}
