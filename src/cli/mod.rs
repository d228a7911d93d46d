//! # Command Line Interface
//!
//! Flags for the kubelet-invoked binary. Every flag is optional; an absent flag
//! leaves the value from the config file or environment in effect.

use clap::Parser;
use std::path::PathBuf;

use crate::config::ConfigOverrides;

#[derive(Parser, Debug, Clone, Default, PartialEq)]
#[command(name = "kubelet-credential-provider-vault")]
#[command(about = "Kubelet image credential provider backed by HashiCorp Vault")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration file path (YAML, TOML or JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write logs to the log file
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub log_enabled: Option<bool>,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<String>,

    /// Log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Vault server address
    #[arg(long)]
    pub vault_addr: Option<String>,

    /// Skip TLS certificate verification for Vault
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub vault_insecure_skip_verify: Option<bool>,

    /// Vault auth method (kubernetes)
    #[arg(long)]
    pub vault_auth_method: Option<String>,

    /// Mount path of the Vault auth method
    #[arg(long)]
    pub vault_auth_mount: Option<String>,

    /// Vault role to log in as
    #[arg(long)]
    pub vault_auth_role: Option<String>,

    /// KV v2 mount holding the registry credential
    #[arg(long)]
    pub vault_secret_mount: Option<String>,

    /// Path of the registry credential within the mount
    #[arg(long)]
    pub vault_secret_path: Option<String>,
}

impl Cli {
    /// Flag values as the highest-precedence configuration layer
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            log_enabled: self.log_enabled,
            log_file: self.log_file.clone(),
            log_level: self.log_level.clone(),
            vault_address: self.vault_addr.clone(),
            vault_insecure_skip_verify: self.vault_insecure_skip_verify,
            vault_auth_method: self.vault_auth_method.clone(),
            vault_auth_mount: self.vault_auth_mount.clone(),
            vault_auth_role: self.vault_auth_role.clone(),
            vault_secret_mount: self.vault_secret_mount.clone(),
            vault_secret_path: self.vault_secret_path.clone(),
        }
    }
}
