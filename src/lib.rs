//! # Vault Credential Provider
//!
//! A kubelet image credential provider plugin that hands out container registry
//! credentials stored in HashiCorp Vault.
//!
//! The kubelet runs the plugin once per image pull. The plugin reads a
//! `CredentialProviderRequest` from stdin, logs in to Vault with the pod's
//! service account token, reads a KV v2 secret holding `username` and
//! `password`, and writes a `CredentialProviderResponse` keyed by the image's
//! registry host to stdout.
//!
//! ## Architecture
//!
//! ```text
//! stdin → Transport → CredentialProvider → CredentialResolver → SecretBackend → Vault
//!                             ↓
//! stdout ← Transport ← registry host + AuthConfig
//! ```
//!
//! ## Core Components
//!
//! - **Transport** ([`transport`]): single-shot request/response framing
//! - **Secret backend** ([`secrets`]): Vault login and KV v2 reads, plus an in-memory double
//! - **Resolver** ([`resolver`]): token → session → secret → credential
//! - **Provider** ([`provider`]): routes one request through the pipeline

pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod provider;
pub mod resolver;
pub mod secrets;
pub mod startup;
pub mod transport;

pub use errors::{Error, ErrorKind, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Binary name the kubelet is configured with
pub const APP_NAME: &str = "kubelet-credential-provider-vault";
