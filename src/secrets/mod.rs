//! Secret backend abstraction.
//!
//! The resolver talks to the secret store only through the [`SecretBackend`]
//! trait:
//! - **authenticate**: exchange login credentials for a [`BackendSession`]
//! - **read_secret**: read a KV v2 secret with that session
//!
//! Two implementations are provided: [`VaultSecretBackend`] for HashiCorp Vault
//! and [`InMemorySecretBackend`] holding canned payloads.
//!
//! Token values are wrapped in [`SecretString`] so they never end up in logs.

pub mod client;
pub mod memory;
pub mod types;
pub mod vault;

pub use client::{AuthCredentials, AuthMethod, LoginSettings, SecretBackend};
pub use memory::InMemorySecretBackend;
pub use types::{BackendSession, SecretPayload, SecretString};
pub use vault::{VaultSecretBackend, VaultSecretBackendBuilder};
