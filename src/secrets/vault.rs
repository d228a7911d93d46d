//! HashiCorp Vault secret backend.
//!
//! Logs in through the Kubernetes auth method (`POST /v1/auth/<mount>/login`)
//! and reads KV v2 secrets (`GET /v1/<mount>/data/<path>`). A fresh
//! [`VaultClient`] is built for every call; nothing is pooled between the
//! login and the read.
//!
//! # Example
//!
//! ```rust,ignore
//! use vault_credential_provider::secrets::{LoginSettings, SecretBackend, VaultSecretBackend};
//!
//! let login = LoginSettings::new("kubernetes", "kubernetes", "image-puller");
//! let backend = VaultSecretBackend::builder()
//!     .address("https://vault.example.com")
//!     .login(login.clone())
//!     .build()?;
//! let session = backend.authenticate(&cancel, &login.credentials(sa_token)?).await?;
//! let secret = backend.read_secret(&cancel, &session, "secret", "registry/creds").await?;
//! ```
//!
//! # Security
//!
//! - Tokens are never logged
//! - TLS verification can only be disabled explicitly, and doing so logs a warning

use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;

use super::client::{AuthCredentials, LoginSettings, SecretBackend};
use super::types::{BackendSession, SecretPayload};
use crate::errors::{Error, ErrorContext, Result};

/// Builder for [`VaultSecretBackend`].
///
/// Login settings are optional. When given, [`build`](Self::build) checks them
/// together with the address, so one error lists every problem. The service
/// account token is checked per login, since it arrives with each request.
#[derive(Debug, Clone, Default)]
pub struct VaultSecretBackendBuilder {
    address: Option<String>,
    insecure_skip_verify: bool,
    login: Option<LoginSettings>,
}

impl VaultSecretBackendBuilder {
    /// Vault server address, e.g. `https://vault.example.com:8200`
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Disable TLS certificate verification
    pub fn insecure_skip_verify(mut self, skip: bool) -> Self {
        self.insecure_skip_verify = skip;
        self
    }

    /// Auth method, mount and role the backend will be logged in with
    pub fn login(mut self, login: LoginSettings) -> Self {
        self.login = Some(login);
        self
    }

    /// Validate the settings and build the backend.
    ///
    /// # Errors
    ///
    /// Configuration error listing every problem found.
    pub fn build(self) -> Result<VaultSecretBackend> {
        let mut issues = Vec::new();

        let address = self.address.unwrap_or_default();
        if address.is_empty() {
            issues.push("address is required".to_string());
        } else if let Err(e) = url::Url::parse(&address) {
            issues.push(format!("address is not a valid url: {}", e));
        }

        if let Some(login) = &self.login {
            issues.extend(login.issues());
        }

        if !issues.is_empty() {
            return Err(Error::configuration_issues(issues));
        }

        if self.insecure_skip_verify {
            tracing::warn!(
                address = %address,
                "TLS certificate verification is disabled for Vault connections"
            );
        }

        Ok(VaultSecretBackend {
            address,
            insecure_skip_verify: self.insecure_skip_verify,
        })
    }
}

/// Live Vault implementation of [`SecretBackend`].
#[derive(Clone)]
pub struct VaultSecretBackend {
    address: String,
    insecure_skip_verify: bool,
}

impl std::fmt::Debug for VaultSecretBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSecretBackend")
            .field("address", &self.address)
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .finish()
    }
}

impl VaultSecretBackend {
    pub fn builder() -> VaultSecretBackendBuilder {
        VaultSecretBackendBuilder::default()
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn client(&self, token: &str) -> Result<VaultClient> {
        let settings = VaultClientSettingsBuilder::default()
            .address(&self.address)
            .verify(!self.insecure_skip_verify)
            .token(token)
            .build()
            .map_err(|e| Error::io(format!("invalid vault client settings: {}", e)))?;

        VaultClient::new(settings)
            .map_err(|e| Error::io(format!("failed to create vault client: {}", e)))
    }
}

/// Race a backend call against cancellation.
async fn cancellable<T, F>(cancel: &CancellationToken, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(Error::io(format!("{} cancelled", operation))),
        result = fut => result,
    }
}

fn read_error(error: ClientError, mount: &str, path: &str) -> Error {
    match error {
        ClientError::APIError { code: 404, .. } => {
            Error::not_found(format!("no secret found at {}/{}", mount, path))
        }
        ClientError::APIError { code: 403, errors } => Error::authorization(format!(
            "permission denied reading {}/{}: {}",
            mount,
            path,
            errors.join(", ")
        )),
        other => Error::io(format!("vault request failed: {}", other)),
    }
}

#[async_trait]
impl SecretBackend for VaultSecretBackend {
    async fn authenticate(
        &self,
        cancel: &CancellationToken,
        credentials: &AuthCredentials,
    ) -> Result<BackendSession> {
        match credentials {
            AuthCredentials::Kubernetes { mount, role, token } => {
                tracing::debug!(
                    address = %self.address,
                    mount = %mount,
                    role = %role,
                    "Logging in to Vault"
                );

                let login = async {
                    let client = self
                        .client("")
                        .map_err(|e| Error::authentication(e.to_string()))?;
                    vaultrs::auth::kubernetes::login(&client, mount, role, token.expose_secret())
                        .await
                        .map_err(|e| {
                            tracing::error!(
                                error = %e,
                                mount = %mount,
                                role = %role,
                                "Vault login rejected"
                            );
                            Error::authentication(e.to_string())
                        })
                };

                let auth = cancellable(cancel, "vault login", login)
                    .await
                    .context("failed to authenticate with kubernetes")?;

                tracing::debug!(
                    policies = ?auth.policies,
                    lease_duration = auth.lease_duration,
                    "Vault login succeeded"
                );

                Ok(BackendSession::new(auth.client_token)
                    .with_policies(auth.policies)
                    .with_lease_duration(auth.lease_duration))
            }
        }
    }

    async fn read_secret(
        &self,
        cancel: &CancellationToken,
        session: &BackendSession,
        mount: &str,
        path: &str,
    ) -> Result<SecretPayload> {
        tracing::debug!(mount = %mount, path = %path, "Reading secret from Vault");

        let read = async {
            let client = self.client(session.token.expose_secret())?;
            vaultrs::kv2::read::<HashMap<String, serde_json::Value>>(&client, mount, path)
                .await
                .map_err(|e| {
                    tracing::error!(
                        error = %e,
                        mount = %mount,
                        path = %path,
                        "Failed to read secret from Vault"
                    );
                    read_error(e, mount, path)
                })
        };

        let fields = cancellable(cancel, "vault read", read).await?;
        Ok(SecretPayload::new(fields))
    }
}
