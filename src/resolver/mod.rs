//! Credential resolution.
//!
//! Turns a kubelet request into a registry credential:
//!
//! 1. take the service account token from the request
//! 2. log in to the secret backend with it
//! 3. read the configured secret
//! 4. shape `username` and `password` into an [`AuthConfig`]
//!
//! Every step runs once. There are no retries and any failure ends the
//! resolution with the step's name attached.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::{AuthConfig, CredentialProviderRequest};
use crate::errors::{Error, ErrorContext, Result};
use crate::secrets::{LoginSettings, SecretBackend, SecretPayload};

/// Where the resolver logs in and which secret it reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSettings {
    pub login: LoginSettings,
    pub secret_mount: String,
    pub secret_path: String,
}

#[async_trait]
pub trait CredentialResolver: Send + Sync {
    async fn resolve(
        &self,
        cancel: &CancellationToken,
        request: &CredentialProviderRequest,
    ) -> Result<AuthConfig>;
}

pub struct VaultCredentialResolver {
    backend: Arc<dyn SecretBackend>,
    settings: ResolverSettings,
}

impl VaultCredentialResolver {
    pub fn new(backend: Arc<dyn SecretBackend>, settings: ResolverSettings) -> Self {
        Self { backend, settings }
    }
}

/// Build the credential from a secret payload. `username` is checked first.
pub fn shape_credential(payload: &SecretPayload) -> Result<AuthConfig> {
    let username = payload.string_field("username")?;
    let password = payload.string_field("password")?;
    Ok(AuthConfig {
        username: username.to_string(),
        password: password.to_string(),
    })
}

#[async_trait]
impl CredentialResolver for VaultCredentialResolver {
    async fn resolve(
        &self,
        cancel: &CancellationToken,
        request: &CredentialProviderRequest,
    ) -> Result<AuthConfig> {
        let token = request.service_account_token.as_str();
        if token.is_empty() {
            return Err(Error::validation("service account token is required"));
        }

        let credentials = self
            .settings
            .login
            .credentials(token)
            .context("failed to setup vault client")?;
        let session = self
            .backend
            .authenticate(cancel, &credentials)
            .await
            .context("failed to setup vault client")?;
        debug!(method = %credentials.method(), "Authenticated with secret backend");

        let payload = self
            .backend
            .read_secret(
                cancel,
                &session,
                &self.settings.secret_mount,
                &self.settings.secret_path,
            )
            .await
            .context("failed to read secret from vault")
            .context("failed to read auth config from vault")?;
        debug!(fields = payload.len(), "Read registry secret");

        shape_credential(&payload).context("failed to read auth config from vault")
    }
}
