//! Core secret backend trait and authentication types.

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;

use super::types::{BackendSession, SecretPayload, SecretString};
use crate::errors::{Error, Result};

/// Authentication methods understood by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// Kubernetes service account token login
    Kubernetes,
}

impl AuthMethod {
    pub const VALID_VALUES: &'static [&'static str] = &["kubernetes"];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Kubernetes => "kubernetes",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "kubernetes" => Ok(AuthMethod::Kubernetes),
            other => Err(Error::unsupported_method(other)),
        }
    }
}

/// Credentials presented to [`SecretBackend::authenticate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthCredentials {
    Kubernetes {
        /// Name of the Kubernetes auth mount
        mount: String,
        /// Vault role bound to the service account
        role: String,
        /// Service account token presented as the login JWT
        token: SecretString,
    },
}

impl AuthCredentials {
    /// Kubernetes login credentials.
    ///
    /// Every missing field is reported, not just the first.
    pub fn kubernetes(
        mount: impl Into<String>,
        role: impl Into<String>,
        token: impl Into<SecretString>,
    ) -> Result<Self> {
        let mount = mount.into();
        let role = role.into();
        let token = token.into();

        let mut missing = Vec::new();
        if mount.is_empty() {
            missing.push("mount is required".to_string());
        }
        if role.is_empty() {
            missing.push("role is required for kubernetes auth method".to_string());
        }
        if token.is_empty() {
            missing.push(
                "service account token is required for kubernetes auth method".to_string(),
            );
        }
        if !missing.is_empty() {
            return Err(Error::configuration_issues(missing));
        }

        Ok(AuthCredentials::Kubernetes { mount, role, token })
    }

    pub fn method(&self) -> AuthMethod {
        match self {
            AuthCredentials::Kubernetes { .. } => AuthMethod::Kubernetes,
        }
    }

    /// Auth mount the login is sent to
    pub fn mount(&self) -> &str {
        match self {
            AuthCredentials::Kubernetes { mount, .. } => mount,
        }
    }
}

/// Login configuration shared by every resolution.
///
/// Names the auth method, where it is mounted and which role to request. The
/// token is not part of it: it arrives with each kubelet request and is only
/// checked once [`LoginSettings::credentials`] combines the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSettings {
    /// Auth method name as configured; parsed when credentials are built
    pub method: String,
    pub mount: String,
    pub role: String,
}

impl LoginSettings {
    pub fn new(
        method: impl Into<String>,
        mount: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            mount: mount.into(),
            role: role.into(),
        }
    }

    /// Every problem with the settings, in a fixed order.
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        let method = match self.method.as_str() {
            "" => {
                issues.push("auth method is required".to_string());
                None
            }
            name => match name.parse::<AuthMethod>() {
                Ok(method) => Some(method),
                Err(e) => {
                    issues.push(e.to_string());
                    None
                }
            },
        };

        if self.mount.is_empty() {
            issues.push("mount is required".to_string());
        }
        if method == Some(AuthMethod::Kubernetes) && self.role.is_empty() {
            issues.push("role is required for kubernetes auth method".to_string());
        }

        issues
    }

    /// Combine the settings with a request's token.
    ///
    /// # Errors
    ///
    /// - unsupported method error if the method is not implemented
    /// - configuration error listing every missing login field
    pub fn credentials(&self, token: impl Into<SecretString>) -> Result<AuthCredentials> {
        match self.method.parse::<AuthMethod>()? {
            AuthMethod::Kubernetes => {
                AuthCredentials::kubernetes(self.mount.as_str(), self.role.as_str(), token)
            }
        }
    }
}

/// Capability to authenticate against a secret store and read KV v2 secrets.
///
/// # Security Considerations
///
/// - Implementations MUST NOT log tokens or secret values
/// - A session is used for exactly one resolution and never cached
///
/// Both operations race against `cancel` and return an I/O error once it fires.
#[async_trait]
pub trait SecretBackend: Send + Sync {
    /// Exchange login credentials for a session.
    ///
    /// # Errors
    ///
    /// - authentication error on any rejection or transport failure
    async fn authenticate(
        &self,
        cancel: &CancellationToken,
        credentials: &AuthCredentials,
    ) -> Result<BackendSession>;

    /// Read the latest version of the secret at `mount`/`path`.
    ///
    /// # Errors
    ///
    /// - not found error if nothing is stored at the coordinate
    /// - authorization error if the session may not read it
    /// - I/O error for any other failure
    async fn read_secret(
        &self,
        cancel: &CancellationToken,
        session: &BackendSession,
        mount: &str,
        path: &str,
    ) -> Result<SecretPayload>;
}
