//! In-memory secret backend for tests and local runs.
//!
//! Holds canned payloads keyed by `(mount, path)` and counts calls so tests can
//! assert that a step never reached the backend.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

use super::client::{AuthCredentials, SecretBackend};
use super::types::{BackendSession, SecretPayload};
use crate::errors::{Error, Result};

/// Token handed out by successful logins.
pub const MEMORY_SESSION_TOKEN: &str = "memory-session-token";

#[derive(Debug, Default)]
pub struct InMemorySecretBackend {
    secrets: HashMap<(String, String), SecretPayload>,
    reject_logins: bool,
    logins: AtomicUsize,
    reads: AtomicUsize,
}

impl InMemorySecretBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a payload at `mount`/`path`.
    pub fn with_secret(
        mut self,
        mount: impl Into<String>,
        path: impl Into<String>,
        payload: SecretPayload,
    ) -> Self {
        self.secrets.insert((mount.into(), path.into()), payload);
        self
    }

    /// Reject every login attempt.
    pub fn rejecting_logins(mut self) -> Self {
        self.reject_logins = true;
        self
    }

    pub fn login_attempts(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn read_attempts(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretBackend for InMemorySecretBackend {
    async fn authenticate(
        &self,
        cancel: &CancellationToken,
        credentials: &AuthCredentials,
    ) -> Result<BackendSession> {
        self.logins.fetch_add(1, Ordering::SeqCst);

        if cancel.is_cancelled() {
            return Err(Error::io("vault login cancelled"));
        }
        if self.reject_logins {
            return Err(Error::authentication(format!(
                "login rejected by auth mount {}",
                credentials.mount()
            ))
            .with_context("failed to authenticate with kubernetes"));
        }

        Ok(BackendSession::new(MEMORY_SESSION_TOKEN))
    }

    async fn read_secret(
        &self,
        cancel: &CancellationToken,
        session: &BackendSession,
        mount: &str,
        path: &str,
    ) -> Result<SecretPayload> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        if cancel.is_cancelled() {
            return Err(Error::io("vault read cancelled"));
        }
        if session.token.expose_secret() != MEMORY_SESSION_TOKEN {
            return Err(Error::authorization(format!(
                "permission denied reading {}/{}",
                mount, path
            )));
        }

        self.secrets
            .get(&(mount.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| Error::not_found(format!("no secret found at {}/{}", mount, path)))
    }
}
