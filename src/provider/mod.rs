//! Request routing for a single plugin invocation.
//!
//! Reads the kubelet's request, resolves a credential, keys it by the image's
//! registry host and writes the response. Nothing is written unless every step
//! before the write succeeded.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::{registry_host, CredentialProviderResponse};
use crate::errors::{ErrorContext, Result};
use crate::resolver::CredentialResolver;
use crate::transport::Transport;

pub struct CredentialProvider<T, C> {
    transport: T,
    resolver: C,
}

impl<T, C> CredentialProvider<T, C>
where
    T: Transport,
    C: CredentialResolver,
{
    pub fn new(transport: T, resolver: C) -> Self {
        Self {
            transport,
            resolver,
        }
    }

    /// Serve exactly one request.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<()> {
        let request = self
            .transport
            .read_request(cancel)
            .await
            .context("failed to read request")?;
        debug!(image = %request.image, "Received credential provider request");

        let auth = self
            .resolver
            .resolve(cancel, &request)
            .await
            .context("failed to fetch credentials")?;

        let registry = registry_host(&request.image)
            .context("failed to extract registry name")?;
        let response = CredentialProviderResponse::for_registry(registry, auth);

        self.transport
            .write_response(cancel, &response)
            .await
            .context("failed to write response")?;

        info!(image = %request.image, registry = %registry, "Returned registry credentials");
        Ok(())
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}
