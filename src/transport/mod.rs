//! Request/response framing between the kubelet and the plugin.
//!
//! A [`Transport`] reads exactly one [`CredentialProviderRequest`] and writes
//! exactly one [`CredentialProviderResponse`]. [`StreamTransport`] implements it
//! over any async reader/writer pair; the binary uses stdin/stdout, with stdin
//! drained by a [`DetachedReader`].

pub mod stream;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::{CredentialProviderRequest, CredentialProviderResponse};
use crate::domain::{API_VERSION, REQUEST_KIND};
use crate::errors::{Error, Result};

pub use stream::{DetachedReader, StreamTransport};

#[async_trait]
pub trait Transport: Send {
    /// Consume the whole input and decode one request.
    ///
    /// Fails with an I/O error when the read fails or `cancel` fires first, and
    /// with a protocol error when the payload is not a recognized request.
    async fn read_request(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<CredentialProviderRequest>;

    /// Encode and write the response, then flush.
    async fn write_response(
        &mut self,
        cancel: &CancellationToken,
        response: &CredentialProviderResponse,
    ) -> Result<()>;
}

/// Decode a request payload and check its version and kind.
pub fn decode_request(payload: &[u8]) -> Result<CredentialProviderRequest> {
    let request: CredentialProviderRequest = serde_json::from_slice(payload)
        .map_err(|e| Error::protocol(format!("failed to unmarshal request: {}", e)))?;

    if request.api_version != API_VERSION {
        return Err(Error::protocol(format!(
            "invalid request: expected apiVersion {}, got {}",
            API_VERSION, request.api_version
        )));
    }
    if request.kind != REQUEST_KIND {
        return Err(Error::protocol(format!(
            "invalid request: expected kind {}, got {}",
            REQUEST_KIND, request.kind
        )));
    }

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_decode_valid_request() {
        let payload = br#"{
            "apiVersion": "credentialprovider.kubelet.k8s.io/v1",
            "kind": "CredentialProviderRequest",
            "image": "registry.example.com/app:1",
            "serviceAccountToken": "tok"
        }"#;

        let request = decode_request(payload).unwrap();
        assert_eq!(request.image, "registry.example.com/app:1");
        assert_eq!(request.service_account_token, "tok");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_request(b"not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(err
            .to_string()
            .starts_with("failed to unmarshal request: "));
    }

    #[test]
    fn test_decode_rejects_empty_input() {
        let err = decode_request(b"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_decode_rejects_other_api_version() {
        let payload = br#"{
            "apiVersion": "credentialprovider.kubelet.k8s.io/v1beta1",
            "kind": "CredentialProviderRequest",
            "image": "registry.example.com/app:1"
        }"#;

        let err = decode_request(payload).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(
            err.to_string(),
            "invalid request: expected apiVersion credentialprovider.kubelet.k8s.io/v1, \
             got credentialprovider.kubelet.k8s.io/v1beta1"
        );
    }

    #[test]
    fn test_decode_rejects_other_kind() {
        let payload = br#"{
            "apiVersion": "credentialprovider.kubelet.k8s.io/v1",
            "kind": "CredentialProviderResponse",
            "image": "registry.example.com/app:1"
        }"#;

        let err = decode_request(payload).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid request: expected kind CredentialProviderRequest, \
             got CredentialProviderResponse"
        );
    }
}
