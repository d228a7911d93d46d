//! Integration tests for the full credential provider pipeline
//!
//! Each test drives one invocation through the public API: a request on an
//! in-memory input stream, the in-memory secret backend, and the response
//! captured from the output stream.

use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use vault_credential_provider::config::{AppConfig, VaultAuthConfig, VaultConfig, VaultSecretConfig};
use vault_credential_provider::domain::{AuthConfig, CredentialProviderResponse};
use vault_credential_provider::secrets::{InMemorySecretBackend, SecretPayload};
use vault_credential_provider::startup::serve_with;
use vault_credential_provider::transport::StreamTransport;
use vault_credential_provider::{ErrorKind, Result};

// ============================================================================
// Fixtures
// ============================================================================

fn config() -> AppConfig {
    AppConfig {
        vault: VaultConfig {
            address: "https://vault.example.com".to_string(),
            insecure_skip_verify: false,
            auth: VaultAuthConfig {
                method: "kubernetes".to_string(),
                mount: "kubernetes".to_string(),
                role: "image-puller".to_string(),
            },
            secret: VaultSecretConfig {
                mount: "secret".to_string(),
                path: "registry/creds".to_string(),
            },
        },
        ..Default::default()
    }
}

fn backend(payload: serde_json::Value) -> Arc<InMemorySecretBackend> {
    let payload: SecretPayload = serde_json::from_value(payload).unwrap();
    let backend = InMemorySecretBackend::new()
        .with_secret("secret", "registry/creds", payload);
    Arc::new(backend)
}

fn request(image: &str, token: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "apiVersion": "credentialprovider.kubelet.k8s.io/v1",
        "kind": "CredentialProviderRequest",
        "image": image,
        "serviceAccountToken": token,
    }))
    .unwrap()
}

/// Run one invocation, returning the result and everything written to the output.
async fn invoke(backend: Arc<InMemorySecretBackend>, input: &[u8]) -> (Result<()>, Vec<u8>) {
    let mut output = Vec::new();
    let result = serve_with(
        &config(),
        StreamTransport::new(input, &mut output),
        backend,
        &CancellationToken::new(),
    )
    .await;
    (result, output)
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_resolves_registry_credentials() {
    let backend = backend(json!({"username": "u", "password": "p"}));
    let input = request("registry.example.com/my-image:latest", "tok");

    let (result, output) = invoke(backend.clone(), &input).await;
    result.unwrap();

    let written: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(
        written,
        json!({
            "apiVersion": "credentialprovider.kubelet.k8s.io/v1",
            "kind": "CredentialProviderResponse",
            "cacheKeyType": "Registry",
            "auth": {"registry.example.com": {"username": "u", "password": "p"}}
        })
    );
    assert!(output.ends_with(b"\n"));
    assert_eq!(backend.login_attempts(), 1);
    assert_eq!(backend.read_attempts(), 1);
}

#[tokio::test]
async fn test_image_without_registry_writes_nothing() {
    let backend = backend(json!({"username": "u", "password": "p"}));
    let input = request("my-image:latest", "tok");

    let (result, output) = invoke(backend, &input).await;
    let err = result.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(
        err.to_string(),
        "failed to extract registry name: no registry name found in image name: my-image:latest"
    );
    assert!(output.is_empty());
}

#[tokio::test]
async fn test_empty_token_skips_backend() {
    let backend = backend(json!({"username": "u", "password": "p"}));
    let input = request("registry.example.com/my-image:latest", "");

    let (result, output) = invoke(backend.clone(), &input).await;
    let err = result.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(
        err.to_string(),
        "failed to fetch credentials: service account token is required"
    );
    assert_eq!(backend.login_attempts(), 0);
    assert_eq!(backend.read_attempts(), 0);
    assert!(output.is_empty());
}

#[tokio::test]
async fn test_absent_token_field_is_treated_as_empty() {
    let backend = backend(json!({"username": "u", "password": "p"}));
    let input = serde_json::to_vec(&json!({
        "apiVersion": "credentialprovider.kubelet.k8s.io/v1",
        "kind": "CredentialProviderRequest",
        "image": "registry.example.com/my-image:latest",
    }))
    .unwrap();

    let (result, _) = invoke(backend.clone(), &input).await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::Validation);
    assert_eq!(backend.login_attempts(), 0);
}

#[tokio::test]
async fn test_secret_without_username() {
    let backend = backend(json!({"password": "p"}));
    let input = request("registry.example.com/my-image:latest", "tok");

    let (result, output) = invoke(backend, &input).await;
    let err = result.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MalformedSecret);
    assert_eq!(
        err.to_string(),
        "failed to fetch credentials: failed to read auth config from vault: \
         failed to read username from secret data"
    );
    assert!(output.is_empty());
}

#[tokio::test]
async fn test_secret_without_either_field_cites_username() {
    let backend = backend(json!({"token": "irrelevant"}));
    let input = request("registry.example.com/my-image:latest", "tok");

    let (result, _) = invoke(backend, &input).await;

    let err = result.unwrap_err();
    assert_eq!(
        err.root().to_string(),
        "failed to read username from secret data"
    );
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test]
async fn test_credentials_equal_secret_fields_exactly() {
    let backend = backend(json!({
        "username": "robot$ci+pull",
        "password": "  spaces and \"quotes\" ",
        "email": "ignored@example.com"
    }));
    let input = request("quay.io:443/org/app@sha256:0123", "tok");

    let (result, output) = invoke(backend, &input).await;
    result.unwrap();

    let response: CredentialProviderResponse = serde_json::from_slice(&output).unwrap();
    assert_eq!(
        response.auth.get("quay.io:443"),
        Some(&AuthConfig {
            username: "robot$ci+pull".to_string(),
            password: "  spaces and \"quotes\" ".to_string(),
        })
    );
}

#[tokio::test]
async fn test_repeated_invocations_are_identical() {
    let backend = backend(json!({"username": "u", "password": "p"}));
    let input = request("registry.example.com/team/app:2", "tok");

    let (first, first_output) = invoke(backend.clone(), &input).await;
    let (second, second_output) = invoke(backend.clone(), &input).await;
    first.unwrap();
    second.unwrap();

    let first: CredentialProviderResponse = serde_json::from_slice(&first_output).unwrap();
    let second: CredentialProviderResponse = serde_json::from_slice(&second_output).unwrap();
    assert_eq!(first, second);
    assert_eq!(backend.login_attempts(), 2);
}

#[tokio::test]
async fn test_response_round_trip() {
    let backend = backend(json!({"username": "u", "password": "p"}));
    let input = request("registry.example.com/my-image:latest", "tok");

    let (result, output) = invoke(backend, &input).await;
    result.unwrap();

    let response: CredentialProviderResponse = serde_json::from_slice(&output).unwrap();
    let reencoded = serde_json::to_vec(&response).unwrap();
    let decoded: CredentialProviderResponse = serde_json::from_slice(&reencoded).unwrap();

    assert_eq!(decoded.auth, response.auth);
    assert_eq!(decoded.auth.len(), 1);
}

// ============================================================================
// Framing failures
// ============================================================================

#[tokio::test]
async fn test_wrong_api_version_is_protocol_error() {
    let backend = backend(json!({"username": "u", "password": "p"}));
    let input = serde_json::to_vec(&json!({
        "apiVersion": "credentialprovider.kubelet.k8s.io/v1alpha1",
        "kind": "CredentialProviderRequest",
        "image": "registry.example.com/my-image:latest",
        "serviceAccountToken": "tok",
    }))
    .unwrap();

    let (result, output) = invoke(backend.clone(), &input).await;
    let err = result.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert!(err
        .to_string()
        .starts_with("failed to read request: invalid request"));
    assert_eq!(backend.login_attempts(), 0);
    assert!(output.is_empty());
}

#[tokio::test]
async fn test_truncated_request_is_protocol_error() {
    let backend = backend(json!({"username": "u", "password": "p"}));
    let (result, _) = invoke(backend, br#"{"apiVersion": "credentialprovider"#).await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::Protocol);
}

#[tokio::test]
async fn test_cancelled_before_request_arrives() {
    let backend = backend(json!({"username": "u", "password": "p"}));
    let (_kubelet, plugin_stdin) = tokio::io::duplex(256);
    let mut output = Vec::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let transport = StreamTransport::new(plugin_stdin, &mut output);
    let err = serve_with(&config(), transport, backend, &cancel)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(output.is_empty());
}
