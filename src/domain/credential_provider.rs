//! Kubelet credential provider wire types (`credentialprovider.kubelet.k8s.io/v1`)
//!
//! The kubelet writes a [`CredentialProviderRequest`] to the plugin's stdin and
//! expects a [`CredentialProviderResponse`] on stdout. Field names follow the
//! kubelet's JSON encoding (camelCase).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The only protocol version this plugin speaks.
pub const API_VERSION: &str = "credentialprovider.kubelet.k8s.io/v1";

/// `kind` of a request sent by the kubelet.
pub const REQUEST_KIND: &str = "CredentialProviderRequest";

/// `kind` of the response written back to the kubelet.
pub const RESPONSE_KIND: &str = "CredentialProviderResponse";

/// Request for credentials of a single image pull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialProviderRequest {
    pub api_version: String,

    pub kind: String,

    /// Fully-qualified image reference, e.g. `registry.example.com/team/app:1.2`
    pub image: String,

    /// Bound service account token of the pod pulling the image. Empty when the
    /// provider is not configured for service account tokens.
    #[serde(default)]
    pub service_account_token: String,

    /// Annotations of the pod's service account forwarded by the kubelet
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub service_account_annotations: HashMap<String, String>,
}

impl CredentialProviderRequest {
    /// Build a request of the recognized version and kind.
    pub fn new(image: impl Into<String>, service_account_token: impl Into<String>) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: REQUEST_KIND.to_string(),
            image: image.into(),
            service_account_token: service_account_token.into(),
            service_account_annotations: HashMap::new(),
        }
    }
}

/// Granularity at which the kubelet may cache returned credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PluginCacheKeyType {
    /// Cache per full image reference
    Image,
    /// Cache per registry host
    Registry,
    /// Cache for every image served by this plugin
    Global,
}

/// Registry credential handed back to the kubelet.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Response carrying credentials for the requested image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialProviderResponse {
    pub api_version: String,

    pub kind: String,

    pub cache_key_type: PluginCacheKeyType,

    /// Kubelet duration string (e.g. `5m0s`); the kubelet default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_duration: Option<String>,

    /// Credentials keyed by registry host (or image, per `cache_key_type`)
    #[serde(default)]
    pub auth: HashMap<String, AuthConfig>,
}

impl CredentialProviderResponse {
    /// Response with a single registry-scoped credential.
    pub fn for_registry(registry: impl Into<String>, auth: AuthConfig) -> Self {
        let mut entries = HashMap::with_capacity(1);
        entries.insert(registry.into(), auth);
        Self {
            api_version: API_VERSION.to_string(),
            kind: RESPONSE_KIND.to_string(),
            cache_key_type: PluginCacheKeyType::Registry,
            cache_duration: None,
            auth: entries,
        }
    }
}
