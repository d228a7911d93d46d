//! Domain layer
//!
//! Wire types of the kubelet credential provider protocol and the pure helpers
//! that operate on them. Nothing here touches stdin, the network or Vault.

pub mod credential_provider;
pub mod image;

pub use credential_provider::{
    AuthConfig, CredentialProviderRequest, CredentialProviderResponse, PluginCacheKeyType,
    API_VERSION, REQUEST_KIND, RESPONSE_KIND,
};
pub use image::registry_host;
