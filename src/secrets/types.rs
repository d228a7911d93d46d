//! Secure types for handling sensitive data and backend results.
//!
//! [`SecretString`] prevents accidental exposure of tokens through logging,
//! debugging, or error messages. [`BackendSession`] and [`SecretPayload`] are the
//! values handed out by a [`SecretBackend`](super::SecretBackend).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{Error, Result};

/// A string wrapper that redacts its contents in Debug and Display.
///
/// # Security
///
/// - Debug output shows `SecretString([REDACTED])` instead of the actual value
/// - Display output shows `[REDACTED]`
/// - Memory is zeroed when dropped (via `zeroize`)
///
/// The value can only be read through [`SecretString::expose_secret`].
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    /// Creates a new SecretString from a string value.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Exposes the underlying secret value.
    ///
    /// Only call this where the raw value must cross a boundary (an HTTP
    /// header, a login body). Never log or print the result.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// Returns the length of the secret without exposing the value.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SecretString {}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Authenticated handle issued by the secret backend for one resolution.
///
/// Never persisted; the token is redacted in every output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSession {
    /// Client token used for subsequent reads
    pub token: SecretString,

    /// Policies attached to the token
    pub policies: Vec<String>,

    /// Token lease in seconds
    pub lease_duration: u64,
}

impl BackendSession {
    pub fn new(token: impl Into<SecretString>) -> Self {
        Self {
            token: token.into(),
            policies: Vec::new(),
            lease_duration: 0,
        }
    }

    pub fn with_policies(mut self, policies: Vec<String>) -> Self {
        self.policies = policies;
        self
    }

    pub fn with_lease_duration(mut self, seconds: u64) -> Self {
        self.lease_duration = seconds;
        self
    }
}

/// Key-value data of a KV v2 secret version.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretPayload(HashMap<String, serde_json::Value>);

impl SecretPayload {
    pub fn new(fields: HashMap<String, serde_json::Value>) -> Self {
        Self(fields)
    }

    /// Raw field value, if present
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.0.get(field)
    }

    /// Field value as a string.
    ///
    /// Fails with a malformed-secret error when the field is missing or is not a
    /// JSON string.
    pub fn string_field(&self, field: &str) -> Result<&str> {
        self.0
            .get(field)
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| {
                Error::malformed_secret(format!("failed to read {} from secret data", field))
            })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Field names only; values are credentials
        let mut keys: Vec<&String> = self.0.keys().collect();
        keys.sort();
        f.debug_struct("SecretPayload")
            .field("fields", &keys)
            .finish()
    }
}

impl From<HashMap<String, serde_json::Value>> for SecretPayload {
    fn from(fields: HashMap<String, serde_json::Value>) -> Self {
        Self::new(fields)
    }
}

impl<K: Into<String>, V: Into<serde_json::Value>> FromIterator<(K, V)> for SecretPayload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_secret_string_redacts_debug() {
        let secret = SecretString::new("super-secret-value");
        let debug_output = format!("{:?}", secret);

        assert_eq!(debug_output, "SecretString([REDACTED])");
        assert!(!debug_output.contains("super-secret"));
    }

    #[test]
    fn test_secret_string_redacts_display() {
        let secret = SecretString::new("super-secret-value");
        assert_eq!(format!("{}", secret), "[REDACTED]");
    }

    #[test]
    fn test_secret_string_length() {
        let secret = SecretString::new("12345");
        assert_eq!(secret.len(), 5);
        assert!(!secret.is_empty());
        assert!(SecretString::from("").is_empty());
    }

    #[test]
    fn test_session_debug_hides_token() {
        let session = BackendSession::new("hvs.CAESIJ")
            .with_policies(vec!["registry-read".to_string()])
            .with_lease_duration(3600);

        let debug = format!("{:?}", session);
        assert!(!debug.contains("hvs.CAESIJ"));
        assert!(debug.contains("registry-read"));
        assert!(debug.contains("3600"));
    }

    #[test]
    fn test_payload_string_field() {
        let payload: SecretPayload = [("username", "u"), ("password", "p")]
            .into_iter()
            .collect();
        assert_eq!(payload.string_field("username").unwrap(), "u");
        assert_eq!(payload.string_field("password").unwrap(), "p");
    }

    #[test]
    fn test_payload_missing_field() {
        let payload: SecretPayload = [("password", "p")].into_iter().collect();
        let err = payload.string_field("username").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MalformedSecret);
        assert_eq!(err.to_string(), "failed to read username from secret data");
    }

    #[test]
    fn test_payload_non_string_field_is_malformed() {
        let payload: SecretPayload = [("username", json!(42)), ("password", json!("p"))]
            .into_iter()
            .collect();
        let err = payload.string_field("username").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedSecret);
    }

    #[test]
    fn test_payload_debug_hides_values() {
        let payload: SecretPayload = [("username", "bot"), ("password", "hunter2")]
            .into_iter()
            .collect();
        let debug = format!("{:?}", payload);

        assert!(debug.contains("password"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_payload_deserializes_from_map() {
        let payload: SecretPayload =
            serde_json::from_value(json!({"username": "u", "password": "p", "ttl": 30}))
                .unwrap();
        assert_eq!(payload.len(), 3);
        assert_eq!(payload.get("ttl"), Some(&json!(30)));
    }
}
