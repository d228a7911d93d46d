//! Image reference helpers

use crate::errors::{Error, Result};

/// Extract the registry host from an image reference.
///
/// The host is everything before the first `/`. References without a `/`
/// (e.g. `nginx:latest`) carry no registry and are rejected; no default
/// registry is substituted.
pub fn registry_host(image: &str) -> Result<&str> {
    match image.split_once('/') {
        Some((host, _)) => Ok(host),
        None => Err(Error::validation(format!(
            "no registry name found in image name: {}",
            image
        ))),
    }
}
