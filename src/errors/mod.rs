//! # Error Handling
//!
//! Error handling for the credential provider. The taxonomy lives in [`types`];
//! this module re-exports it for the rest of the crate.

pub mod types;

pub use types::{Error, ErrorContext, ErrorKind, Result};
