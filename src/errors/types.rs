//! # Error Types
//!
//! Error taxonomy for the credential provider using `thiserror`.
//!
//! Every failure in the resolution pipeline is fatal to the invocation. As an error
//! unwinds, each step wraps it with its own name via [`ErrorContext::context`], so the
//! top-level message reads like
//! `failed to fetch credentials: failed to setup vault client: ...`.

use std::fmt;

/// Custom result type for credential provider operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the credential provider
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Transport or network failure, including cancellation of an in-flight read
    #[error("{message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Malformed or unrecognized request framing
    #[error("{0}")]
    Protocol(String),

    /// Missing required request field or unparseable image reference
    #[error("{0}")]
    Validation(String),

    /// Incomplete or invalid configuration; lists every problem found
    #[error("{}", .0.join("; "))]
    Configuration(Vec<String>),

    /// The secret backend rejected the login exchange
    #[error("{0}")]
    Authentication(String),

    /// The backend session lacks access to the requested secret
    #[error("{0}")]
    Authorization(String),

    /// No secret exists at the requested coordinate
    #[error("{0}")]
    NotFound(String),

    /// The secret exists but does not carry the required fields
    #[error("{0}")]
    MalformedSecret(String),

    /// The configured auth method is not implemented
    #[error("unsupported vault auth method: {0}")]
    UnsupportedMethod(String),

    /// An error wrapped with the name of the step it unwound through
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

/// Discriminant of [`Error`] that looks through [`Error::Context`] wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Protocol,
    Validation,
    Configuration,
    Authentication,
    Authorization,
    NotFound,
    MalformedSecret,
    UnsupportedMethod,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Io => "io",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Validation => "validation",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Authorization => "authorization",
            ErrorKind::NotFound => "not_found",
            ErrorKind::MalformedSecret => "malformed_secret",
            ErrorKind::UnsupportedMethod => "unsupported_method",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Create an I/O error without an underlying source
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// Create an I/O error wrapping a `std::io::Error`
    pub fn io_with_source<S: Into<String>>(message: S, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol(message.into())
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a configuration error with a single problem
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration(vec![message.into()])
    }

    /// Create a configuration error listing several problems
    pub fn configuration_issues(issues: Vec<String>) -> Self {
        Self::Configuration(issues)
    }

    /// Create an authentication error
    pub fn authentication<S: Into<String>>(message: S) -> Self {
        Self::Authentication(message.into())
    }

    /// Create an authorization error
    pub fn authorization<S: Into<String>>(message: S) -> Self {
        Self::Authorization(message.into())
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a malformed secret error
    pub fn malformed_secret<S: Into<String>>(message: S) -> Self {
        Self::MalformedSecret(message.into())
    }

    /// Create an unsupported auth method error naming the offending value
    pub fn unsupported_method<S: Into<String>>(method: S) -> Self {
        Self::UnsupportedMethod(method.into())
    }

    /// Wrap this error with the name of the step it is unwinding through
    pub fn with_context<S: Into<String>>(self, context: S) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The kind of the innermost error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io { .. } => ErrorKind::Io,
            Error::Protocol(_) => ErrorKind::Protocol,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::Authentication(_) => ErrorKind::Authentication,
            Error::Authorization(_) => ErrorKind::Authorization,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::MalformedSecret(_) => ErrorKind::MalformedSecret,
            Error::UnsupportedMethod(_) => ErrorKind::UnsupportedMethod,
            Error::Context { source, .. } => source.kind(),
        }
    }

    /// The innermost error, with all step context stripped
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Extension trait adding step context to results
pub trait ErrorContext<T> {
    /// Wrap the error, if any, with the given step name
    fn context<S: Into<String>>(self, context: S) -> Result<T>;
}

impl<T> ErrorContext<T> for Result<T> {
    fn context<S: Into<String>>(self, context: S) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::io_with_source(format!("I/O operation failed: {}", error), error)
    }
}

impl From<config::ConfigError> for Error {
    fn from(error: config::ConfigError) -> Self {
        Self::configuration(format!("could not load configuration: {}", error))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut issues = Vec::new();
        collect_validation_messages(&errors, &mut issues);
        issues.sort();
        Self::configuration_issues(issues)
    }
}

fn collect_validation_messages(errors: &validator::ValidationErrors, out: &mut Vec<String>) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                out.extend(field_errors.iter().map(|e| {
                    e.message
                        .as_ref()
                        .map_or_else(
                            || format!("{} is invalid", field),
                            |m| m.to_string(),
                        )
                }));
            }
            ValidationErrorsKind::Struct(nested) => collect_validation_messages(nested, out),
            ValidationErrorsKind::List(items) => {
                for nested in items.values() {
                    collect_validation_messages(nested, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = Error::validation("service account token is required");
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(error.to_string(), "service account token is required");
    }

    #[test]
    fn test_context_chain_display() {
        let result: Result<()> = Err(Error::authentication("permission denied"));
        let error = result
            .context("failed to authenticate with kubernetes")
            .context("failed to setup vault client")
            .context("failed to fetch credentials")
            .unwrap_err();

        assert_eq!(
            error.to_string(),
            "failed to fetch credentials: failed to setup vault client: \
             failed to authenticate with kubernetes: permission denied"
        );
        assert_eq!(error.kind(), ErrorKind::Authentication);
        assert!(matches!(error.root(), Error::Authentication(_)));
    }

    #[test]
    fn test_configuration_lists_every_issue() {
        let error = Error::configuration_issues(vec![
            "address is required".to_string(),
            "role is required for kubernetes auth method".to_string(),
        ]);
        assert_eq!(
            error.to_string(),
            "address is required; role is required for kubernetes auth method"
        );
    }

    #[test]
    fn test_unsupported_method_names_value() {
        let error = Error::unsupported_method("approle");
        assert_eq!(error.kind(), ErrorKind::UnsupportedMethod);
        assert_eq!(error.to_string(), "unsupported vault auth method: approle");
    }

    #[test]
    fn test_io_error_conversion_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let error = Error::from(io);
        assert_eq!(error.kind(), ErrorKind::Io);
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::MalformedSecret.to_string(), "malformed_secret");
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
    }
}
