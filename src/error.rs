//! Error types for the Halldyll pod manager.
//!
//! Every public operation returns [`Result`], whose error side keeps the
//! three failure families apart: a precondition that failed before any
//! network call ([`ConfigError`]), a transport failure ([`TransportError`]),
//! and an error reported by `RunPod` inside an otherwise successful response
//! ([`ProviderError`]).

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The main error type for the Halldyll pod manager.
#[derive(Debug, Error)]
pub enum HalldyllError {
    /// Configuration or credential precondition errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The request never produced a usable response.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// `RunPod` rejected the request.
    #[error("RunPod error: {0}")]
    Provider(#[from] ProviderError),

    /// The operation was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A credential value the controller needs before it may talk to `RunPod`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    /// The `RunPod` API key.
    ApiKey,
    /// The identifier of the pod to operate on.
    PodId,
}

impl CredentialField {
    /// Returns the configuration key this field is read from.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::ApiKey => "RUNPOD_API_KEY",
            Self::PodId => "RUNPOD_POD_ID",
        }
    }
}

impl std::fmt::Display for CredentialField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more credentials could not be resolved.
    #[error("Missing credential: {} not set", join_fields(.missing))]
    MissingCredential {
        /// Every field that is absent, in a stable order.
        missing: Vec<CredentialField>,
    },

    /// The environment file could not be read or parsed.
    #[error("Failed to load environment file {path}: {message}")]
    EnvFile {
        /// Path to the offending file.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// A configuration value has the wrong shape.
    #[error("Invalid value for {key}: {value:?} ({message})")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Raw value that was rejected.
        value: String,
        /// Why it was rejected.
        message: String,
    },

    /// A pod creation request failed validation.
    #[error("Invalid pod request: {message}")]
    Validation {
        /// Description of the validation error.
        message: String,
    },
}

/// Errors raised while moving a request to `RunPod` and back.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The API answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// The request did not complete within its timeout.
    #[error("Request timed out after {timeout:?}")]
    Timeout {
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// Connection, DNS or TLS failure.
    #[error("Network error: {message}")]
    Network {
        /// Description of the network error.
        message: String,
    },

    /// The response body was not the JSON document we expected.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// An application-level error returned by `RunPod`.
///
/// Only the first entry of the provider's `errors` list is kept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    /// The first message reported by the provider.
    pub message: String,
}

/// Coarse classification of [`HalldyllError`] for callers and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed configuration; nothing was sent.
    Precondition,
    /// DNS, connect, timeout or non-2xx.
    Transport,
    /// `RunPod` rejected the request.
    Provider,
    /// Cancelled by the caller.
    Cancelled,
    /// Anything else.
    Internal,
}

/// Result type alias for Halldyll operations.
pub type Result<T> = std::result::Result<T, HalldyllError>;

fn join_fields(fields: &[CredentialField]) -> String {
    fields
        .iter()
        .map(|f| f.key())
        .collect::<Vec<_>>()
        .join(" and ")
}

impl HalldyllError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Classifies this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Precondition,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Provider(_) => ErrorKind::Provider,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Io(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl ErrorKind {
    /// Stable lowercase name, used in machine-readable output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Precondition => "precondition",
            Self::Transport => "transport",
            Self::Provider => "provider",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }

    /// Process exit code for this kind of failure.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Internal => 1,
            Self::Precondition => 2,
            Self::Provider => 3,
            Self::Transport => 4,
            Self::Cancelled => 130,
        }
    }
}

impl ConfigError {
    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid_value(
        key: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
            message: message.into(),
        }
    }
}

impl TransportError {
    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates an invalid response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Returns the HTTP status, if the server answered at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if repeating a read-only query may succeed.
    ///
    /// The controller never retries on its own; mutating calls must not be
    /// blindly repeated whatever this says.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Network { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidResponse { .. } => false,
        }
    }
}

impl ProviderError {
    /// Creates a provider error from the reported message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_names_every_field() {
        let err = HalldyllError::from(ConfigError::MissingCredential {
            missing: vec![CredentialField::ApiKey, CredentialField::PodId],
        });

        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing credential: RUNPOD_API_KEY and RUNPOD_POD_ID not set"
        );
    }

    #[test]
    fn test_kinds_have_distinct_exit_codes() {
        let kinds = [
            ErrorKind::Precondition,
            ErrorKind::Transport,
            ErrorKind::Provider,
            ErrorKind::Cancelled,
            ErrorKind::Internal,
        ];
        let mut codes: Vec<u8> = kinds.iter().map(|k| k.exit_code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_transient_classification() {
        assert!(TransportError::network("connection refused").is_transient());
        assert!(TransportError::Status { status: 503, body: String::new() }.is_transient());
        assert!(!TransportError::Status { status: 401, body: String::new() }.is_transient());
        assert!(!TransportError::invalid_response("not json").is_transient());
    }
}
