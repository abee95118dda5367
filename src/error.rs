//! Error types for the Octopus provider core.

use thiserror::Error;

use crate::schema::Diagnostic;

/// Errors that can occur while handling a resource operation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested remote entity was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An argument passed to a helper was unusable (e.g. an empty id).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A composite identifier could not be split into its parts.
    #[error("Malformed identity: {0}")]
    MalformedIdentity(String),

    /// The entity just written could not be found in the collection the server returned.
    #[error("Unable to locate entity: {0}")]
    LocatorMiss(String),

    /// More than one member of a returned collection matched.
    #[error("Ambiguous match: {0}")]
    AmbiguousMatch(String),

    /// The remote API rejected a request.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the server.
        status: u16,
        /// Message returned by the server.
        message: String,
    },

    /// Operation not implemented.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),
}

impl ProviderError {
    /// Get the error message as a string.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::Validation(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::InvalidArgument(msg) => msg,
            Self::MalformedIdentity(msg) => msg,
            Self::LocatorMiss(msg) => msg,
            Self::AmbiguousMatch(msg) => msg,
            Self::Api { message, .. } => message,
            Self::Unimplemented(msg) => msg,
        }
    }

    /// Whether the remote entity is gone, as opposed to any other failure.
    ///
    /// A 404 surfaced through [`ProviderError::Api`] counts as well.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Api { status, .. } => *status == 404,
            _ => false,
        }
    }

    /// Prefix the message with the operation that failed, keeping the variant.
    pub fn context(self, operation: impl AsRef<str>) -> Self {
        let op = operation.as_ref();
        match self {
            Self::NotFound(msg) => Self::NotFound(format!("{}: {}", op, msg)),
            Self::Validation(msg) => Self::Validation(format!("{}: {}", op, msg)),
            Self::Configuration(msg) => Self::Configuration(format!("{}: {}", op, msg)),
            Self::LocatorMiss(msg) => Self::LocatorMiss(format!("{}: {}", op, msg)),
            Self::AmbiguousMatch(msg) => Self::AmbiguousMatch(format!("{}: {}", op, msg)),
            Self::Api { status, message } => Self::Api {
                status,
                message: format!("{}: {}", op, message),
            },
            other => other,
        }
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(err: ProviderError) -> Self {
        let summary = match &err {
            ProviderError::Validation(_) | ProviderError::Configuration(_) => {
                "invalid resource configuration"
            },
            ProviderError::MalformedIdentity(_) => "unexpected resource identifier",
            _ => "provider operation failed",
        };
        Diagnostic::error(summary).with_detail(err.to_string())
    }
}
