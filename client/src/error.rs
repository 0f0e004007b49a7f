//! Error types for the Riyada client.
//!
//! Every fallible operation in the crate returns a [`ClientError`]. The
//! variants follow the failure categories a front-end has to render:
//! input that never left the device, authentication problems, and service
//! or transport failures. A [`ClientError::Service`] displays as the
//! server's own message, so views can show it verbatim.

use thiserror::Error;

use crate::validation::ValidationErrors;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by the API layer and the stores.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// Form input was rejected before any request was made.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// A protected operation was attempted without a session.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The stored token's `exp` claim is in the past. The session has
    /// already been torn down by the time this is returned.
    #[error("Session expired. Please login again.")]
    SessionExpired,

    /// The service answered, but said no: a `{success:false}` body or a
    /// non-2xx status.
    #[error("{message}")]
    Service {
        /// HTTP status, when the failure came with one.
        status: Option<u16>,
        /// Machine-readable code from the body's `error` field
        /// (e.g. `WALLET_NOT_FOUND`).
        code: Option<String>,
        /// Human-readable message, shown to the user as-is.
        message: String,
    },

    /// The request never produced an HTTP response (DNS, refused
    /// connection, timeout, TLS).
    #[error("network error: {0}")]
    Transport(String),

    /// The response body could not be parsed into the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),

    /// Reading or writing the persisted session failed.
    #[error("session storage error: {0}")]
    Storage(String),
}

impl ClientError {
    /// Shorthand for a service failure with only a message.
    pub fn service(message: impl Into<String>) -> Self {
        ClientError::Service {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    /// `true` if the service reported that the requested resource does not
    /// exist (HTTP 404 or an `*_NOT_FOUND` code).
    pub fn is_not_found(&self) -> bool {
        match self {
            ClientError::Service { status, code, .. } => {
                *status == Some(404)
                    || code.as_deref().is_some_and(|c| c.ends_with("NOT_FOUND"))
            }
            _ => false,
        }
    }

    /// `true` if the service refused a create because the resource is
    /// already there.
    pub fn is_already_exists(&self) -> bool {
        match self {
            ClientError::Service { status, message, .. } => {
                *status == Some(409) || message.to_lowercase().contains("already")
            }
            _ => false,
        }
    }

    /// `true` for failures that mean the caller must log in again.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            ClientError::NotAuthenticated | ClientError::SessionExpired => true,
            ClientError::Service { status, .. } => matches!(status, Some(401)),
            _ => false,
        }
    }

    /// `true` when retrying the same request later could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::Service { status, .. } => status.is_some_and(|s| s >= 500),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}

impl From<ValidationErrors> for ClientError {
    fn from(e: ValidationErrors) -> Self {
        ClientError::Validation(e)
    }
}
