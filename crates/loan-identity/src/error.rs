//! Identity client error types.

/// Errors from identity-service calls.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The token is malformed, expired, revoked, or unknown.
    #[error("invalid credential: {0}")]
    InvalidToken(String),
    /// The token is valid but its user is disabled.
    #[error("user {0} is disabled")]
    UserDisabled(String),
    /// An administrative call named a user that does not exist.
    #[error("user {0} not found")]
    UserNotFound(String),
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The identity service returned a non-2xx status.
    #[error("identity service {endpoint} returned {status}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl IdentityError {
    /// Whether the failure is about the presented credential rather than
    /// the service.
    pub fn is_credential_error(&self) -> bool {
        matches!(self, Self::InvalidToken(_) | Self::UserDisabled(_))
    }
}
