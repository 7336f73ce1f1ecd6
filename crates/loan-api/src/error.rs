//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps repository, service, identity, and validation errors to HTTP status
//! codes and the error envelope. 500-class details are logged and replaced
//! by a generic message in the response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use loan_identity::IdentityError;
use loan_schema::SchemaError;
use loan_store::RepositoryError;
use thiserror::Error;

use crate::envelope::ErrorEnvelope;
use crate::service::ServiceError;

/// Message returned in place of any 500-class error.
pub const INTERNAL_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or rejected credential (401).
    #[error("{0}")]
    Authentication(String),

    /// The principal may not use this route (403).
    #[error("{0}")]
    Authorization(String),

    /// The payload violated the request schema (400).
    #[error("{0}")]
    Validation(String),

    /// The request was malformed in some other way (400).
    #[error("{0}")]
    BadRequest(String),

    /// The named resource does not exist (404).
    #[error("{0}")]
    NotFound(String),

    /// The document store failed (500).
    #[error("repository error: {0}")]
    Repository(String),

    /// Any other server-side failure (500).
    #[error("service error: {0}")]
    Service(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Authentication(_) => (StatusCode::UNAUTHORIZED, "AUTHENTICATION_ERROR"),
            Self::Authorization(_) => (StatusCode::FORBIDDEN, "AUTHORIZATION_ERROR"),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Repository(_) => (StatusCode::INTERNAL_SERVER_ERROR, "REPOSITORY_ERROR"),
            Self::Service(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SERVICE_ERROR"),
        }
    }

    /// Error kind reported in the envelope's `error` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "AuthenticationError",
            Self::Authorization(_) => "AuthorizationError",
            Self::Validation(_) => "ValidationError",
            Self::BadRequest(_) => "BadRequestError",
            Self::NotFound(_) => "NotFoundError",
            Self::Repository(_) => "RepositoryError",
            Self::Service(_) => "ServiceError",
        }
    }

    fn is_internal(&self) -> bool {
        matches!(self, Self::Repository(_) | Self::Service(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if self.is_internal() {
            tracing::error!(error = %self, code, "internal server error");
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            self.to_string()
        };

        let body = ErrorEnvelope::new(message, self.kind(), code);
        (status, Json(body)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::InvalidId { .. } => Self::BadRequest(err.to_string()),
            _ => Self::Repository(err.to_string()),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidLoan(_) => Self::Validation(err.to_string()),
            ServiceError::Repository(inner) => inner.into(),
            ServiceError::Malformed(_) => Self::Service(err.to_string()),
        }
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidToken(_) | IdentityError::UserDisabled(_) => {
                Self::Authentication(err.to_string())
            }
            IdentityError::UserNotFound(_) => Self::NotFound(err.to_string()),
            _ => Self::Service(err.to_string()),
        }
    }
}

impl From<SchemaError> for AppError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::Invalid { .. } => Self::Validation(err.to_string()),
            SchemaError::Compile { .. } => Self::Service(err.to_string()),
        }
    }
}
