//! # Domain Errors
//!
//! Errors raised while constructing domain values from untrusted input:
//! request payloads, stored documents, and identity-service claims.

use thiserror::Error;

/// Domain construction and invariant errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// A loan's terms violate an invariant. Carries every problem found.
    #[error("invalid loan: {}", .0.join(", "))]
    InvalidLoan(Vec<String>),

    /// A role string did not name one of the known roles.
    #[error("unknown role: \"{0}\" (expected admin, manager, officer, or user)")]
    UnknownRole(String),

    /// A status string did not name one of the known loan statuses.
    #[error("unknown loan status: \"{0}\"")]
    UnknownStatus(String),

    /// A stored document could not be read as a loan.
    #[error("malformed loan document {id}: {reason}")]
    MalformedDocument {
        /// Document identifier.
        id: String,
        /// What was wrong with it.
        reason: String,
    },
}
