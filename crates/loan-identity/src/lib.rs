//! # loan-identity: Identity Verification Client
//!
//! Verifies bearer ID tokens and administers user roles through the
//! Identity Toolkit REST API v1 (the API behind Firebase Authentication).
//!
//! A principal's role lives in the user's custom attributes as
//! `{"role": "<role>"}`. It is read at verification time, so a role change
//! made through [`IdentityProvider::set_custom_claims`] takes effect on the
//! user's next request.
//!
//! The [`IdentityProvider`] trait is the seam the API depends on;
//! [`IdentityToolkitClient`] is the production implementation. Calls are
//! never retried.

pub mod config;
pub mod error;
pub mod provider;
pub mod toolkit;

pub use config::{ConfigError, IdentityConfig};
pub use error::IdentityError;
pub use provider::{IdentityProvider, UserRecord, VerifiedToken};
pub use toolkit::IdentityToolkitClient;
