//! The identity-provider seam.

use async_trait::async_trait;
use loan_core::Role;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::IdentityError;

/// The identity resolved from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub uid: String,
    pub email: Option<String>,
    /// `None` when the user has no role claim (or an unrecognised one).
    pub role: Option<Role>,
}

/// Identity-service view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub disabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Verifies bearer credentials and administers user roles.
#[async_trait]
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    /// Verify an ID token and resolve its principal.
    ///
    /// Fails with [`IdentityError::InvalidToken`] or
    /// [`IdentityError::UserDisabled`] for bad credentials, and with a
    /// transport/API error when the service cannot answer.
    async fn verify_token(&self, token: &str) -> Result<VerifiedToken, IdentityError>;

    /// Look up a user by id. `None` when no such user exists.
    async fn get_user(&self, uid: &str) -> Result<Option<UserRecord>, IdentityError>;

    /// Replace the user's role claim.
    async fn set_custom_claims(&self, uid: &str, role: Role) -> Result<(), IdentityError>;
}
