//! # Authentication & Authorization Middleware
//!
//! Two layers, always in this order:
//!
//! 1. [`authenticate`] verifies the `Authorization: Bearer <token>` header
//!    through the [`IdentityProvider`] and injects a [`Principal`] into the
//!    request extensions. Any failure answers 401 and the handler never runs.
//! 2. [`authorize`] checks that principal against the route's [`Policy`].
//!    A denial, or a missing principal, answers 403.
//!
//! The access decision itself is the pure function [`is_allowed`].

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Request, State};
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::RequestExt;
use loan_core::Role;
use loan_identity::{IdentityProvider, VerifiedToken};

use crate::error::AppError;

// ── Principal ───────────────────────────────────────────────────────────────

/// The authenticated caller for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub uid: String,
    /// `None` when the credential carries no role claim. Such a principal
    /// fails every role check.
    pub role: Option<Role>,
    pub email: Option<String>,
}

impl From<VerifiedToken> for Principal {
    fn from(token: VerifiedToken) -> Self {
        Self {
            uid: token.uid,
            role: token.role,
            email: token.email,
        }
    }
}

/// Extracts the principal that [`authenticate`] injected.
/// Returns 401 if none is present.
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| AppError::Authentication("Authentication required".into()))
    }
}

// ── Policy ──────────────────────────────────────────────────────────────────

/// Per-route access rule: the roles admitted, and whether the principal
/// named by the route's `id` path parameter is admitted regardless of role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    roles: Vec<Role>,
    allow_same_user: bool,
}

impl Policy {
    /// Admit exactly these roles.
    pub fn roles(roles: &[Role]) -> Self {
        Self {
            roles: roles.to_vec(),
            allow_same_user: false,
        }
    }

    /// Also admit the principal whose uid equals the `id` path parameter.
    pub fn or_same_user(mut self) -> Self {
        self.allow_same_user = true;
        self
    }

    pub fn admitted_roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn allows_same_user(&self) -> bool {
        self.allow_same_user
    }
}

/// Whether `principal` may use a route guarded by `policy`.
///
/// `owner_id` is the route's `id` path parameter, if it has one.
pub fn is_allowed(policy: &Policy, principal: &Principal, owner_id: Option<&str>) -> bool {
    let role_admitted = principal
        .role
        .is_some_and(|role| policy.roles.contains(&role));
    let same_user = policy.allow_same_user && owner_id == Some(principal.uid.as_str());
    role_admitted || same_user
}

fn required_roles(policy: &Policy) -> String {
    policy
        .roles
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

// ── Middleware ──────────────────────────────────────────────────────────────

/// Verify the bearer credential and attach the resulting [`Principal`].
pub async fn authenticate(
    State(identity): State<Arc<dyn IdentityProvider>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = match auth_header {
        Some(value) if value.starts_with("Bearer ") => value[7..].trim().to_string(),
        Some(_) => {
            tracing::warn!("authentication failed: non-Bearer authorization scheme");
            return unauthorized("Authorization header must use the Bearer scheme");
        }
        None => {
            tracing::warn!("authentication failed: missing authorization header");
            return unauthorized("No token provided");
        }
    };
    if token.is_empty() {
        tracing::warn!("authentication failed: empty bearer token");
        return unauthorized("No token provided");
    }

    match identity.verify_token(&token).await {
        Ok(verified) => {
            let principal = Principal::from(verified);
            tracing::debug!(uid = %principal.uid, role = ?principal.role, "authenticated");
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                credential_error = e.is_credential_error(),
                "authentication failed: token verification"
            );
            unauthorized("Invalid or expired token")
        }
    }
}

/// Check the attached principal against `policy`.
///
/// Mount with `from_fn_with_state(policy, authorize)` after
/// [`authenticate`].
pub async fn authorize(State(policy): State<Policy>, request: Request, next: Next) -> Response {
    let Some(principal) = request.extensions().get::<Principal>().cloned() else {
        tracing::warn!(
            required = %required_roles(&policy),
            "authorization failed: no principal on request"
        );
        return forbidden();
    };

    let mut request = request;
    let owner_id = if policy.allow_same_user {
        match request.extract_parts::<Path<HashMap<String, String>>>().await {
            Ok(Path(params)) => params.get("id").cloned(),
            Err(_) => None,
        }
    } else {
        None
    };

    if is_allowed(&policy, &principal, owner_id.as_deref()) {
        next.run(request).await
    } else {
        tracing::warn!(
            uid = %principal.uid,
            role = principal.role.map_or("none", |r| r.as_str()),
            required = %required_roles(&policy),
            "authorization failed: role not permitted"
        );
        forbidden()
    }
}

fn unauthorized(message: &str) -> Response {
    AppError::Authentication(format!("Unauthorized: {message}")).into_response()
}

fn forbidden() -> Response {
    AppError::Authorization("Forbidden: insufficient role".into()).into_response()
}
