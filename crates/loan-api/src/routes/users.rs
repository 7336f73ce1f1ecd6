//! # Users
//!
//! Identity-service user lookup. Any role may read any user; a principal
//! without a role may still read its own record.

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::middleware::from_fn_with_state;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use loan_core::Role;

use crate::auth::{authorize, Policy};
use crate::envelope;
use crate::error::AppError;
use crate::extractors::extract_id;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    let policy = Policy::roles(&Role::ALL).or_same_user();
    Router::new().route(
        "/users/:id",
        get(get_user).layer(from_fn_with_state(policy, authorize)),
    )
}

/// GET /api/v1/users/:id: Fetch a user record.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User retrieved (envelope `data`)", body = UserRecord),
        (status = 403, description = "Not permitted", body = crate::envelope::ErrorEnvelope),
        (status = 404, description = "User not found", body = crate::envelope::ErrorEnvelope),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Response, AppError> {
    let id = extract_id(id, "User ID")?;
    match state.identity.get_user(&id).await? {
        Some(user) => Ok(envelope::ok(user, "User retrieved")),
        None => Err(AppError::NotFound("User not found".into())),
    }
}
