//! # Admin
//!
//! Role assignment through identity-service custom claims. Open to any
//! authenticated principal.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::middleware::from_fn_with_state;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use loan_core::Role;
use loan_schema::Schemas;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Principal;
use crate::envelope;
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::middleware::validate::validate_request;
use crate::state::AppState;

/// Assign a role to a user.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetCustomClaimsRequest {
    pub uid: String,
    /// Case-insensitive role name.
    pub role: Role,
}

/// The role now held by the user.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClaimsUpdate {
    pub uid: String,
    pub role: Role,
}

pub fn router(schemas: &Schemas) -> Router<AppState> {
    Router::new().route(
        "/admin/setCustomClaims",
        post(set_custom_claims).layer(from_fn_with_state(
            schemas.set_custom_claims.clone(),
            validate_request,
        )),
    )
}

/// POST /api/v1/admin/setCustomClaims: Set a user's role claim.
#[utoipa::path(
    post,
    path = "/api/v1/admin/setCustomClaims",
    request_body = SetCustomClaimsRequest,
    responses(
        (status = 200, description = "Custom claims updated (envelope `data`)", body = ClaimsUpdate),
        (status = 400, description = "Validation error", body = crate::envelope::ErrorEnvelope),
        (status = 404, description = "User not found", body = crate::envelope::ErrorEnvelope),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn set_custom_claims(
    State(state): State<AppState>,
    principal: Principal,
    body: Result<Json<SetCustomClaimsRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let req = extract_json(body)?;
    state.identity.set_custom_claims(&req.uid, req.role).await?;
    tracing::info!(
        by = %principal.uid,
        uid = %req.uid,
        role = %req.role,
        "role assigned"
    );
    Ok(envelope::ok(
        ClaimsUpdate {
            uid: req.uid,
            role: req.role,
        },
        "Custom claims updated",
    ))
}
