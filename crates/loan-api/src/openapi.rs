//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into one OpenAPI document, served
//! unauthenticated at `/api-docs/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Assembled OpenAPI spec for the loan API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Loan Desk API",
        version = "0.1.0",
        description = "Create, list, review, and approve loan applications, with role-based access."
    ),
    paths(
        crate::routes::loans::create_loan,
        crate::routes::loans::list_loans,
        crate::routes::loans::review_loan,
        crate::routes::loans::approve_loan,
        crate::routes::users::get_user,
        crate::routes::admin::set_custom_claims,
    ),
    components(schemas(
        loan_core::Loan,
        loan_core::LoanStatus,
        loan_core::ReviewRecord,
        loan_core::ApprovalRecord,
        loan_core::NewLoan,
        loan_core::ReviewDetails,
        loan_core::ApprovalDetails,
        loan_core::Role,
        loan_identity::UserRecord,
        crate::routes::admin::SetCustomClaimsRequest,
        crate::routes::admin::ClaimsUpdate,
        crate::envelope::ErrorEnvelope,
        crate::envelope::Outcome,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "loans", description = "Loan applications"),
        (name = "users", description = "Identity-service users"),
        (name = "admin", description = "Role administration"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` security scheme the paths refer to.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

/// Router serving the OpenAPI document.
pub fn router() -> Router<AppState> {
    Router::new().route("/api-docs/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
