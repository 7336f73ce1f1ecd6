//! # Loans
//!
//! | Method | Path | Roles | Schema |
//! |--------|------|-------|--------|
//! | POST | `/loans` | user | create_loan |
//! | GET | `/loans` | officer, manager | none |
//! | PUT | `/loans/:id/review` | officer | review_loan |
//! | PUT | `/loans/:id/approve` | manager | approve_loan |

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::middleware::from_fn_with_state;
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use loan_core::{ApprovalDetails, NewLoan, ReviewDetails, Role};
use loan_schema::Schemas;

use crate::auth::{authorize, Policy, Principal};
use crate::envelope;
use crate::error::AppError;
use crate::extractors::{extract_document_id, extract_json};
use crate::middleware::validate::validate_request;
use crate::state::AppState;

const NOT_FOUND: &str = "Loan application not found";

/// Build the loans router. Authentication is applied by the caller.
pub fn router(schemas: &Schemas) -> Router<AppState> {
    let create = post(create_loan)
        .layer(from_fn_with_state(schemas.create_loan.clone(), validate_request))
        .layer(from_fn_with_state(Policy::roles(&[Role::User]), authorize));
    let list = get(list_loans).layer(from_fn_with_state(
        Policy::roles(&[Role::Officer, Role::Manager]),
        authorize,
    ));
    let review = put(review_loan)
        .layer(from_fn_with_state(schemas.review_loan.clone(), validate_request))
        .layer(from_fn_with_state(Policy::roles(&[Role::Officer]), authorize));
    let approve = put(approve_loan)
        .layer(from_fn_with_state(schemas.approve_loan.clone(), validate_request))
        .layer(from_fn_with_state(Policy::roles(&[Role::Manager]), authorize));

    Router::new()
        .route("/loans", create.merge(list))
        .route("/loans/:id/review", review)
        .route("/loans/:id/approve", approve)
}

/// POST /api/v1/loans: Submit a loan application.
#[utoipa::path(
    post,
    path = "/api/v1/loans",
    request_body = NewLoan,
    responses(
        (status = 201, description = "Loan application created (envelope `data`)", body = Loan),
        (status = 400, description = "Validation error", body = crate::envelope::ErrorEnvelope),
        (status = 401, description = "Missing or invalid credential", body = crate::envelope::ErrorEnvelope),
        (status = 403, description = "Caller is not a user", body = crate::envelope::ErrorEnvelope),
    ),
    security(("bearer" = [])),
    tag = "loans"
)]
pub async fn create_loan(
    State(state): State<AppState>,
    body: Result<Json<NewLoan>, JsonRejection>,
) -> Result<Response, AppError> {
    let input = extract_json(body)?;
    let loan = state.loans.create(input).await?;
    Ok(envelope::created(loan, "Loan application created"))
}

/// GET /api/v1/loans: List every loan application.
#[utoipa::path(
    get,
    path = "/api/v1/loans",
    responses(
        (status = 200, description = "Loans retrieved (envelope `data`)", body = Vec<Loan>),
        (status = 401, description = "Missing or invalid credential", body = crate::envelope::ErrorEnvelope),
        (status = 403, description = "Caller is not an officer or manager", body = crate::envelope::ErrorEnvelope),
    ),
    security(("bearer" = [])),
    tag = "loans"
)]
pub async fn list_loans(State(state): State<AppState>) -> Result<Response, AppError> {
    let loans = state.loans.fetch_all().await?;
    Ok(envelope::ok(loans, "Loans retrieved"))
}

/// PUT /api/v1/loans/:id/review: Record an officer's review.
#[utoipa::path(
    put,
    path = "/api/v1/loans/{id}/review",
    params(("id" = String, Path, description = "Loan ID")),
    request_body = ReviewDetails,
    responses(
        (status = 200, description = "Loan application reviewed (envelope `data`)", body = Loan),
        (status = 400, description = "Validation error", body = crate::envelope::ErrorEnvelope),
        (status = 403, description = "Caller is not an officer", body = crate::envelope::ErrorEnvelope),
        (status = 404, description = "Loan application not found", body = crate::envelope::ErrorEnvelope),
    ),
    security(("bearer" = [])),
    tag = "loans"
)]
pub async fn review_loan(
    State(state): State<AppState>,
    principal: Principal,
    id: Result<Path<String>, PathRejection>,
    body: Result<Json<ReviewDetails>, JsonRejection>,
) -> Result<Response, AppError> {
    let id = extract_document_id(id, "Loan ID")?;
    let details = extract_json(body)?;
    match state.loans.review(&id, details, &principal.uid).await? {
        Some(loan) => Ok(envelope::ok(loan, "Loan application reviewed")),
        None => Err(AppError::NotFound(NOT_FOUND.into())),
    }
}

/// PUT /api/v1/loans/:id/approve: Record a manager's approval.
#[utoipa::path(
    put,
    path = "/api/v1/loans/{id}/approve",
    params(("id" = String, Path, description = "Loan ID")),
    request_body = ApprovalDetails,
    responses(
        (status = 200, description = "Loan application approved (envelope `data`)", body = Loan),
        (status = 400, description = "Validation error", body = crate::envelope::ErrorEnvelope),
        (status = 403, description = "Caller is not a manager", body = crate::envelope::ErrorEnvelope),
        (status = 404, description = "Loan application not found", body = crate::envelope::ErrorEnvelope),
    ),
    security(("bearer" = [])),
    tag = "loans"
)]
pub async fn approve_loan(
    State(state): State<AppState>,
    principal: Principal,
    id: Result<Path<String>, PathRejection>,
    body: Result<Json<ApprovalDetails>, JsonRejection>,
) -> Result<Response, AppError> {
    let id = extract_document_id(id, "Loan ID")?;
    let details = extract_json(body)?;
    match state.loans.approve(&id, details, &principal.uid).await? {
        Some(loan) => Ok(envelope::ok(loan, "Loan application approved")),
        None => Err(AppError::NotFound(NOT_FOUND.into())),
    }
}
