//! # loan-api: HTTP API for the Loan Desk
//!
//! ## API Surface
//!
//! | Method | Path | Roles | Module |
//! |--------|------|-------|--------|
//! | POST | `/api/v1/loans` | user | [`routes::loans`] |
//! | GET | `/api/v1/loans` | officer, manager | [`routes::loans`] |
//! | PUT | `/api/v1/loans/:id/review` | officer | [`routes::loans`] |
//! | PUT | `/api/v1/loans/:id/approve` | manager | [`routes::loans`] |
//! | GET | `/api/v1/users/:id` | any role, or the same user | [`routes::users`] |
//! | POST | `/api/v1/admin/setCustomClaims` | any authenticated | [`routes::admin`] |
//! | GET | `/health` | none | |
//! | GET | `/api-docs/openapi.json` | none | [`openapi`] |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → authenticate → authorize(policy) → validate_request(schema) → Handler
//! ```
//!
//! Every response body is a [`envelope`] object; every failure goes through
//! [`error::AppError`].

pub mod auth;
pub mod envelope;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod service;
pub mod state;

use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::{Json, Router};

use crate::envelope::ApiResponse;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// `/health` and the OpenAPI document are mounted outside authentication.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::loans::router(&state.schemas))
        .merge(routes::users::router())
        .merge(routes::admin::router(&state.schemas))
        .route_layer(from_fn_with_state(
            state.identity.clone(),
            auth::authenticate,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(openapi::router())
        .nest("/api/v1", api)
        .layer(middleware::tracing_layer::layer())
        .with_state(state)
}

/// Health probe.
async fn health() -> Json<ApiResponse<()>> {
    Json(ApiResponse::message("Server is healthy"))
}
