//! # Schema Validation Middleware
//!
//! Validates a request against a [`RequestSchema`] before the handler runs.
//! Body, path parameters, and query parameters are merged into one object
//! (later sources win), validated, and the normalized object (defaults
//! filled in) replaces the request body. On failure the request is answered
//! with 400 and the aggregated message, and the handler never runs.
//!
//! Mount per route, inside the authorization layer:
//!
//! ```ignore
//! post(handler)
//!     .layer(from_fn_with_state(schemas.create_loan.clone(), validate_request))
//!     .layer(from_fn_with_state(policy, authorize))
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::RequestExt;
use loan_schema::{merge_sources, RequestSchema};
use serde_json::Value;

use crate::error::AppError;

/// Largest request body accepted for validation.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Validate and normalize the request for `schema`.
pub async fn validate_request(
    State(schema): State<Arc<RequestSchema>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = match request.extract_parts::<Path<HashMap<String, String>>>().await {
        Ok(Path(params)) => params,
        Err(_) => HashMap::new(),
    };
    let query = match request.extract_parts::<Query<HashMap<String, String>>>().await {
        Ok(Query(params)) => params,
        Err(_) => HashMap::new(),
    };

    let (mut parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(schema = schema.name(), error = %e, "unreadable request body");
            return AppError::BadRequest("Request body could not be read".into()).into_response();
        }
    };
    let payload = if bytes.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(schema = schema.name(), error = %e, "malformed JSON body");
                return AppError::BadRequest(format!("Malformed JSON body: {e}")).into_response();
            }
        }
    };

    let normalized = match merge_sources(schema.name(), payload, path, query)
        .and_then(|merged| schema.validate(merged))
    {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(schema = schema.name(), error = %e, "request validation failed");
            return AppError::from(e).into_response();
        }
    };

    let body = match serde_json::to_vec(&normalized) {
        Ok(body) => body,
        Err(e) => return AppError::Service(e.to_string()).into_response(),
    };
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    next.run(Request::from_parts(parts, Body::from(body))).await
}
