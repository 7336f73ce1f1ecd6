//! # Response Envelope
//!
//! Every JSON response, success or failure, has the same outer shape:
//!
//! ```json
//! { "status": "success", "data": { ... }, "message": "Loans retrieved" }
//! { "status": "error", "message": "Loan application not found", "error": "NotFoundError", "code": "NOT_FOUND" }
//! ```
//!
//! Absent fields are omitted rather than serialized as `null`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Outcome discriminator carried in every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Error,
}

/// Success envelope around a payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// A success envelope with data and a message.
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            status: Outcome::Success,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}

impl ApiResponse<()> {
    /// A success envelope carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: Outcome::Success,
            data: None,
            message: Some(message.into()),
        }
    }
}

/// Error envelope. Built by [`crate::error::AppError`]'s `IntoResponse`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorEnvelope {
    /// Always `error`.
    pub status: Outcome,
    /// Human-readable message.
    pub message: String,
    /// Error kind, e.g. `ValidationError`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Machine-readable code, e.g. `VALIDATION_ERROR`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>, kind: &str, code: &str) -> Self {
        Self {
            status: Outcome::Error,
            message: message.into(),
            error: Some(kind.to_string()),
            code: Some(code.to_string()),
        }
    }
}

/// 200 with a success envelope.
pub fn ok<T: Serialize>(data: T, message: &str) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data, message))).into_response()
}

/// 201 with a success envelope.
pub fn created<T: Serialize>(data: T, message: &str) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data, message))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_omits_absent_fields() {
        let body = serde_json::to_value(ApiResponse::success(vec![1, 2], "Loans retrieved")).unwrap();
        assert_eq!(
            body,
            json!({ "status": "success", "data": [1, 2], "message": "Loans retrieved" })
        );
    }

    #[test]
    fn message_only_success() {
        let body = serde_json::to_value(ApiResponse::message("Server is healthy")).unwrap();
        assert_eq!(body, json!({ "status": "success", "message": "Server is healthy" }));
    }

    #[test]
    fn error_envelope_shape() {
        let body = serde_json::to_value(ErrorEnvelope::new(
            "Loan application not found",
            "NotFoundError",
            "NOT_FOUND",
        ))
        .unwrap();
        assert_eq!(
            body,
            json!({
                "status": "error",
                "message": "Loan application not found",
                "error": "NotFoundError",
                "code": "NOT_FOUND"
            })
        );
    }
}
