//! # Extraction Helpers
//!
//! Map axum extractor rejections to [`AppError::BadRequest`] so malformed
//! requests get the error envelope instead of axum's plain-text bodies.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::Path;
use axum::Json;
use loan_store::check_document_id;

use crate::error::AppError;

/// Unwrap a JSON body.
///
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body)?;
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Unwrap a required, non-blank path parameter.
pub fn extract_id(
    result: Result<Path<String>, PathRejection>,
    what: &str,
) -> Result<String, AppError> {
    match result {
        Ok(Path(id)) if !id.trim().is_empty() => Ok(id),
        Ok(_) => Err(AppError::BadRequest(format!("{what} is required"))),
        Err(err) => Err(AppError::BadRequest(err.body_text())),
    }
}

/// Unwrap a path parameter that names a stored document. Ids that would
/// reach outside their collection (`a/b`, `..`) are rejected.
pub fn extract_document_id(
    result: Result<Path<String>, PathRejection>,
    what: &str,
) -> Result<String, AppError> {
    let id = extract_id(result, what)?;
    check_document_id(&id).map_err(|_| AppError::BadRequest(format!("{what} is invalid")))?;
    Ok(id)
}
