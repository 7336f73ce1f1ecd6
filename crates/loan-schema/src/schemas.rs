//! # Request Schemas
//!
//! One schema per validated operation:
//!
//! | Schema | Operation |
//! |--------|-----------|
//! | [`create_loan`] | `POST /api/v1/loans` |
//! | [`review_loan`] | `PUT /api/v1/loans/:id/review` |
//! | [`approve_loan`] | `PUT /api/v1/loans/:id/approve` |
//! | [`set_custom_claims`] | `POST /api/v1/admin/setCustomClaims` |

use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::SchemaError;
use crate::validate::RequestSchema;

/// New loan application. `status` may only be `pending` on creation.
pub fn create_loan() -> Value {
    json!({
        "type": "object",
        "required": ["borrowerId", "amount", "interestRate", "termMonths"],
        "properties": {
            "borrowerId": {
                "type": "string",
                "minLength": 1,
                "x-messages": {
                    "required": "Borrower ID is required",
                    "type": "Borrower ID must be a string",
                    "minLength": "Borrower ID cannot be empty"
                }
            },
            "amount": {
                "type": "number",
                "exclusiveMinimum": 0,
                "x-messages": {
                    "required": "Loan amount is required",
                    "type": "Loan amount must be a number",
                    "exclusiveMinimum": "Loan amount must be greater than zero"
                }
            },
            "interestRate": {
                "type": "number",
                "minimum": 0,
                "maximum": 100,
                "x-messages": {
                    "required": "Interest rate is required",
                    "type": "Interest rate must be a number",
                    "minimum": "Interest rate cannot be negative",
                    "maximum": "Interest rate cannot exceed 100%"
                }
            },
            "termMonths": {
                "type": "integer",
                "exclusiveMinimum": 0,
                "x-messages": {
                    "required": "Loan term (in months) is required",
                    "type": "Loan term must be a whole number of months",
                    "exclusiveMinimum": "Loan term must be greater than zero"
                }
            },
            "status": {
                "type": "string",
                "enum": ["pending"],
                "default": "pending",
                "x-messages": {
                    "type": "Status must be a string",
                    "enum": "Status must be \"pending\" for a new application"
                }
            }
        }
    })
}

/// Officer review.
pub fn review_loan() -> Value {
    json!({
        "type": "object",
        "required": ["reviewComments"],
        "properties": {
            "reviewComments": {
                "type": "string",
                "minLength": 1,
                "x-messages": {
                    "required": "Review comments are required",
                    "type": "Review comments must be a string",
                    "minLength": "Review comments cannot be empty"
                }
            },
            "reviewDate": {
                "type": "string",
                "format": "date-time",
                "x-default": "now",
                "x-messages": {
                    "type": "Review date must be a valid date",
                    "format": "Review date must be a valid date"
                }
            }
        }
    })
}

/// Manager approval.
pub fn approve_loan() -> Value {
    json!({
        "type": "object",
        "required": ["approvedAmount"],
        "properties": {
            "approvedAmount": {
                "type": "number",
                "exclusiveMinimum": 0,
                "x-messages": {
                    "required": "Approved amount is required",
                    "type": "Approved amount must be a number",
                    "exclusiveMinimum": "Approved amount must be greater than zero"
                }
            },
            "approvalDate": {
                "type": "string",
                "format": "date-time",
                "x-default": "now",
                "x-messages": {
                    "type": "Approval date must be a valid date",
                    "format": "Approval date must be a valid date"
                }
            },
            "approvalComments": {
                "type": "string",
                "minLength": 1,
                "x-messages": {
                    "type": "Approval comments must be a string",
                    "minLength": "Approval comments cannot be empty"
                }
            }
        }
    })
}

/// Assign a role to a user through identity-service custom claims.
pub fn set_custom_claims() -> Value {
    json!({
        "type": "object",
        "required": ["uid", "role"],
        "properties": {
            "uid": {
                "type": "string",
                "minLength": 1,
                "x-messages": {
                    "required": "User ID is required",
                    "type": "User ID must be a string",
                    "minLength": "User ID cannot be empty"
                }
            },
            "role": {
                "type": "string",
                "enum": [
                    "admin", "manager", "user", "officer",
                    "Admin", "Manager", "User", "Officer"
                ],
                "x-messages": {
                    "required": "Role is required",
                    "type": "Role must be a string",
                    "enum": "Role must be one of admin, manager, user, officer"
                }
            }
        }
    })
}

/// Every request schema, compiled once and shared.
#[derive(Debug, Clone)]
pub struct Schemas {
    pub create_loan: Arc<RequestSchema>,
    pub review_loan: Arc<RequestSchema>,
    pub approve_loan: Arc<RequestSchema>,
    pub set_custom_claims: Arc<RequestSchema>,
}

impl Schemas {
    /// Compile all schemas.
    pub fn compile() -> Result<Self, SchemaError> {
        Ok(Self {
            create_loan: Arc::new(RequestSchema::compile("create_loan", create_loan())?),
            review_loan: Arc::new(RequestSchema::compile("review_loan", review_loan())?),
            approve_loan: Arc::new(RequestSchema::compile("approve_loan", approve_loan())?),
            set_custom_claims: Arc::new(RequestSchema::compile(
                "set_custom_claims",
                set_custom_claims(),
            )?),
        })
    }
}
