//! # Loan Records
//!
//! The loan application as stored in the `loans` collection and returned on
//! the HTTP surface, plus the request-side inputs for its three mutations
//! (create, review, approve).
//!
//! ## Lifecycle
//!
//! ```text
//! pending ──(officer review)──▶ reviewed ──(manager approve)──▶ approved
//!    │
//!    └────────────────────────(manager reject)──────────────▶ rejected
//! ```
//!
//! Transitions are not enforced as a state machine: review and approve
//! overwrite `status` unconditionally, matching the read-then-write service
//! semantics. `rejected` is representable so stored documents carrying it
//! deserialize, but no exposed operation produces it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::error::DomainError;

/// Collection holding loan documents.
pub const LOANS_COLLECTION: &str = "loans";

/// Upper bound for an interest rate, in percent.
const MAX_INTEREST_RATE: f64 = 100.0;

/// Loan application lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    /// Submitted by a borrower, awaiting review.
    Pending,
    /// Reviewed by an officer.
    Reviewed,
    /// Approved by a manager.
    Approved,
    /// Rejected.
    Rejected,
}

impl LoanStatus {
    /// Return the string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewed => "reviewed",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "reviewed" => Ok(Self::Reviewed),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// Review outcome recorded on a loan by an officer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    /// Reviewer's comments.
    pub comments: String,
    /// When the review happened.
    pub date: DateTime<Utc>,
    /// Principal id of the reviewer.
    pub reviewed_by: String,
}

/// Approval outcome recorded on a loan by a manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRecord {
    /// Amount the manager approved. May differ from the requested amount.
    pub approved_amount: f64,
    /// Optional approval comments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    /// When the approval happened.
    pub date: DateTime<Utc>,
    /// Principal id of the approver.
    pub approved_by: String,
}

/// A loan application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    /// Document id assigned by the store.
    pub id: String,
    /// Borrower's principal id.
    pub borrower_id: String,
    /// Requested principal amount.
    pub amount: f64,
    /// Annual interest rate in percent, within `[0, 100]`.
    pub interest_rate: f64,
    /// Term in months.
    pub term_months: u32,
    /// Lifecycle status.
    pub status: LoanStatus,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Officer review, once reviewed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewRecord>,
    /// Manager approval, once approved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval: Option<ApprovalRecord>,
}

impl Loan {
    /// Build a loan from a stored document's id and fields.
    ///
    /// A stray `id` field inside the document body is ignored; the document
    /// key is authoritative.
    pub fn from_fields(id: &str, mut fields: Map<String, Value>) -> Result<Self, DomainError> {
        fields.insert("id".to_string(), Value::String(id.to_string()));
        serde_json::from_value(Value::Object(fields)).map_err(|e| DomainError::MalformedDocument {
            id: id.to_string(),
            reason: e.to_string(),
        })
    }

    /// The stored representation: every field except `id`.
    pub fn document_fields(&self) -> Map<String, Value> {
        let mut fields = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            // A struct with only plain fields always serializes to an object.
            _ => Map::new(),
        };
        fields.remove("id");
        fields
    }
}

/// Input for a new loan application.
///
/// Unknown fields in the request body (such as `purpose`, or the defaulted
/// `status`) are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewLoan {
    /// Borrower's principal id.
    #[serde(default)]
    pub borrower_id: String,
    /// Requested amount, must be positive.
    #[serde(default)]
    pub amount: f64,
    /// Interest rate in percent, within `[0, 100]`.
    #[serde(default)]
    pub interest_rate: f64,
    /// Term in months, must be positive.
    #[serde(default)]
    pub term_months: u32,
}

impl NewLoan {
    /// Check the loan invariants, reporting every violation rather than the
    /// first.
    pub fn check(&self) -> Result<(), DomainError> {
        let mut problems = Vec::new();
        if self.borrower_id.trim().is_empty() {
            problems.push("borrowerId is required".to_string());
        }
        // Negated comparisons so NaN fails too.
        if !(self.amount > 0.0) {
            problems.push("amount must be greater than zero".to_string());
        }
        if !(0.0..=MAX_INTEREST_RATE).contains(&self.interest_rate) {
            problems.push("interestRate must be between 0 and 100".to_string());
        }
        if self.term_months == 0 {
            problems.push("termMonths must be greater than zero".to_string());
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(DomainError::InvalidLoan(problems))
        }
    }
}

/// Officer review input.
#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDetails {
    /// Review comments.
    pub review_comments: String,
    /// Review date. Defaults to now.
    #[serde(default = "Utc::now")]
    pub review_date: DateTime<Utc>,
}

impl ReviewDetails {
    /// Attach the reviewer and produce the stored record.
    pub fn into_record(self, reviewer: &str) -> ReviewRecord {
        ReviewRecord {
            comments: self.review_comments,
            date: self.review_date,
            reviewed_by: reviewer.to_string(),
        }
    }
}

/// Manager approval input.
#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalDetails {
    /// Approved amount, must be positive.
    pub approved_amount: f64,
    /// Approval date. Defaults to now.
    #[serde(default = "Utc::now")]
    pub approval_date: DateTime<Utc>,
    /// Optional comments.
    #[serde(default)]
    pub approval_comments: Option<String>,
}

impl ApprovalDetails {
    /// Attach the approver and produce the stored record.
    pub fn into_record(self, approver: &str) -> ApprovalRecord {
        ApprovalRecord {
            approved_amount: self.approved_amount,
            comments: self.approval_comments,
            date: self.approval_date,
            approved_by: approver.to_string(),
        }
    }
}
