//! # Loan Service
//!
//! Business operations over the `loans` collection, built on
//! [`Repository`].
//!
//! Review and approve are read-then-write: the loan is loaded, its status
//! and outcome record are changed, and the changed fields are merged back.
//! There is no compare-and-swap, so two writers racing on one loan both
//! succeed and the later merge wins for any field they both touch.

use chrono::Utc;
use loan_core::{
    ApprovalDetails, DomainError, Loan, LoanStatus, NewLoan, ReviewDetails, LOANS_COLLECTION,
};
use loan_store::{Document, Repository, RepositoryError};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Loan service failures.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The loan's terms violate an invariant (400).
    #[error("{}", .0.join(", "))]
    InvalidLoan(Vec<String>),

    /// The repository failed (500).
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// A stored document could not be read as a loan (500).
    #[error(transparent)]
    Malformed(DomainError),
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidLoan(problems) => Self::InvalidLoan(problems),
            other => Self::Malformed(other),
        }
    }
}

/// Loan operations.
#[derive(Debug, Clone)]
pub struct LoanService {
    repository: Repository,
}

impl LoanService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Every stored loan, unfiltered and unpaginated.
    pub async fn fetch_all(&self) -> Result<Vec<Loan>, ServiceError> {
        let docs = self.repository.get_all(LOANS_COLLECTION).await?;
        docs.into_iter().map(to_loan).collect()
    }

    /// Persist a new pending application and return it with its id.
    pub async fn create(&self, input: NewLoan) -> Result<Loan, ServiceError> {
        input.check()?;
        let now = Utc::now();
        let mut loan = Loan {
            id: String::new(),
            borrower_id: input.borrower_id,
            amount: input.amount,
            interest_rate: input.interest_rate,
            term_months: input.term_months,
            status: LoanStatus::Pending,
            created_at: Some(now),
            updated_at: Some(now),
            review: None,
            approval: None,
        };
        loan.id = self
            .repository
            .create(LOANS_COLLECTION, loan.document_fields(), None)
            .await?;
        tracing::info!(
            loan_id = %loan.id,
            borrower_id = %loan.borrower_id,
            amount = loan.amount,
            "loan application created"
        );
        Ok(loan)
    }

    /// Mark a loan reviewed. `None` when no loan has this id.
    pub async fn review(
        &self,
        id: &str,
        details: ReviewDetails,
        reviewer: &str,
    ) -> Result<Option<Loan>, ServiceError> {
        let Some(mut loan) = self.load(id).await? else {
            return Ok(None);
        };
        loan.status = LoanStatus::Reviewed;
        loan.review = Some(details.into_record(reviewer));
        loan.updated_at = Some(Utc::now());

        let changes = json!({
            "status": loan.status,
            "review": loan.review,
            "updatedAt": loan.updated_at,
        });
        if !self.write_back(id, changes).await? {
            return Ok(None);
        }
        tracing::info!(loan_id = id, reviewer, "loan application reviewed");
        Ok(Some(loan))
    }

    /// Mark a loan approved. `None` when no loan has this id.
    pub async fn approve(
        &self,
        id: &str,
        details: ApprovalDetails,
        approver: &str,
    ) -> Result<Option<Loan>, ServiceError> {
        let Some(mut loan) = self.load(id).await? else {
            return Ok(None);
        };
        loan.status = LoanStatus::Approved;
        loan.approval = Some(details.into_record(approver));
        loan.updated_at = Some(Utc::now());

        let changes = json!({
            "status": loan.status,
            "approval": loan.approval,
            "updatedAt": loan.updated_at,
        });
        if !self.write_back(id, changes).await? {
            return Ok(None);
        }
        tracing::info!(loan_id = id, approver, "loan application approved");
        Ok(Some(loan))
    }

    async fn load(&self, id: &str) -> Result<Option<Loan>, ServiceError> {
        match self.repository.get_by_id(LOANS_COLLECTION, id).await? {
            Some(doc) => to_loan(doc).map(Some),
            None => Ok(None),
        }
    }

    /// Merge `changes` into the stored loan. `false` if it vanished since
    /// it was read.
    async fn write_back(&self, id: &str, changes: Value) -> Result<bool, ServiceError> {
        let Value::Object(fields) = changes else {
            return Ok(true);
        };
        match self.repository.update(LOANS_COLLECTION, id, without_nulls(fields)).await {
            Ok(()) => Ok(true),
            Err(RepositoryError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn without_nulls(mut fields: Map<String, Value>) -> Map<String, Value> {
    fields.retain(|_, v| !v.is_null());
    fields
}

/// Map a stored document to a loan, falling back to the store's own
/// timestamps when the document carries none.
fn to_loan(doc: Document) -> Result<Loan, ServiceError> {
    let mut loan = Loan::from_fields(&doc.id, doc.fields)?;
    loan.created_at = loan.created_at.or(doc.create_time);
    loan.updated_at = loan.updated_at.or(doc.update_time);
    Ok(loan)
}
