#![deny(missing_docs)]

//! # loan-core: Domain Types for the Loan Desk
//!
//! Defines the types every other crate in the workspace shares. It has no
//! internal crate dependencies.
//!
//! ## Design Principles
//!
//! 1. **Closed enums for lifecycle and roles.** [`LoanStatus`] and [`Role`]
//!    are exhaustive; every consumer matches all variants.
//!
//! 2. **Stored shape is camelCase.** Documents in the `loans` collection use
//!    the same field names as the HTTP surface, so a stored document and a
//!    response body are the same JSON object plus `id`.
//!
//! 3. **No `.unwrap()` outside tests.** Construction of domain values from
//!    untrusted data returns [`DomainError`].

pub mod error;
pub mod loan;
pub mod role;

pub use error::DomainError;
pub use loan::{
    ApprovalDetails, ApprovalRecord, Loan, LoanStatus, NewLoan, ReviewDetails, ReviewRecord,
    LOANS_COLLECTION,
};
pub use role::Role;
