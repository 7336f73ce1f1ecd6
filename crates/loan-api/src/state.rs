//! # Application State
//!
//! Shared handles injected into every handler. All are built once in
//! `main` (or a test) and cloned cheaply per request.

use std::sync::Arc;

use loan_identity::IdentityProvider;
use loan_schema::Schemas;
use loan_store::Repository;

use crate::service::LoanService;

#[derive(Debug, Clone)]
pub struct AppState {
    pub loans: LoanService,
    pub identity: Arc<dyn IdentityProvider>,
    pub schemas: Schemas,
}

impl AppState {
    pub fn new(
        repository: Repository,
        identity: Arc<dyn IdentityProvider>,
        schemas: Schemas,
    ) -> Self {
        Self {
            loans: LoanService::new(repository),
            identity,
            schemas,
        }
    }
}
