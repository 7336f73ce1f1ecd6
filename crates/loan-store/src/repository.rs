//! # Repository
//!
//! The contract the service layer codes against. Wraps a shared
//! [`DocumentStore`] and turns every backend failure into a
//! [`RepositoryError`], logging it once with the operation, collection, and
//! document id before returning it.
//!
//! ## Transactions
//!
//! [`Repository::run_transaction`] begins a backend transaction and hands
//! the caller a [`Transaction`] that stages writes. The staged writes are
//! committed atomically when the unit of work returns `Ok`, and the
//! transaction is rolled back when it returns `Err`. Nothing is written
//! until commit, so a failed unit of work leaves no partial state.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::document::{check_document_id, Document, FieldFilter, TransactionId, Write};
use crate::store::{DocumentStore, StoreError};

/// Repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// An update targeted a document that does not exist.
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    /// The id cannot name a document in the collection.
    #[error("invalid id {id:?} for {collection}")]
    InvalidId { collection: String, id: String },

    /// The backend failed.
    #[error("{operation} on {collection} failed: {source}")]
    Store {
        operation: &'static str,
        collection: String,
        #[source]
        source: StoreError,
    },
}

/// Writes staged inside [`Repository::run_transaction`].
///
/// Clones share the same staging buffer.
#[derive(Debug, Clone)]
pub struct Transaction {
    id: TransactionId,
    writes: Arc<Mutex<Vec<Write>>>,
}

impl Transaction {
    fn new(id: TransactionId) -> Self {
        Self {
            id,
            writes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    /// Stage a create-or-replace.
    pub fn set(&self, collection: &str, id: &str, fields: Map<String, Value>) {
        self.writes.lock().push(Write::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
    }

    /// Stage a merge into an existing document.
    pub fn update(&self, collection: &str, id: &str, fields: Map<String, Value>) {
        self.writes.lock().push(Write::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
    }

    /// Stage a delete.
    pub fn delete(&self, collection: &str, id: &str) {
        self.writes.lock().push(Write::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        });
    }

    /// Number of writes staged so far.
    pub fn pending_writes(&self) -> usize {
        self.writes.lock().len()
    }

    fn take_writes(&self) -> Vec<Write> {
        std::mem::take(&mut *self.writes.lock())
    }
}

/// Generic CRUD over a document store.
#[derive(Debug, Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
}

fn store_failure(
    operation: &'static str,
    collection: &str,
    id: Option<&str>,
    source: StoreError,
) -> RepositoryError {
    tracing::error!(
        operation,
        collection,
        id = id.unwrap_or("-"),
        error = %source,
        "repository operation failed"
    );
    RepositoryError::Store {
        operation,
        collection: collection.to_string(),
        source,
    }
}

fn checked_id(operation: &'static str, collection: &str, id: &str) -> Result<(), RepositoryError> {
    check_document_id(id).map_err(|_| {
        tracing::warn!(operation, collection, id, "rejected invalid document id");
        RepositoryError::InvalidId {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    })
}

impl Repository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Name of the backing store, for logs.
    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Store a new document and return its id. An explicit id creates or
    /// replaces the document under that key.
    pub async fn create(
        &self,
        collection: &str,
        data: Map<String, Value>,
        id: Option<&str>,
    ) -> Result<String, RepositoryError> {
        if let Some(id) = id {
            checked_id("create", collection, id)?;
        }
        let id = self
            .store
            .insert(collection, id, data)
            .await
            .map_err(|e| store_failure("create", collection, id, e))?;
        tracing::debug!(collection, id = %id, "document created");
        Ok(id)
    }

    /// Every document in the collection.
    pub async fn get_all(&self, collection: &str) -> Result<Vec<Document>, RepositoryError> {
        self.store
            .list(collection)
            .await
            .map_err(|e| store_failure("get_all", collection, None, e))
    }

    /// One document, or `None` when absent.
    pub async fn get_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, RepositoryError> {
        checked_id("get_by_id", collection, id)?;
        self.store
            .get(collection, id)
            .await
            .map_err(|e| store_failure("get_by_id", collection, Some(id), e))
    }

    /// Merge `data` into an existing document.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] when the document does not exist, and
    /// [`RepositoryError::InvalidId`] when `id` is not a single path segment.
    pub async fn update(
        &self,
        collection: &str,
        id: &str,
        data: Map<String, Value>,
    ) -> Result<(), RepositoryError> {
        checked_id("update", collection, id)?;
        let found = self
            .store
            .patch(collection, id, data)
            .await
            .map_err(|e| store_failure("update", collection, Some(id), e))?;
        if found {
            Ok(())
        } else {
            tracing::error!(
                operation = "update",
                collection,
                id,
                "document to update does not exist"
            );
            Err(RepositoryError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })
        }
    }

    /// Delete one document, or stage the delete on `transaction`.
    pub async fn delete_by_id(
        &self,
        collection: &str,
        id: &str,
        transaction: Option<&Transaction>,
    ) -> Result<(), RepositoryError> {
        checked_id("delete_by_id", collection, id)?;
        match transaction {
            Some(txn) => {
                txn.delete(collection, id);
                Ok(())
            }
            None => self
                .store
                .delete(collection, id)
                .await
                .map_err(|e| store_failure("delete_by_id", collection, Some(id), e)),
        }
    }

    /// Delete every document whose fields equal all of `matches`, and
    /// return how many matched.
    ///
    /// Without a transaction the deletes go out as one atomic batch. With
    /// one, the matching read happens inside it and the deletes are staged.
    pub async fn delete_by_field_match(
        &self,
        collection: &str,
        matches: &[FieldFilter],
        transaction: Option<&Transaction>,
    ) -> Result<usize, RepositoryError> {
        let docs = self
            .store
            .query(collection, matches, transaction.map(Transaction::id))
            .await
            .map_err(|e| store_failure("delete_by_field_match", collection, None, e))?;
        let count = docs.len();

        match transaction {
            Some(txn) => {
                for doc in &docs {
                    txn.delete(collection, &doc.id);
                }
            }
            None if count > 0 => {
                let writes = docs
                    .into_iter()
                    .map(|doc| Write::Delete {
                        collection: collection.to_string(),
                        id: doc.id,
                    })
                    .collect();
                self.store
                    .commit(None, writes)
                    .await
                    .map_err(|e| store_failure("delete_by_field_match", collection, None, e))?;
            }
            None => {}
        }

        tracing::debug!(collection, count, "deleted by field match");
        Ok(count)
    }

    /// Run `work` inside a transaction.
    ///
    /// Staged writes commit atomically when `work` returns `Ok`. On `Err`
    /// the transaction is rolled back and the work's error is returned; a
    /// rollback failure is logged but does not replace it.
    pub async fn run_transaction<T, F, Fut>(&self, work: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(Transaction) -> Fut,
        Fut: Future<Output = Result<T, RepositoryError>>,
    {
        let id = self
            .store
            .begin_transaction()
            .await
            .map_err(|e| store_failure("begin_transaction", "-", None, e))?;
        let txn = Transaction::new(id.clone());

        match work(txn.clone()).await {
            Ok(value) => {
                let writes = txn.take_writes();
                let staged = writes.len();
                self.store
                    .commit(Some(&id), writes)
                    .await
                    .map_err(|e| store_failure("commit", "-", None, e))?;
                tracing::debug!(transaction = %id, writes = staged, "transaction committed");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self.store.rollback(&id).await {
                    tracing::error!(
                        operation = "rollback",
                        transaction = %id,
                        error = %rollback,
                        "transaction rollback failed"
                    );
                }
                tracing::warn!(transaction = %id, error = %err, "transaction rolled back");
                Err(err)
            }
        }
    }
}
