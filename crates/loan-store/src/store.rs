//! The document-store backend seam.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::document::{Document, FieldFilter, TransactionId, Write};

/// Errors from a document-store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The backend returned a non-2xx status.
    #[error("document store {endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// A value could not be converted to or from the backend's encoding.
    #[error("cannot convert document value: {0}")]
    Encoding(String),
    /// A batch update targeted a document that does not exist.
    #[error("document {collection}/{id} does not exist")]
    Missing { collection: String, id: String },
    /// A document id or collection name that does not name exactly one
    /// path segment.
    #[error("invalid document id {0:?}")]
    InvalidId(String),
    /// The transaction handle is unknown or already finished.
    #[error("unknown or finished transaction {0}")]
    UnknownTransaction(String),
    /// Client construction failed.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// A collection-oriented document store.
///
/// Implementations must be safe to share across request tasks. None of the
/// methods retry.
#[async_trait]
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// Store a new document and return its id. With an explicit id the
    /// document is created or fully replaced.
    async fn insert(
        &self,
        collection: &str,
        id: Option<&str>,
        fields: Map<String, Value>,
    ) -> Result<String, StoreError>;

    /// Every document in the collection.
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// One document, or `None` when absent.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Merge top-level fields into an existing document. Returns `false`
    /// without writing when the document does not exist.
    async fn patch(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<bool, StoreError>;

    /// Delete a document. Absent documents are not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Documents matching every filter, read within `transaction` if given.
    async fn query(
        &self,
        collection: &str,
        filters: &[FieldFilter],
        transaction: Option<&TransactionId>,
    ) -> Result<Vec<Document>, StoreError>;

    /// Start a read-write transaction.
    async fn begin_transaction(&self) -> Result<TransactionId, StoreError>;

    /// Apply every write atomically. Without a transaction the writes form
    /// a standalone batch.
    async fn commit(
        &self,
        transaction: Option<&TransactionId>,
        writes: Vec<Write>,
    ) -> Result<(), StoreError>;

    /// Abandon a transaction.
    async fn rollback(&self, transaction: &TransactionId) -> Result<(), StoreError>;

    /// Short backend name for logs (`memory`, `firestore`).
    fn backend_name(&self) -> &'static str;
}
