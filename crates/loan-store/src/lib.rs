//! # loan-store: Document Repository
//!
//! Generic CRUD over collections of schemaless JSON documents, plus
//! transactional batch deletes.
//!
//! ## Layers
//!
//! - [`DocumentStore`]: the backend seam. Object-safe, so callers hold an
//!   `Arc<dyn DocumentStore>` built once at startup.
//!   - [`MemoryStore`]: in-process, for development and tests.
//!   - [`FirestoreStore`]: Cloud Firestore REST API v1 (or its emulator).
//! - [`Repository`]: the contract the service layer uses. Maps backend
//!   failures into [`RepositoryError`], logging each one with the operation,
//!   collection, and document id.
//!
//! No operation retries. A failed call surfaces immediately.

pub mod config;
pub mod document;
pub mod firestore;
pub mod memory;
pub mod repository;
pub mod store;

pub use config::{ConfigError, StoreConfig};
pub use document::{check_document_id, Document, FieldFilter, TransactionId, Write};
pub use firestore::FirestoreStore;
pub use memory::MemoryStore;
pub use repository::{Repository, RepositoryError, Transaction};
pub use store::{DocumentStore, StoreError};
