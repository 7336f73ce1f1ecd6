//! Backend-neutral document types.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::store::StoreError;

/// A stored document: its key within a collection plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
    /// When the backend first stored the document, if it tracks that.
    pub create_time: Option<DateTime<Utc>>,
    /// When the backend last wrote the document, if it tracks that.
    pub update_time: Option<DateTime<Utc>>,
}

impl Document {
    /// Look up a field by dotted path (`review.comments`).
    pub fn field(&self, path: &str) -> Option<&Value> {
        lookup(&self.fields, path)
    }
}

/// Resolve a dotted field path against a document body.
pub(crate) fn lookup<'a>(fields: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = fields.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Reject keys that would address anything other than one document
/// directly under its collection.
///
/// A key must be non-empty, must not contain `/`, and must not be `.` or
/// `..`. The same rule applies to collection names.
pub fn check_document_id(id: &str) -> Result<(), StoreError> {
    if id.is_empty() || id.contains('/') || id == "." || id == ".." {
        return Err(StoreError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// Equality filter on one field. Multiple filters in a query are AND-ed.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub(crate) fn matches(&self, fields: &Map<String, Value>) -> bool {
        lookup(fields, &self.field) == Some(&self.value)
    }
}

/// A staged write, applied atomically with the rest of its batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Create or replace the whole document.
    Set {
        collection: String,
        id: String,
        fields: Map<String, Value>,
    },
    /// Merge the given top-level fields into an existing document. The
    /// batch fails if the document does not exist.
    Update {
        collection: String,
        id: String,
        fields: Map<String, Value>,
    },
    /// Delete the document. Deleting an absent document is not an error.
    Delete { collection: String, id: String },
}

impl Write {
    pub fn collection(&self) -> &str {
        match self {
            Self::Set { collection, .. }
            | Self::Update { collection, .. }
            | Self::Delete { collection, .. } => collection,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Set { id, .. } | Self::Update { id, .. } | Self::Delete { id, .. } => id,
        }
    }
}

/// Opaque backend transaction handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionId(pub String);

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
