//! In-process document store.
//!
//! Collections are `BTreeMap`s keyed by document id behind one
//! `parking_lot::RwLock`, so listing order is id order (as in Firestore).
//! The lock is never held across an `.await`.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::document::{Document, FieldFilter, TransactionId, Write};
use crate::store::{DocumentStore, StoreError};

#[derive(Debug, Clone)]
struct Stored {
    fields: Map<String, Value>,
    create_time: DateTime<Utc>,
    update_time: DateTime<Utc>,
}

impl Stored {
    fn to_document(&self, id: &str) -> Document {
        Document {
            id: id.to_string(),
            fields: self.fields.clone(),
            create_time: Some(self.create_time),
            update_time: Some(self.update_time),
        }
    }
}

type Collections = HashMap<String, BTreeMap<String, Stored>>;

/// Document store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
    open_transactions: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    fn finish_transaction(&self, transaction: &TransactionId) -> Result<(), StoreError> {
        if self.open_transactions.lock().remove(&transaction.0) {
            Ok(())
        } else {
            Err(StoreError::UnknownTransaction(transaction.0.clone()))
        }
    }
}

fn set(collections: &mut Collections, collection: &str, id: &str, fields: Map<String, Value>) {
    let now = Utc::now();
    let docs = collections.entry(collection.to_string()).or_default();
    let create_time = docs.get(id).map_or(now, |existing| existing.create_time);
    docs.insert(
        id.to_string(),
        Stored {
            fields,
            create_time,
            update_time: now,
        },
    );
}

fn merge(
    collections: &mut Collections,
    collection: &str,
    id: &str,
    fields: Map<String, Value>,
) -> bool {
    let Some(doc) = collections.get_mut(collection).and_then(|docs| docs.get_mut(id)) else {
        return false;
    };
    doc.fields.extend(fields);
    doc.update_time = Utc::now();
    true
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(
        &self,
        collection: &str,
        id: Option<&str>,
        fields: Map<String, Value>,
    ) -> Result<String, StoreError> {
        let id = id.map_or_else(|| Uuid::new_v4().simple().to_string(), str::to_string);
        set(&mut self.collections.write(), collection, &id, fields);
        Ok(id)
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().map(|(id, doc)| doc.to_document(id)).collect())
            .unwrap_or_default())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|doc| doc.to_document(id)))
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<bool, StoreError> {
        Ok(merge(&mut self.collections.write(), collection, id, fields))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        if let Some(docs) = self.collections.write().get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[FieldFilter],
        transaction: Option<&TransactionId>,
    ) -> Result<Vec<Document>, StoreError> {
        if let Some(txn) = transaction {
            if !self.open_transactions.lock().contains(&txn.0) {
                return Err(StoreError::UnknownTransaction(txn.0.clone()));
            }
        }
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, doc)| filters.iter().all(|f| f.matches(&doc.fields)))
                    .map(|(id, doc)| doc.to_document(id))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn begin_transaction(&self) -> Result<TransactionId, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        self.open_transactions.lock().insert(id.clone());
        Ok(TransactionId(id))
    }

    async fn commit(
        &self,
        transaction: Option<&TransactionId>,
        writes: Vec<Write>,
    ) -> Result<(), StoreError> {
        if let Some(txn) = transaction {
            self.finish_transaction(txn)?;
        }
        let mut collections = self.collections.write();

        // Check every update target before touching anything so a failed
        // batch leaves no partial writes. Earlier writes in the batch count.
        let mut staged: HashMap<(&str, &str), bool> = HashMap::new();
        for write in &writes {
            let key = (write.collection(), write.id());
            match write {
                Write::Set { .. } => {
                    staged.insert(key, true);
                }
                Write::Delete { .. } => {
                    staged.insert(key, false);
                }
                Write::Update { collection, id, .. } => {
                    let exists = staged.get(&key).copied().unwrap_or_else(|| {
                        collections
                            .get(collection)
                            .is_some_and(|docs| docs.contains_key(id))
                    });
                    if !exists {
                        return Err(StoreError::Missing {
                            collection: collection.clone(),
                            id: id.clone(),
                        });
                    }
                }
            }
        }
        drop(staged);

        for write in writes {
            match write {
                Write::Set {
                    collection,
                    id,
                    fields,
                } => set(&mut collections, &collection, &id, fields),
                Write::Update {
                    collection,
                    id,
                    fields,
                } => {
                    merge(&mut collections, &collection, &id, fields);
                }
                Write::Delete { collection, id } => {
                    if let Some(docs) = collections.get_mut(&collection) {
                        docs.remove(&id);
                    }
                }
            }
        }
        Ok(())
    }

    async fn rollback(&self, transaction: &TransactionId) -> Result<(), StoreError> {
        self.finish_transaction(transaction)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
