//! Cloud Firestore backend over the REST API v1.
//!
//! All paths are relative to
//! `{base_url}v1/projects/{project}/databases/{database}/documents`.
//!
//! | Operation | Method | Path |
//! |-----------|--------|------|
//! | insert (generated id) | POST | `/{collection}` |
//! | insert (explicit id) | PATCH | `/{collection}/{id}` |
//! | list | GET | `/{collection}?pageSize=..&pageToken=..` |
//! | get | GET | `/{collection}/{id}` |
//! | patch | PATCH | `/{collection}/{id}?updateMask.fieldPaths=..&currentDocument.exists=true` |
//! | delete | DELETE | `/{collection}/{id}` |
//! | query | POST | `:runQuery` |
//! | begin_transaction | POST | `:beginTransaction` |
//! | commit | POST | `:commit` |
//! | rollback | POST | `:rollback` |

pub mod value;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use url::Url;

use crate::config::{ConfigError, StoreConfig};
use crate::document::{check_document_id, Document, FieldFilter, TransactionId, Write};
use crate::store::{DocumentStore, StoreError};

/// Page size used when listing a collection.
const LIST_PAGE_SIZE: u32 = 300;

/// Firestore REST client.
#[derive(Debug, Clone)]
pub struct FirestoreStore {
    http: reqwest::Client,
    /// `{base_url}v1/projects/{p}/databases/{d}/documents`
    documents_url: Url,
    /// `projects/{p}/databases/{d}/documents`, the prefix of every resource name.
    documents_path: String,
}

/// Document as returned by the REST API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
    #[serde(default)]
    create_time: Option<DateTime<Utc>>,
    #[serde(default)]
    update_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RestDocument>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// One element of the `:runQuery` response stream.
#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    document: Option<RestDocument>,
}

#[derive(Debug, Deserialize)]
struct BeginTransactionResponse {
    transaction: String,
}

impl RestDocument {
    fn into_document(self) -> Result<Document, StoreError> {
        let id = self
            .name
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Ok(Document {
            id,
            fields: value::decode_fields(&self.fields)?,
            create_time: self.create_time,
            update_time: self.update_time,
        })
    }
}

impl FirestoreStore {
    /// Build a client from configuration.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.access_token {
            let mut value =
                reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
                    .map_err(|_| ConfigError::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        let documents_path = config.documents_path();
        let mut documents_url = config.base_url.clone();
        documents_url
            .path_segments_mut()
            .map_err(|()| {
                ConfigError::InvalidUrl("FIRESTORE_URL".into(), "URL cannot be a base".into())
            })?
            .pop_if_empty()
            .push("v1")
            .extend(documents_path.split('/'));
        Ok(Self {
            http,
            documents_url,
            documents_path,
        })
    }

    /// `{documents_url}/{segments..}`, each segment percent-encoded whole.
    fn segments_url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        for segment in segments {
            check_document_id(segment)?;
        }
        let mut url = self.documents_url.clone();
        url.path_segments_mut()
            .map_err(|()| StoreError::Encoding("documents URL cannot be a base".into()))?
            .extend(segments);
        Ok(url)
    }

    fn collection_url(&self, collection: &str) -> Result<Url, StoreError> {
        self.segments_url(&[collection])
    }

    fn document_url(&self, collection: &str, id: &str) -> Result<Url, StoreError> {
        self.segments_url(&[collection, id])
    }

    /// `{documents_url}:{action}` for the database-level RPCs.
    fn action_url(&self, action: &str) -> String {
        format!("{}:{action}", self.documents_url)
    }

    fn resource_name(&self, collection: &str, id: &str) -> Result<String, StoreError> {
        check_document_id(collection)?;
        check_document_id(id)?;
        Ok(format!("{}/{collection}/{id}", self.documents_path))
    }

    fn encode_write(&self, write: Write) -> Result<Value, StoreError> {
        Ok(match write {
            Write::Set {
                collection,
                id,
                fields,
            } => json!({
                "update": {
                    "name": self.resource_name(&collection, &id)?,
                    "fields": value::encode_fields(&fields),
                }
            }),
            Write::Update {
                collection,
                id,
                fields,
            } => {
                let paths: Vec<String> = fields.keys().map(|k| field_path(k)).collect();
                json!({
                    "update": {
                        "name": self.resource_name(&collection, &id)?,
                        "fields": value::encode_fields(&fields),
                    },
                    "updateMask": { "fieldPaths": paths },
                    "currentDocument": { "exists": true },
                })
            }
            Write::Delete { collection, id } => json!({
                "delete": self.resource_name(&collection, &id)?,
            }),
        })
    }

    async fn send(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, StoreError> {
        request.send().await.map_err(|e| StoreError::Http {
            endpoint: endpoint.to_string(),
            source: e,
        })
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        endpoint: &str,
        resp: reqwest::Response,
    ) -> Result<T, StoreError> {
        let resp = ensure_success(endpoint, resp).await?;
        resp.json().await.map_err(|e| StoreError::Deserialization {
            endpoint: endpoint.to_string(),
            source: e,
        })
    }
}

async fn ensure_success(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, StoreError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Api {
        endpoint: endpoint.to_string(),
        status,
        body,
    })
}

/// Quote a field name for an update mask unless it is a simple identifier.
fn field_path(name: &str) -> String {
    let simple = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

fn structured_filter(filters: &[FieldFilter]) -> Option<Value> {
    let mut clauses: Vec<Value> = filters
        .iter()
        .map(|f| {
            json!({
                "fieldFilter": {
                    "field": { "fieldPath": f.field },
                    "op": "EQUAL",
                    "value": value::encode(&f.value),
                }
            })
        })
        .collect();
    match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(json!({ "compositeFilter": { "op": "AND", "filters": clauses } })),
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn insert(
        &self,
        collection: &str,
        id: Option<&str>,
        fields: Map<String, Value>,
    ) -> Result<String, StoreError> {
        let body = json!({ "fields": value::encode_fields(&fields) });
        match id {
            Some(id) => {
                let endpoint = format!("PATCH /{collection}/{id}");
                let resp = self
                    .send(&endpoint, self.http.patch(self.document_url(collection, id)?).json(&body))
                    .await?;
                ensure_success(&endpoint, resp).await?;
                Ok(id.to_string())
            }
            None => {
                let endpoint = format!("POST /{collection}");
                let url = self.collection_url(collection)?;
                let resp = self.send(&endpoint, self.http.post(url).json(&body)).await?;
                let doc: RestDocument = Self::read_json(&endpoint, resp).await?;
                Ok(doc.into_document()?.id)
            }
        }
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let endpoint = format!("GET /{collection}");
        let url = self.collection_url(collection)?;
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(url.clone())
                .query(&[("pageSize", LIST_PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }
            let resp = self.send(&endpoint, request).await?;
            let page: ListResponse = Self::read_json(&endpoint, resp).await?;
            for doc in page.documents {
                documents.push(doc.into_document()?);
            }
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(collection, count = documents.len(), "listed collection");
        Ok(documents)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let endpoint = format!("GET /{collection}/{id}");
        let resp = self
            .send(&endpoint, self.http.get(self.document_url(collection, id)?))
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let doc: RestDocument = Self::read_json(&endpoint, resp).await?;
        doc.into_document().map(Some)
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<bool, StoreError> {
        let endpoint = format!("PATCH /{collection}/{id}");
        let mut params: Vec<(&str, String)> = fields
            .keys()
            .map(|k| ("updateMask.fieldPaths", field_path(k)))
            .collect();
        params.push(("currentDocument.exists", "true".to_string()));
        let body = json!({ "fields": value::encode_fields(&fields) });

        let resp = self
            .send(
                &endpoint,
                self.http
                    .patch(self.document_url(collection, id)?)
                    .query(&params)
                    .json(&body),
            )
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        ensure_success(&endpoint, resp).await?;
        Ok(true)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let endpoint = format!("DELETE /{collection}/{id}");
        let resp = self
            .send(&endpoint, self.http.delete(self.document_url(collection, id)?))
            .await?;
        ensure_success(&endpoint, resp).await?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[FieldFilter],
        transaction: Option<&TransactionId>,
    ) -> Result<Vec<Document>, StoreError> {
        let endpoint = "POST :runQuery";
        let mut structured = json!({ "from": [{ "collectionId": collection }] });
        if let Some(filter) = structured_filter(filters) {
            structured["where"] = filter;
        }
        let mut body = json!({ "structuredQuery": structured });
        if let Some(txn) = transaction {
            body["transaction"] = Value::String(txn.0.clone());
        }

        check_document_id(collection)?;
        let url = self.action_url("runQuery");
        let resp = self.send(endpoint, self.http.post(url).json(&body)).await?;
        let results: Vec<QueryResult> = Self::read_json(endpoint, resp).await?;
        results
            .into_iter()
            .filter_map(|r| r.document)
            .map(RestDocument::into_document)
            .collect()
    }

    async fn begin_transaction(&self) -> Result<TransactionId, StoreError> {
        let endpoint = "POST :beginTransaction";
        let url = self.action_url("beginTransaction");
        let resp = self
            .send(endpoint, self.http.post(url).json(&json!({})))
            .await?;
        let begun: BeginTransactionResponse = Self::read_json(endpoint, resp).await?;
        Ok(TransactionId(begun.transaction))
    }

    async fn commit(
        &self,
        transaction: Option<&TransactionId>,
        writes: Vec<Write>,
    ) -> Result<(), StoreError> {
        let endpoint = "POST :commit";
        let writes = writes
            .into_iter()
            .map(|w| self.encode_write(w))
            .collect::<Result<Vec<Value>, StoreError>>()?;
        let mut body = json!({ "writes": writes });
        if let Some(txn) = transaction {
            body["transaction"] = Value::String(txn.0.clone());
        }
        let url = self.action_url("commit");
        let resp = self.send(endpoint, self.http.post(url).json(&body)).await?;
        ensure_success(endpoint, resp).await?;
        Ok(())
    }

    async fn rollback(&self, transaction: &TransactionId) -> Result<(), StoreError> {
        let endpoint = "POST :rollback";
        let url = self.action_url("rollback");
        let resp = self
            .send(
                endpoint,
                self.http
                    .post(url)
                    .json(&json!({ "transaction": transaction.0 })),
            )
            .await?;
        ensure_success(endpoint, resp).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "firestore"
    }
}
