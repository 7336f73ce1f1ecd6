//! # Integration Tests for loan-api
//!
//! Drives the full router (authentication, authorization, validation,
//! service, envelope) over an in-memory store and a stub identity provider
//! that maps fixed bearer tokens to principals.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use loan_api::state::AppState;
use loan_core::{Role, LOANS_COLLECTION};
use loan_identity::{IdentityError, IdentityProvider, UserRecord, VerifiedToken};
use loan_schema::Schemas;
use loan_store::{
    Document, DocumentStore, FieldFilter, MemoryStore, Repository, StoreError, TransactionId,
    Write,
};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use tokio::sync::Barrier;
use tower::ServiceExt;

// -- Harness ------------------------------------------------------------------

/// Token → (uid, role). `norole-token` verifies but carries no role claim.
const PRINCIPALS: &[(&str, &str, Option<Role>)] = &[
    ("user-token", "user-1", Some(Role::User)),
    ("officer-token", "officer-1", Some(Role::Officer)),
    ("manager-token", "manager-1", Some(Role::Manager)),
    ("admin-token", "admin-1", Some(Role::Admin)),
    ("norole-token", "norole-1", None),
];

#[derive(Debug, Default)]
struct StubIdentity {
    assigned: Mutex<Vec<(String, Role)>>,
}

#[async_trait]
impl IdentityProvider for StubIdentity {
    async fn verify_token(&self, token: &str) -> Result<VerifiedToken, IdentityError> {
        PRINCIPALS
            .iter()
            .find(|(t, _, _)| *t == token)
            .map(|(_, uid, role)| VerifiedToken {
                uid: uid.to_string(),
                email: Some(format!("{uid}@example.com")),
                role: *role,
            })
            .ok_or_else(|| IdentityError::InvalidToken("INVALID_ID_TOKEN".into()))
    }

    async fn get_user(&self, uid: &str) -> Result<Option<UserRecord>, IdentityError> {
        Ok(PRINCIPALS
            .iter()
            .find(|(_, u, _)| *u == uid)
            .map(|(_, uid, role)| UserRecord {
                uid: uid.to_string(),
                email: Some(format!("{uid}@example.com")),
                display_name: None,
                disabled: false,
                role: *role,
            }))
    }

    async fn set_custom_claims(&self, uid: &str, role: Role) -> Result<(), IdentityError> {
        if uid == "ghost" {
            return Err(IdentityError::UserNotFound(uid.to_string()));
        }
        self.assigned.lock().push((uid.to_string(), role));
        Ok(())
    }
}

struct Harness {
    app: axum::Router,
    identity: Arc<StubIdentity>,
    store: Arc<MemoryStore>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let identity = Arc::new(StubIdentity::default());
    let state = AppState::new(
        Repository::new(store.clone()),
        identity.clone(),
        Schemas::compile().unwrap(),
    );
    Harness {
        app: loan_api::app(state),
        identity,
        store,
    }
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn application() -> Value {
    json!({
        "borrowerId": "user-1",
        "amount": 50000,
        "interestRate": 5.5,
        "termMonths": 12,
        "purpose": "Business expansion"
    })
}

async fn create_loan(app: &axum::Router) -> String {
    let (status, body) = send(app, "POST", "/api/v1/loans", Some("user-token"), Some(application())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

// -- Unauthenticated surface --------------------------------------------------

#[tokio::test]
async fn test_health_needs_no_credential() {
    let h = harness();
    let (status, body) = send(&h.app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "success", "message": "Server is healthy" }));
}

#[tokio::test]
async fn test_openapi_document_served() {
    let h = harness();
    let (status, body) = send(&h.app, "GET", "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/v1/loans"].is_object());
}

// -- Authentication -----------------------------------------------------------

#[tokio::test]
async fn test_list_without_credential_is_401() {
    let h = harness();
    let (status, body) = send(&h.app, "GET", "/api/v1/loans", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "AUTHENTICATION_ERROR");
}

#[tokio::test]
async fn test_list_with_unknown_token_is_401() {
    let h = harness();
    let (status, _) = send(&h.app, "GET", "/api/v1/loans", Some("forged"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_without_credential_writes_nothing() {
    let h = harness();
    let (status, _) = send(&h.app, "POST", "/api/v1/loans", None, Some(application())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(h.store.len(LOANS_COLLECTION), 0);
}

// -- Authorization ------------------------------------------------------------

#[tokio::test]
async fn test_list_role_matrix() {
    let h = harness();
    for (token, expected) in [
        ("officer-token", StatusCode::OK),
        ("manager-token", StatusCode::OK),
        ("user-token", StatusCode::FORBIDDEN),
        ("admin-token", StatusCode::FORBIDDEN),
        ("norole-token", StatusCode::FORBIDDEN),
    ] {
        let (status, body) = send(&h.app, "GET", "/api/v1/loans", Some(token), None).await;
        assert_eq!(status, expected, "{token}");
        if expected == StatusCode::FORBIDDEN {
            assert_eq!(body["code"], "AUTHORIZATION_ERROR");
        }
    }
}

#[tokio::test]
async fn test_create_by_officer_is_403_even_with_invalid_body() {
    let h = harness();
    let (status, body) = send(&h.app, "POST", "/api/v1/loans", Some("officer-token"), Some(json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "AUTHORIZATION_ERROR");
}

#[tokio::test]
async fn test_review_by_manager_and_approve_by_officer_are_403() {
    let h = harness();
    let id = create_loan(&h.app).await;
    let (status, _) = send(
        &h.app,
        "PUT",
        &format!("/api/v1/loans/{id}/review"),
        Some("manager-token"),
        Some(json!({ "reviewComments": "ok" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(
        &h.app,
        "PUT",
        &format!("/api/v1/loans/{id}/approve"),
        Some("officer-token"),
        Some(json!({ "approvedAmount": 100 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// -- Create -------------------------------------------------------------------

#[tokio::test]
async fn test_create_returns_pending_loan_with_fresh_id() {
    let h = harness();
    let (status, body) = send(&h.app, "POST", "/api/v1/loans", Some("user-token"), Some(application())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Loan application created");
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["borrowerId"], "user-1");
    assert_eq!(body["data"]["termMonths"], 12);
    assert!(body["data"]["createdAt"].is_string());

    let mut ids = vec![body["data"]["id"].as_str().unwrap().to_string()];
    for _ in 0..5 {
        ids.push(create_loan(&h.app).await);
    }
    let mut unique = ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), ids.len());
    assert_eq!(h.store.len(LOANS_COLLECTION), 6);
}

#[tokio::test]
async fn test_create_names_every_missing_field() {
    let h = harness();
    let (status, body) = send(&h.app, "POST", "/api/v1/loans", Some("user-token"), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(
        body["message"],
        "Validation error: Borrower ID is required, Loan amount is required, \
         Interest rate is required, Loan term (in months) is required"
    );
    assert_eq!(h.store.len(LOANS_COLLECTION), 0);
}

#[tokio::test]
async fn test_create_reports_invalid_values() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        "POST",
        "/api/v1/loans",
        Some("user-token"),
        Some(json!({
            "borrowerId": "user-1",
            "amount": 0,
            "interestRate": 120,
            "termMonths": "twelve"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("Loan amount must be greater than zero"), "{message}");
    assert!(message.contains("Interest rate cannot exceed 100%"), "{message}");
    assert!(message.contains("Loan term must be a whole number of months"), "{message}");
}

#[tokio::test]
async fn test_create_accepts_numeric_query_parameters() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        "POST",
        "/api/v1/loans?amount=75000&termMonths=24",
        Some("user-token"),
        Some(application()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["amount"].as_f64(), Some(75000.0));
    assert_eq!(body["data"]["termMonths"], 24);

    let (status, body) = send(
        &h.app,
        "POST",
        "/api/v1/loans?amount=plenty",
        Some("user-token"),
        Some(application()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation error: Loan amount must be a number");
}

#[tokio::test]
async fn test_create_rejects_non_pending_status() {
    let h = harness();
    let mut payload = application();
    payload["status"] = json!("approved");
    let (status, body) = send(&h.app, "POST", "/api/v1/loans", Some("user-token"), Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("pending"));
}

// -- List ---------------------------------------------------------------------

#[tokio::test]
async fn test_list_returns_created_loans() {
    let h = harness();
    let id = create_loan(&h.app).await;
    let (status, body) = send(&h.app, "GET", "/api/v1/loans", Some("officer-token"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Loans retrieved");
    let loans = body["data"].as_array().unwrap();
    assert_eq!(loans.len(), 1);
    assert_eq!(loans[0]["id"], id.as_str());
}

// -- Review -------------------------------------------------------------------

#[tokio::test]
async fn test_review_unknown_loan_is_404() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        "PUT",
        "/api/v1/loans/does-not-exist/review",
        Some("officer-token"),
        Some(json!({ "reviewComments": "Documents verified" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Loan application not found");
    assert_eq!(h.store.len(LOANS_COLLECTION), 0);
}

#[tokio::test]
async fn test_encoded_slash_in_loan_id_is_400() {
    let h = harness();
    h.store
        .insert("secrets", Some("x"), json!({ "token": "s3cr3t" }).as_object().unwrap().clone())
        .await
        .unwrap();
    for uri in [
        "/api/v1/loans/..%2Fsecrets%2Fx/review",
        "/api/v1/loans/a%2Fb/review",
    ] {
        let (status, body) = send(
            &h.app,
            "PUT",
            uri,
            Some("officer-token"),
            Some(json!({ "reviewComments": "ok" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}: {body}");
        assert_eq!(body["message"], "Loan ID is invalid");
    }
    let (status, _) = send(
        &h.app,
        "PUT",
        "/api/v1/loans/..%2Fsecrets%2Fx/approve",
        Some("manager-token"),
        Some(json!({ "approvedAmount": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let secret = h.store.get("secrets", "x").await.unwrap().unwrap();
    assert!(secret.fields.get("status").is_none());
}

#[tokio::test]
async fn test_review_pending_loan() {
    let h = harness();
    let id = create_loan(&h.app).await;
    let (status, body) = send(
        &h.app,
        "PUT",
        &format!("/api/v1/loans/{id}/review"),
        Some("officer-token"),
        Some(json!({ "reviewComments": "Documents verified" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Loan application reviewed");
    assert_eq!(body["data"]["id"], id.as_str());
    assert_eq!(body["data"]["status"], "reviewed");
    assert_eq!(body["data"]["review"]["comments"], "Documents verified");
    assert_eq!(body["data"]["review"]["reviewedBy"], "officer-1");
    assert!(body["data"]["review"]["date"].is_string());
    assert_eq!(body["data"]["amount"], 50000.0);
}

#[tokio::test]
async fn test_review_requires_comments() {
    let h = harness();
    let id = create_loan(&h.app).await;
    let (status, body) = send(
        &h.app,
        "PUT",
        &format!("/api/v1/loans/{id}/review"),
        Some("officer-token"),
        Some(json!({ "reviewDate": "2026-03-01T10:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation error: Review comments are required");
}

// -- Approve ------------------------------------------------------------------

#[tokio::test]
async fn test_approve_unknown_loan_is_404() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        "PUT",
        "/api/v1/loans/nope/approve",
        Some("manager-token"),
        Some(json!({ "approvedAmount": 1000 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_approve_existing_loan() {
    let h = harness();
    let id = create_loan(&h.app).await;
    let (status, body) = send(
        &h.app,
        "PUT",
        &format!("/api/v1/loans/{id}/approve"),
        Some("manager-token"),
        Some(json!({
            "approvedAmount": 45000,
            "approvalDate": "2026-03-01T10:00:00Z",
            "approvalComments": "Approved at reduced amount"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Loan application approved");
    assert_eq!(body["data"]["status"], "approved");
    assert_eq!(body["data"]["approval"]["approvedAmount"], 45000.0);
    assert_eq!(body["data"]["approval"]["approvedBy"], "manager-1");
    assert_eq!(body["data"]["approval"]["comments"], "Approved at reduced amount");
}

/// Holds every `get` at a two-party barrier, so two concurrent updates both
/// read the loan before either writes. Records the `status` of each patch
/// in the order the patches land.
#[derive(Debug)]
struct InterleavingStore {
    inner: MemoryStore,
    reads: Barrier,
    patched_statuses: Mutex<Vec<String>>,
}

impl InterleavingStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            reads: Barrier::new(2),
            patched_statuses: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl DocumentStore for InterleavingStore {
    async fn insert(
        &self,
        collection: &str,
        id: Option<&str>,
        fields: Map<String, Value>,
    ) -> Result<String, StoreError> {
        self.inner.insert(collection, id, fields).await
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.inner.list(collection).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let doc = self.inner.get(collection, id).await?;
        self.reads.wait().await;
        Ok(doc)
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<bool, StoreError> {
        if let Some(status) = fields.get("status").and_then(Value::as_str) {
            self.patched_statuses.lock().push(status.to_string());
        }
        self.inner.patch(collection, id, fields).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.inner.delete(collection, id).await
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[FieldFilter],
        transaction: Option<&TransactionId>,
    ) -> Result<Vec<Document>, StoreError> {
        self.inner.query(collection, filters, transaction).await
    }

    async fn begin_transaction(&self) -> Result<TransactionId, StoreError> {
        self.inner.begin_transaction().await
    }

    async fn commit(
        &self,
        transaction: Option<&TransactionId>,
        writes: Vec<Write>,
    ) -> Result<(), StoreError> {
        self.inner.commit(transaction, writes).await
    }

    async fn rollback(&self, transaction: &TransactionId) -> Result<(), StoreError> {
        self.inner.rollback(transaction).await
    }

    fn backend_name(&self) -> &'static str {
        "interleaving"
    }
}

#[tokio::test]
async fn test_concurrent_review_and_approve_both_succeed() {
    let store = Arc::new(InterleavingStore::new());
    let app = loan_api::app(AppState::new(
        Repository::new(store.clone()),
        Arc::new(StubIdentity::default()),
        Schemas::compile().unwrap(),
    ));
    let id = create_loan(&app).await;
    let review_uri = format!("/api/v1/loans/{id}/review");
    let approve_uri = format!("/api/v1/loans/{id}/approve");

    let ((review_status, reviewed), (approve_status, approved)) = tokio::join!(
        send(
            &app,
            "PUT",
            &review_uri,
            Some("officer-token"),
            Some(json!({ "reviewComments": "ok" })),
        ),
        send(
            &app,
            "PUT",
            &approve_uri,
            Some("manager-token"),
            Some(json!({ "approvedAmount": 40000 })),
        ),
    );
    assert_eq!(review_status, StatusCode::OK, "{reviewed}");
    assert_eq!(approve_status, StatusCode::OK, "{approved}");

    // Both read the loan while it was still pending.
    assert!(reviewed["data"].get("approval").map_or(true, Value::is_null));
    assert!(approved["data"].get("review").map_or(true, Value::is_null));

    // Each writer merged its own record; status is whichever patch landed last.
    let patched = store.patched_statuses.lock().clone();
    assert_eq!(patched.len(), 2, "{patched:?}");
    let stored = store.inner.get(LOANS_COLLECTION, &id).await.unwrap().unwrap();
    assert!(stored.fields["review"].is_object());
    assert!(stored.fields["approval"].is_object());
    assert_eq!(stored.fields["status"], patched[1].as_str());
}

// -- Users --------------------------------------------------------------------

#[tokio::test]
async fn test_get_user_by_any_role() {
    let h = harness();
    let (status, body) = send(&h.app, "GET", "/api/v1/users/user-1", Some("manager-token"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User retrieved");
    assert_eq!(body["data"]["uid"], "user-1");
    assert_eq!(body["data"]["role"], "user");
}

#[tokio::test]
async fn test_get_user_same_user_without_role() {
    let h = harness();
    let (status, _) = send(&h.app, "GET", "/api/v1/users/norole-1", Some("norole-token"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&h.app, "GET", "/api/v1/users/user-1", Some("norole-token"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_get_unknown_user_is_404() {
    let h = harness();
    let (status, body) = send(&h.app, "GET", "/api/v1/users/nobody", Some("admin-token"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");
}

// -- Admin --------------------------------------------------------------------

#[tokio::test]
async fn test_set_custom_claims_assigns_role() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        "POST",
        "/api/v1/admin/setCustomClaims",
        Some("norole-token"),
        Some(json!({ "uid": "user-1", "role": "Manager" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Custom claims updated");
    assert_eq!(body["data"], json!({ "uid": "user-1", "role": "manager" }));
    assert_eq!(
        h.identity.assigned.lock().clone(),
        vec![("user-1".to_string(), Role::Manager)]
    );
}

#[tokio::test]
async fn test_set_custom_claims_validation_and_errors() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        "POST",
        "/api/v1/admin/setCustomClaims",
        Some("admin-token"),
        Some(json!({ "uid": "user-1", "role": "root" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Validation error: Role must be one of admin, manager, user, officer"
    );

    let (status, _) = send(
        &h.app,
        "POST",
        "/api/v1/admin/setCustomClaims",
        Some("admin-token"),
        Some(json!({ "uid": "ghost", "role": "user" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &h.app,
        "POST",
        "/api/v1/admin/setCustomClaims",
        None,
        Some(json!({ "uid": "user-1", "role": "user" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(h.identity.assigned.lock().is_empty());
}
