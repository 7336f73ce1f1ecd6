//! Contract tests for IdentityToolkitClient against a mocked Identity
//! Toolkit REST API v1.

use loan_core::Role;
use loan_identity::{IdentityConfig, IdentityError, IdentityProvider, IdentityToolkitClient};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(mock_server: &MockServer) -> IdentityToolkitClient {
    let config = IdentityConfig {
        base_url: mock_server.uri().parse().unwrap(),
        api_key: zeroize::Zeroizing::new("test-key".into()),
        project_id: "demo".into(),
        access_token: Some(zeroize::Zeroizing::new("admin-token".into())),
        timeout_secs: 5,
    };
    IdentityToolkitClient::new(config).unwrap()
}

// ── verify_token ─────────────────────────────────────────────────────

#[tokio::test]
async fn verify_token_resolves_uid_email_and_role() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:lookup"))
        .and(query_param("key", "test-key"))
        .and(body_json(json!({ "idToken": "good-token" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "identitytoolkit#GetAccountInfoResponse",
            "users": [{
                "localId": "officer-1",
                "email": "officer@example.com",
                "customAttributes": "{\"role\":\"officer\"}"
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let verified = client.verify_token("good-token").await.unwrap();
    assert_eq!(verified.uid, "officer-1");
    assert_eq!(verified.email.as_deref(), Some("officer@example.com"));
    assert_eq!(verified.role, Some(Role::Officer));
}

#[tokio::test]
async fn verify_token_without_role_claim() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:lookup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [{ "localId": "plain-user" }]
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let verified = client.verify_token("t").await.unwrap();
    assert_eq!(verified.uid, "plain-user");
    assert_eq!(verified.role, None);
}

#[tokio::test]
async fn verify_token_expired_is_invalid_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:lookup"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "TOKEN_EXPIRED" }
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client.verify_token("old").await.unwrap_err();
    assert!(matches!(err, IdentityError::InvalidToken(ref code) if code == "TOKEN_EXPIRED"));
    assert!(err.is_credential_error());
}

#[tokio::test]
async fn verify_token_disabled_user() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:lookup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [{ "localId": "gone", "disabled": true }]
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client.verify_token("t").await.unwrap_err();
    assert!(matches!(err, IdentityError::UserDisabled(ref uid) if uid == "gone"));
}

#[tokio::test]
async fn verify_token_service_outage_is_not_credential_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:lookup"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client.verify_token("t").await.unwrap_err();
    assert!(matches!(err, IdentityError::ApiError { status: 503, .. }));
    assert!(!err.is_credential_error());
}

// ── get_user ─────────────────────────────────────────────────────────

#[tokio::test]
async fn get_user_sends_bearer_and_maps_record() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/projects/demo/accounts:lookup"))
        .and(header("authorization", "Bearer admin-token"))
        .and(body_json(json!({ "localId": ["user-7"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [{
                "localId": "user-7",
                "email": "seven@example.com",
                "displayName": "Seven",
                "customAttributes": "{\"role\":\"user\"}"
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let user = client.get_user("user-7").await.unwrap().unwrap();
    assert_eq!(user.uid, "user-7");
    assert_eq!(user.display_name.as_deref(), Some("Seven"));
    assert!(!user.disabled);
    assert_eq!(user.role, Some(Role::User));
}

#[tokio::test]
async fn get_user_absent_is_none() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/projects/demo/accounts:lookup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "identitytoolkit#GetAccountInfoResponse"
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    assert!(client.get_user("nobody").await.unwrap().is_none());
}

// ── set_custom_claims ────────────────────────────────────────────────

#[tokio::test]
async fn set_custom_claims_writes_role_attribute() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/projects/demo/accounts:update"))
        .and(header("authorization", "Bearer admin-token"))
        .and(body_json(json!({
            "localId": "user-7",
            "customAttributes": "{\"role\":\"manager\"}"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "localId": "user-7" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    client.set_custom_claims("user-7", Role::Manager).await.unwrap();
}

#[tokio::test]
async fn set_custom_claims_unknown_user() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/projects/demo/accounts:update"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "USER_NOT_FOUND" }
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client.set_custom_claims("ghost", Role::Admin).await.unwrap_err();
    assert!(matches!(err, IdentityError::UserNotFound(ref uid) if uid == "ghost"));
}
