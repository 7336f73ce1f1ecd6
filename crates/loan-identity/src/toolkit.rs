//! Identity Toolkit REST client.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST | `/v1/accounts:lookup?key={apiKey}` | Verify an ID token |
//! | POST | `/v1/projects/{project}/accounts:lookup` | Get user by id |
//! | POST | `/v1/projects/{project}/accounts:update` | Set custom attributes |

use std::time::Duration;

use async_trait::async_trait;
use loan_core::Role;
use serde::Deserialize;
use serde_json::json;
use zeroize::Zeroizing;

use crate::config::IdentityConfig;
use crate::error::IdentityError;
use crate::provider::{IdentityProvider, UserRecord, VerifiedToken};

/// Account as returned by `accounts:lookup`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Account {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    disabled: bool,
    /// JSON object encoded as a string, e.g. `{"role":"officer"}`.
    #[serde(default)]
    custom_attributes: Option<String>,
}

impl Account {
    fn role(&self) -> Option<Role> {
        let raw = self.custom_attributes.as_deref()?;
        let attrs: serde_json::Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(uid = %self.local_id, error = %e, "unparseable custom attributes");
                return None;
            }
        };
        let claim = attrs.get("role")?.as_str()?;
        match claim.parse() {
            Ok(role) => Some(role),
            Err(_) => {
                tracing::warn!(uid = %self.local_id, role = claim, "unrecognised role claim");
                None
            }
        }
    }

    fn into_record(self) -> UserRecord {
        let role = self.role();
        UserRecord {
            uid: self.local_id,
            email: self.email,
            display_name: self.display_name,
            disabled: self.disabled,
            role,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<Account>,
}

/// Error body: `{"error": {"code": 400, "message": "INVALID_ID_TOKEN"}}`.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

fn error_code(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .map(|e| e.error.message)
}

/// Client for the Identity Toolkit API.
///
/// Custom `Debug` implementation omits the API key and access token.
#[derive(Clone)]
pub struct IdentityToolkitClient {
    http: reqwest::Client,
    api_root: String,
    api_key: Zeroizing<String>,
    project_id: String,
    access_token: Option<Zeroizing<String>>,
}

impl std::fmt::Debug for IdentityToolkitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityToolkitClient")
            .field("api_root", &self.api_root)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

impl IdentityToolkitClient {
    /// Create a client from configuration.
    pub fn new(config: IdentityConfig) -> Result<Self, IdentityError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| IdentityError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        Ok(Self {
            http,
            api_root: config.api_root().to_string(),
            api_key: config.api_key,
            project_id: config.project_id,
            access_token: config.access_token,
        })
    }

    fn admin_request(&self, url: String) -> reqwest::RequestBuilder {
        let request = self.http.post(url);
        match &self.access_token {
            Some(token) => request.bearer_auth(token.as_str()),
            None => request,
        }
    }

    async fn send(
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, IdentityError> {
        request.send().await.map_err(|e| IdentityError::Http {
            endpoint: endpoint.to_string(),
            source: e,
        })
    }

    async fn read_lookup(
        endpoint: &str,
        resp: reqwest::Response,
    ) -> Result<LookupResponse, IdentityError> {
        resp.json().await.map_err(|e| IdentityError::Deserialization {
            endpoint: endpoint.to_string(),
            source: e,
        })
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitClient {
    async fn verify_token(&self, token: &str) -> Result<VerifiedToken, IdentityError> {
        let endpoint = "POST /v1/accounts:lookup";
        let url = format!("{}/v1/accounts:lookup", self.api_root);
        let request = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({ "idToken": token }));
        let resp = Self::send(endpoint, request).await?;

        // The service answers 400 for malformed, expired, and revoked tokens.
        if resp.status() == reqwest::StatusCode::BAD_REQUEST {
            let body = resp.text().await.unwrap_or_default();
            let code = error_code(&body).unwrap_or_else(|| "INVALID_ID_TOKEN".to_string());
            return Err(IdentityError::InvalidToken(code));
        }
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(IdentityError::ApiError {
                endpoint: endpoint.into(),
                status,
                body,
            });
        }

        let lookup = Self::read_lookup(endpoint, resp).await?;
        let account = lookup
            .users
            .into_iter()
            .next()
            .ok_or_else(|| IdentityError::InvalidToken("USER_NOT_FOUND".into()))?;
        if account.disabled {
            return Err(IdentityError::UserDisabled(account.local_id));
        }
        let role = account.role();
        Ok(VerifiedToken {
            uid: account.local_id,
            email: account.email,
            role,
        })
    }

    async fn get_user(&self, uid: &str) -> Result<Option<UserRecord>, IdentityError> {
        let endpoint = "POST /v1/projects/{project}/accounts:lookup";
        let url = format!(
            "{}/v1/projects/{}/accounts:lookup",
            self.api_root, self.project_id
        );
        let request = self
            .admin_request(url)
            .json(&json!({ "localId": [uid] }));
        let resp = Self::send(endpoint, request).await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            if error_code(&body).as_deref() == Some("USER_NOT_FOUND") {
                return Ok(None);
            }
            return Err(IdentityError::ApiError {
                endpoint: endpoint.into(),
                status,
                body,
            });
        }

        let lookup = Self::read_lookup(endpoint, resp).await?;
        Ok(lookup.users.into_iter().next().map(Account::into_record))
    }

    async fn set_custom_claims(&self, uid: &str, role: Role) -> Result<(), IdentityError> {
        let endpoint = "POST /v1/projects/{project}/accounts:update";
        let url = format!(
            "{}/v1/projects/{}/accounts:update",
            self.api_root, self.project_id
        );
        let attributes = json!({ "role": role.as_str() }).to_string();
        let request = self.admin_request(url).json(&json!({
            "localId": uid,
            "customAttributes": attributes,
        }));
        let resp = Self::send(endpoint, request).await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            if error_code(&body).as_deref() == Some("USER_NOT_FOUND") {
                return Err(IdentityError::UserNotFound(uid.to_string()));
            }
            return Err(IdentityError::ApiError {
                endpoint: endpoint.into(),
                status,
                body,
            });
        }

        tracing::info!(uid, role = %role, "custom claims updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(attrs: Option<&str>) -> Account {
        Account {
            local_id: "u1".into(),
            email: None,
            display_name: None,
            disabled: false,
            custom_attributes: attrs.map(str::to_string),
        }
    }

    #[test]
    fn role_read_from_custom_attributes() {
        assert_eq!(account(Some(r#"{"role":"officer"}"#)).role(), Some(Role::Officer));
        assert_eq!(account(Some(r#"{"role":"Manager"}"#)).role(), Some(Role::Manager));
    }

    #[test]
    fn missing_or_unknown_role_is_none() {
        assert_eq!(account(None).role(), None);
        assert_eq!(account(Some("{}")).role(), None);
        assert_eq!(account(Some(r#"{"role":"root"}"#)).role(), None);
        assert_eq!(account(Some("not json")).role(), None);
    }

    #[test]
    fn error_code_extracts_message() {
        let body = r#"{"error":{"code":400,"message":"TOKEN_EXPIRED","errors":[]}}"#;
        assert_eq!(error_code(body).as_deref(), Some("TOKEN_EXPIRED"));
        assert_eq!(error_code("<html>"), None);
    }
}
