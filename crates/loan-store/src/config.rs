//! Firestore connection configuration.
//!
//! Loaded from the environment. When `FIRESTORE_EMULATOR_HOST` is set the
//! client talks plain HTTP to the emulator and authenticates as `owner`,
//! which the emulator accepts without credentials.

use url::Url;
use zeroize::Zeroizing;

const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com";
const DEFAULT_DATABASE: &str = "(default)";
const EMULATOR_TOKEN: &str = "owner";

/// Configuration for [`FirestoreStore`](crate::FirestoreStore).
///
/// Custom `Debug` implementation redacts the access token.
#[derive(Clone)]
pub struct StoreConfig {
    /// Base URL of the Firestore REST API (or emulator).
    pub base_url: Url,
    /// Google Cloud project id.
    pub project_id: String,
    /// Database id, `(default)` unless configured.
    pub database: String,
    /// OAuth2 bearer token. Sent on every request when present.
    pub access_token: Option<Zeroizing<String>>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("base_url", &self.base_url)
            .field("project_id", &self.project_id)
            .field("database", &self.database)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `FIRESTORE_PROJECT_ID` (required)
    /// - `FIRESTORE_DATABASE` (default: `(default)`)
    /// - `FIRESTORE_EMULATOR_HOST` (`host:port`; overrides the URL and token)
    /// - `FIRESTORE_URL` (default: `https://firestore.googleapis.com`)
    /// - `FIRESTORE_ACCESS_TOKEN` (optional)
    /// - `FIRESTORE_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let project_id = std::env::var("FIRESTORE_PROJECT_ID")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingProjectId)?;

        let mut config = match std::env::var("FIRESTORE_EMULATOR_HOST") {
            Ok(host) if !host.trim().is_empty() => Self::emulator(&host, &project_id)?,
            _ => Self {
                base_url: env_url("FIRESTORE_URL", DEFAULT_FIRESTORE_URL)?,
                project_id,
                database: DEFAULT_DATABASE.to_string(),
                access_token: std::env::var("FIRESTORE_ACCESS_TOKEN")
                    .ok()
                    .map(Zeroizing::new),
                timeout_secs: 30,
            },
        };
        if let Ok(database) = std::env::var("FIRESTORE_DATABASE") {
            config.database = database;
        }
        if let Some(secs) = std::env::var("FIRESTORE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.timeout_secs = secs;
        }
        Ok(config)
    }

    /// Configuration for a local Firestore emulator at `host:port`.
    pub fn emulator(host: &str, project_id: &str) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&format!("http://{}", host.trim()))
            .map_err(|e| ConfigError::InvalidUrl("FIRESTORE_EMULATOR_HOST".into(), e.to_string()))?;
        Ok(Self {
            base_url,
            project_id: project_id.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            access_token: Some(Zeroizing::new(EMULATOR_TOKEN.to_string())),
            timeout_secs: 5,
        })
    }

    /// `projects/{project}/databases/{database}/documents`
    pub fn documents_path(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.project_id, self.database
        )
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("FIRESTORE_PROJECT_ID environment variable is required")]
    MissingProjectId,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("access token is not a valid header value")]
    InvalidToken,
}
