//! Identity Toolkit client configuration.
//!
//! When `FIREBASE_AUTH_EMULATOR_HOST` is set the client targets the Auth
//! emulator, which serves the same API under
//! `http://{host}/identitytoolkit.googleapis.com` and accepts any API key
//! and the `owner` bearer token.

use url::Url;
use zeroize::Zeroizing;

const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com";
const EMULATOR_API_KEY: &str = "emulator-api-key";
const EMULATOR_TOKEN: &str = "owner";

/// Configuration for [`IdentityToolkitClient`](crate::IdentityToolkitClient).
///
/// Custom `Debug` implementation redacts the API key and access token.
#[derive(Clone)]
pub struct IdentityConfig {
    /// Base URL of the Identity Toolkit API (or emulator).
    pub base_url: Url,
    /// Web API key used for token lookups.
    pub api_key: Zeroizing<String>,
    /// Project that owns the user pool. Used by administrative calls.
    pub project_id: String,
    /// OAuth2 bearer token for administrative calls.
    pub access_token: Option<Zeroizing<String>>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("project_id", &self.project_id)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl IdentityConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `FIREBASE_PROJECT_ID` (required)
    /// - `FIREBASE_API_KEY` (required unless the emulator is used)
    /// - `FIREBASE_AUTH_EMULATOR_HOST` (`host:port`; overrides URL, key, and token)
    /// - `IDENTITY_TOOLKIT_URL` (default: `https://identitytoolkit.googleapis.com`)
    /// - `IDENTITY_ACCESS_TOKEN` (optional)
    /// - `IDENTITY_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let project_id =
            non_empty_var("FIREBASE_PROJECT_ID").ok_or(ConfigError::MissingProjectId)?;

        let mut config = match non_empty_var("FIREBASE_AUTH_EMULATOR_HOST") {
            Some(host) => Self::emulator(&host, &project_id)?,
            None => Self {
                base_url: env_url("IDENTITY_TOOLKIT_URL", DEFAULT_IDENTITY_URL)?,
                api_key: Zeroizing::new(
                    non_empty_var("FIREBASE_API_KEY").ok_or(ConfigError::MissingApiKey)?,
                ),
                project_id,
                access_token: non_empty_var("IDENTITY_ACCESS_TOKEN").map(Zeroizing::new),
                timeout_secs: 30,
            },
        };
        if let Some(secs) = std::env::var("IDENTITY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.timeout_secs = secs;
        }
        Ok(config)
    }

    /// Configuration for a local Auth emulator at `host:port`.
    pub fn emulator(host: &str, project_id: &str) -> Result<Self, ConfigError> {
        let raw = format!("http://{}/identitytoolkit.googleapis.com", host.trim());
        let base_url = Url::parse(&raw).map_err(|e| {
            ConfigError::InvalidUrl("FIREBASE_AUTH_EMULATOR_HOST".into(), e.to_string())
        })?;
        Ok(Self {
            base_url,
            api_key: Zeroizing::new(EMULATOR_API_KEY.to_string()),
            project_id: project_id.to_string(),
            access_token: Some(Zeroizing::new(EMULATOR_TOKEN.to_string())),
            timeout_secs: 5,
        })
    }

    /// Base URL without a trailing slash, for joining API paths.
    pub(crate) fn api_root(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }
}

fn non_empty_var(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|s| !s.trim().is_empty())
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("FIREBASE_PROJECT_ID environment variable is required")]
    MissingProjectId,
    #[error("FIREBASE_API_KEY environment variable is required")]
    MissingApiKey,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}
