//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BUBBLEMART_API_BASE_URL` - Base URL of the REST API
//!
//! ## Optional
//! - `BUBBLEMART_APP_URL` - Public origin for payment callbacks (default: `http://localhost:3000`)
//! - `BUBBLEMART_TOKEN_STORAGE_KEY` - Name the bearer token is persisted under (default: `bubblemart_token`)
//! - `BUBBLEMART_DATA_DIR` - Directory holding the persisted token (default: `.bubblemart`)
//! - `BUBBLEMART_QUANTITY_DEBOUNCE_MS` - Quiet period before a quantity change is sent (default: 1500)
//! - `BUBBLEMART_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: HTTP client default)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use bubblemart_core::OrderId;
use thiserror::Error;
use url::Url;

const DEFAULT_APP_URL: &str = "http://localhost:3000";
const DEFAULT_TOKEN_STORAGE_KEY: &str = "bubblemart_token";
const DEFAULT_DATA_DIR: &str = ".bubblemart";
const DEFAULT_QUANTITY_DEBOUNCE_MS: u64 = 1500;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Commerce client configuration.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL every API path is joined onto
    pub api_base_url: Url,
    /// Public origin of the app, used for payment callback URLs
    pub app_url: String,
    /// File name the bearer token is stored under
    pub token_storage_key: String,
    /// Directory for persisted client state
    pub data_dir: PathBuf,
    /// Quiet period before a cart quantity change is sent
    pub quantity_debounce: Duration,
    /// Optional per-request timeout
    pub request_timeout: Option<Duration>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url.as_str())
            .field("app_url", &self.app_url)
            .field("token_storage_key", &self.token_storage_key)
            .field("data_dir", &self.data_dir)
            .field("quantity_debounce", &self.quantity_debounce)
            .field("request_timeout", &self.request_timeout)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl ClientConfig {
    /// Configuration pointing at `api_base_url` with every optional value at
    /// its default.
    #[must_use]
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            app_url: DEFAULT_APP_URL.to_string(),
            token_storage_key: DEFAULT_TOKEN_STORAGE_KEY.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            quantity_debounce: Duration::from_millis(DEFAULT_QUANTITY_DEBOUNCE_MS),
            request_timeout: None,
            sentry_dsn: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ClientConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = parse_url(
            "BUBBLEMART_API_BASE_URL",
            &get_required(&lookup, "BUBBLEMART_API_BASE_URL")?,
        )?;
        let app_url = parse_url(
            "BUBBLEMART_APP_URL",
            &get_or_default(&lookup, "BUBBLEMART_APP_URL", DEFAULT_APP_URL),
        )?
        .to_string();
        let token_storage_key = get_or_default(
            &lookup,
            "BUBBLEMART_TOKEN_STORAGE_KEY",
            DEFAULT_TOKEN_STORAGE_KEY,
        );
        if token_storage_key.is_empty() || token_storage_key.contains(['/', '\\']) {
            return Err(ConfigError::InvalidEnvVar(
                "BUBBLEMART_TOKEN_STORAGE_KEY".to_string(),
                "must be a plain file name".to_string(),
            ));
        }
        let data_dir = PathBuf::from(get_or_default(
            &lookup,
            "BUBBLEMART_DATA_DIR",
            DEFAULT_DATA_DIR,
        ));
        let quantity_debounce = Duration::from_millis(parse_u64(
            "BUBBLEMART_QUANTITY_DEBOUNCE_MS",
            &get_or_default(
                &lookup,
                "BUBBLEMART_QUANTITY_DEBOUNCE_MS",
                &DEFAULT_QUANTITY_DEBOUNCE_MS.to_string(),
            ),
        )?);
        let request_timeout = lookup("BUBBLEMART_REQUEST_TIMEOUT_SECS")
            .map(|v| parse_u64("BUBBLEMART_REQUEST_TIMEOUT_SECS", &v))
            .transpose()?
            .map(Duration::from_secs);
        let sentry_dsn = lookup("SENTRY_DSN").filter(|v| !v.is_empty());

        Ok(Self {
            api_base_url,
            app_url,
            token_storage_key,
            data_dir,
            quantity_debounce,
            request_timeout,
            sentry_dsn,
        })
    }

    /// Where the payment provider sends the user back to after paying.
    #[must_use]
    pub fn payment_callback_url(&self, order_id: &OrderId) -> String {
        format!(
            "{}/orders/{order_id}/success",
            self.app_url.trim_end_matches('/')
        )
    }

    /// Path of the persisted bearer token.
    #[must_use]
    pub fn token_path(&self) -> PathBuf {
        self.data_dir.join(&self.token_storage_key)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required variable.
fn get_required(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<String, ConfigError> {
    lookup(key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a variable with a default value.
fn get_or_default(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme `{}`", url.scheme()),
        ));
    }
    Ok(url)
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
