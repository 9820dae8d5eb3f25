//! REST API gateway.
//!
//! A single configured `reqwest` client that every service goes through.
//!
//! - Injects `Authorization: Bearer <token>` when a token is set
//! - Unwraps the `{ data, pagination }` envelope
//! - Normalizes failures into [`ApiError`] (401, field errors, 429, decode)
//! - Can abort every outstanding request at once ([`ApiClient::cancel_all`])

mod error;
mod types;

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientConfig;

pub use error::ApiError;
pub(crate) use types::ErrorBody;
pub use types::{ApiEnvelope, Page, PageQuery};

/// Characters of a failed response body kept in logs.
const LOGGED_BODY_CHARS: usize = 500;

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the Bubblemart REST API.
///
/// Cheap to clone; clones share the auth token and the cancellation scope.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: RwLock<Option<SecretString>>,
    cancel: Mutex<CancellationToken>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (TLS backend).
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client: builder.build()?,
                base_url: config.api_base_url.clone(),
                token: RwLock::new(None),
                cancel: Mutex::new(CancellationToken::new()),
            }),
        })
    }

    /// Set or clear the bearer token used by every subsequent request.
    pub fn set_auth_token(&self, token: Option<SecretString>) {
        *self
            .inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = token;
    }

    /// Clear the bearer token, returning the one that was set.
    pub fn take_auth_token(&self) -> Option<SecretString> {
        self.inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Whether a bearer token is currently set.
    #[must_use]
    pub fn has_auth_token(&self) -> bool {
        self.inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Abort every request issued so far.
    ///
    /// In-flight requests fail with [`ApiError::Cancelled`]; requests issued
    /// after this call run normally.
    pub fn cancel_all(&self) {
        let previous = {
            let mut guard = self
                .inner
                .cancel
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, CancellationToken::new())
        };
        previous.cancel();
        debug!("Cancelled all outstanding API requests");
    }

    // =========================================================================
    // Verbs
    // =========================================================================

    /// `GET path`.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiEnvelope<T>, ApiError> {
        self.send(self.builder(Method::GET, path)?).await
    }

    /// `GET path?query`.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn get_query<T, Q>(&self, path: &str, query: &Q) -> Result<ApiEnvelope<T>, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send(self.builder(Method::GET, path)?.query(query))
            .await
    }

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<ApiEnvelope<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post_raw(path, body).await
    }

    /// `POST path` with a JSON body, decoding the response without assuming
    /// the `data` envelope.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn post_raw<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.builder(Method::POST, path)?.json(body))
            .await
    }

    /// `PUT path` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<ApiEnvelope<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.builder(Method::PUT, path)?.json(body)).await
    }

    /// `PATCH path` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<ApiEnvelope<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.builder(Method::PATCH, path)?.json(body))
            .await
    }

    /// `DELETE path`. The response body is ignored.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send::<IgnoredAny>(self.builder(Method::DELETE, path)?)
            .await
            .map(|_| ())
    }

    /// `DELETE path` with a JSON body. The response body is ignored.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn delete_with_body<B>(&self, path: &str, body: &B) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        self.send::<IgnoredAny>(self.builder(Method::DELETE, path)?.json(body))
            .await
            .map(|_| ())
    }

    /// `POST path` as `multipart/form-data`.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<ApiEnvelope<T>, ApiError> {
        self.send(self.builder(Method::POST, path)?.multipart(form))
            .await
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    /// Join `path` onto the base URL, keeping any base path prefix.
    fn url(&self, path: &str) -> Result<Url, ApiError> {
        let base = self.inner.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!(
            "{base}/{}",
            path.trim_start_matches('/')
        ))?)
    }

    /// Start a request carrying the auth header as it is right now.
    fn builder(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.url(path)?;
        let builder = self.inner.client.request(method, url);
        let token = self
            .inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(match token.as_ref() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        })
    }

    /// Send a request under the cancellation scope current at issue time.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let cancel = self
            .inner
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("API request cancelled");
                Err(ApiError::Cancelled)
            }
            result = Self::execute(builder) => result,
        }
    }

    async fn execute<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ApiError> {
        let response = builder.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            warn!(retry_after, "API rate limited");
            return Err(ApiError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            let body: ErrorBody = serde_json::from_str(&response_text).unwrap_or_default();

            if status == StatusCode::UNAUTHORIZED {
                warn!("API rejected bearer token");
                return Err(ApiError::Unauthorized {
                    message: body.message(),
                });
            }

            tracing::error!(
                status = %status,
                body = %truncate(&response_text),
                "API returned non-success status"
            );
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: body.message(),
                field_errors: body.field_errors(),
            });
        }

        let text = if response_text.trim().is_empty() {
            "null"
        } else {
            response_text.as_str()
        };
        serde_json::from_str(text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&response_text),
                "Failed to parse API response"
            );
            ApiError::Decode(e)
        })
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(LOGGED_BODY_CHARS).collect()
}
