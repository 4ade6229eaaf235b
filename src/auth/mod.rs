//! Google Cloud authentication for the Vertex AI backend.
//!
//! Two token sources are supported: a service-account key file (JWT bearer grant) and
//! Application Default Credentials. Both cache the access token in memory and refresh it
//! shortly before expiry.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::ProviderError;

pub mod adc;
pub mod project;
pub mod service_account;

pub use adc::AdcTokenProvider;
pub use project::ProjectDiscovery;
pub use service_account::{ServiceAccountCredentials, ServiceAccountTokenProvider};

/// Google OAuth token endpoint
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
/// Scope requested for Vertex AI access
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
/// GCE/GKE metadata server root
pub const METADATA_ROOT: &str = "http://169.254.169.254/computeMetadata/v1";

/// Refresh this many seconds before the token actually expires
const EXPIRY_SAFETY_WINDOW: i64 = 300;

/// Supplies `Authorization: Bearer <token>` values.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<String, ProviderError>;
}

/// Fixed token, for tests and externally managed credentials.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Result<String, ProviderError> {
        Ok(self.token.clone())
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    exp_unix: i64,
}

/// In-memory token cache.
///
/// The lock is held across a refresh so concurrent callers wait for the in-flight fetch
/// instead of issuing their own.
#[derive(Debug, Default)]
pub(crate) struct TokenCache {
    inner: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub(crate) async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<String, ProviderError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<(String, i64), ProviderError>>,
    {
        let mut guard = self.inner.lock().await;
        let now = chrono::Utc::now().timestamp();
        if let Some(cached) = guard.as_ref()
            && cached.exp_unix - EXPIRY_SAFETY_WINDOW > now
        {
            return Ok(cached.token.clone());
        }
        let (token, expires_in) = refresh().await?;
        *guard = Some(CachedToken {
            token: token.clone(),
            exp_unix: now + expires_in,
        });
        Ok(token)
    }
}

#[derive(serde::Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
}

const fn default_expires_in() -> i64 {
    3600
}

/// Read the JSON body of a token endpoint response, mapping failures to provider errors.
pub(crate) async fn read_token_response(
    resp: reqwest::Response,
    what: &str,
) -> Result<TokenResponse, ProviderError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await?;
        let details = serde_json::from_str(&body)
            .unwrap_or_else(|_| serde_json::Value::String(body.trim().to_string()));
        return Err(ProviderError::ApiError {
            code: status.as_u16(),
            message: format!("{what} returned an error"),
            details: Some(details),
        });
    }
    resp.json::<TokenResponse>()
        .await
        .map_err(|e| ProviderError::ParseError(format!("Failed to parse {what} response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn cache_reuses_unexpired_token() {
        let cache = TokenCache::default();
        let calls = AtomicU32::new(0);
        for _ in 0..3 {
            let tok = cache
                .get_or_refresh(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(("tok".to_string(), 3600))
                })
                .await
                .unwrap();
            assert_eq!(tok, "tok");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cache_refreshes_tokens_inside_safety_window() {
        let cache = TokenCache::default();
        let calls = AtomicU32::new(0);
        for _ in 0..2 {
            cache
                .get_or_refresh(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(("short".to_string(), 60))
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
