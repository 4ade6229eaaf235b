//! Service-account bearer tokens (OAuth 2.0 JWT bearer grant).

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{CLOUD_PLATFORM_SCOPE, GOOGLE_TOKEN_URI, TokenCache, TokenProvider, read_token_response};
use crate::error::ProviderError;

/// The subset of a service-account key file needed for the JWT flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccountCredentials {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl ServiceAccountCredentials {
    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        serde_json::from_str::<Self>(json).map_err(|e| {
            ProviderError::ConfigurationError(format!("Invalid service account JSON: {e}"))
        })
    }

    /// Load a key file from disk
    pub fn from_file(path: &Path) -> Result<Self, ProviderError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::ConfigurationError(format!(
                "Failed to read service account key {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&content)
    }

    fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(GOOGLE_TOKEN_URI)
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    exp: i64,
    iat: i64,
}

/// Token provider backed by a service-account key
pub struct ServiceAccountTokenProvider {
    creds: ServiceAccountCredentials,
    http: reqwest::Client,
    cache: TokenCache,
    assertion_override: Option<String>,
}

impl ServiceAccountTokenProvider {
    pub fn new(creds: ServiceAccountCredentials, http: reqwest::Client) -> Self {
        Self {
            creds,
            http,
            cache: TokenCache::default(),
            assertion_override: None,
        }
    }

    /// Skip signing and send a prebuilt assertion (tests only need the exchange)
    pub fn with_assertion_override(mut self, assertion: impl Into<String>) -> Self {
        self.assertion_override = Some(assertion.into());
        self
    }

    pub fn credentials(&self) -> &ServiceAccountCredentials {
        &self.creds
    }

    fn signed_assertion(&self) -> Result<String, ProviderError> {
        if let Some(a) = &self.assertion_override {
            return Ok(a.clone());
        }
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: &self.creds.client_email,
            scope: CLOUD_PLATFORM_SCOPE,
            aud: self.creds.token_uri(),
            iat: now,
            exp: now + 3600,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.typ = Some("JWT".to_string());
        let key = EncodingKey::from_rsa_pem(self.creds.private_key.as_bytes()).map_err(|e| {
            ProviderError::ConfigurationError(format!("Invalid RSA private key (PEM): {e}"))
        })?;
        encode(&header, &claims, &key)
            .map_err(|e| ProviderError::ConfigurationError(format!("Failed to sign JWT: {e}")))
    }

    async fn fetch_new_token(&self) -> Result<(String, i64), ProviderError> {
        let assertion = self.signed_assertion()?;
        let form = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ];
        let resp = self
            .http
            .post(self.creds.token_uri())
            .form(&form)
            .send()
            .await
            .map_err(|e| ProviderError::HttpError(format!("Token endpoint request failed: {e}")))?;
        let tr = read_token_response(resp, "token endpoint").await?;
        Ok((tr.access_token, tr.expires_in))
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokenProvider {
    async fn token(&self) -> Result<String, ProviderError> {
        self.cache.get_or_refresh(|| self.fetch_new_token()).await
    }
}
