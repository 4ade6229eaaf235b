//! Application Default Credentials.
//!
//! Resolution order:
//! 1. `GOOGLE_OAUTH_ACCESS_TOKEN`
//! 2. the key file named by `GOOGLE_APPLICATION_CREDENTIALS`
//! 3. the gcloud well-known ADC file (`gcloud auth application-default login`)
//! 4. the GCE/GKE metadata server
//!
//! Key files may hold either a service account or an authorized user (refresh token).

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::service_account::{ServiceAccountCredentials, ServiceAccountTokenProvider};
use super::{GOOGLE_TOKEN_URI, METADATA_ROOT, TokenCache, TokenProvider, read_token_response};
use crate::env::EnvSnapshot;
use crate::error::ProviderError;

const METADATA_HEADER: &str = "Metadata-Flavor";
const METADATA_HEADER_VALUE: &str = "Google";

/// Path of the gcloud well-known ADC file
pub fn well_known_adc_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| {
        h.join(".config")
            .join("gcloud")
            .join("application_default_credentials.json")
    })
}

/// Either kind of credential an ADC file may contain
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdcFile {
    ServiceAccount(ServiceAccountCredentials),
    AuthorizedUser(AuthorizedUser),
}

/// Refresh-token credentials written by `gcloud auth application-default login`
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default)]
    pub quota_project_id: Option<String>,
}

impl AdcFile {
    pub fn load(path: &Path) -> Result<Self, ProviderError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::ConfigurationError(format!(
                "Failed to read credentials file {}: {e}",
                path.display()
            ))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ProviderError::ConfigurationError(format!(
                "Unsupported credentials file {}: {e}",
                path.display()
            ))
        })
    }

    /// Project id recorded in the file, if any
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Self::ServiceAccount(sa) => sa.project_id.as_deref(),
            Self::AuthorizedUser(user) => user.quota_project_id.as_deref(),
        }
    }
}

/// ADC token provider with in-memory caching
pub struct AdcTokenProvider {
    http: reqwest::Client,
    env_token: Option<String>,
    credentials_path: Option<PathBuf>,
    token_uri: String,
    metadata_root: String,
    cache: TokenCache,
}

impl AdcTokenProvider {
    pub fn new(http: reqwest::Client, env: &EnvSnapshot) -> Self {
        let credentials_path = env
            .var("GOOGLE_APPLICATION_CREDENTIALS")
            .map(PathBuf::from)
            .or_else(|| well_known_adc_path().filter(|p| p.is_file()));
        Self {
            http,
            env_token: env.var("GOOGLE_OAUTH_ACCESS_TOKEN").map(str::to_string),
            credentials_path,
            token_uri: GOOGLE_TOKEN_URI.to_string(),
            metadata_root: METADATA_ROOT.to_string(),
            cache: TokenCache::default(),
        }
    }

    pub fn with_credentials_path(mut self, path: Option<PathBuf>) -> Self {
        self.credentials_path = path;
        self
    }

    pub fn with_token_uri(mut self, uri: impl Into<String>) -> Self {
        self.token_uri = uri.into();
        self
    }

    pub fn with_metadata_root(mut self, root: impl Into<String>) -> Self {
        self.metadata_root = root.into();
        self
    }

    async fn resolve(&self) -> Result<(String, i64), ProviderError> {
        if let Some(token) = &self.env_token {
            // No expiry is known for externally supplied tokens
            return Ok((token.clone(), 600));
        }

        if let Some(path) = &self.credentials_path {
            tracing::debug!("Using ADC credentials from {}", path.display());
            return match AdcFile::load(path)? {
                AdcFile::ServiceAccount(creds) => {
                    let sa = ServiceAccountTokenProvider::new(creds, self.http.clone());
                    Ok((sa.token().await?, 3600))
                }
                AdcFile::AuthorizedUser(user) => self.refresh_authorized_user(&user).await,
            };
        }

        self.metadata_token().await?.ok_or_else(|| {
            ProviderError::ConfigurationError(
                "Application Default Credentials not found. Run `gcloud auth application-default login` \
                 or set GOOGLE_APPLICATION_CREDENTIALS"
                    .to_string(),
            )
        })
    }

    async fn refresh_authorized_user(
        &self,
        user: &AuthorizedUser,
    ) -> Result<(String, i64), ProviderError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", user.client_id.as_str()),
            ("client_secret", user.client_secret.as_str()),
            ("refresh_token", user.refresh_token.as_str()),
        ];
        let resp = self
            .http
            .post(&self.token_uri)
            .form(&form)
            .send()
            .await
            .map_err(|e| ProviderError::HttpError(format!("Token refresh request failed: {e}")))?;
        let tr = read_token_response(resp, "token refresh").await?;
        Ok((tr.access_token, tr.expires_in))
    }

    async fn metadata_token(&self) -> Result<Option<(String, i64)>, ProviderError> {
        let url = format!(
            "{}/instance/service-accounts/default/token",
            self.metadata_root
        );
        let resp = match self
            .http
            .get(url)
            .header(METADATA_HEADER, METADATA_HEADER_VALUE)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(_) => return Ok(None),
            Err(e) => {
                tracing::debug!("Metadata server unreachable: {e}");
                return Ok(None);
            }
        };
        let tr = read_token_response(resp, "metadata server").await?;
        Ok(Some((tr.access_token, tr.expires_in)))
    }
}

#[async_trait]
impl TokenProvider for AdcTokenProvider {
    async fn token(&self) -> Result<String, ProviderError> {
        self.cache.get_or_refresh(|| self.resolve()).await
    }
}
