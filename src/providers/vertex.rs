//! Google Vertex AI, selected when `GEMINI_API_KEY` names a service-account key file
//! (`*.json`) or is the literal `adc`.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::gemini::{
    LARGE_CONTEXT_MODEL, gemini_supports_thinking, gemini_supports_web_search, model_names,
};
use super::{LlmProvider, ProviderBackend, ProviderSettings, gemini_context_triage};
use crate::auth::{ProjectDiscovery, TokenProvider};
use crate::error::ProviderError;
use crate::executors::header_map;
use crate::executors::models::get_json;
use crate::executors::prompt::HttpPromptExecutor;
use crate::resolver::ModelSet;
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::transformers::gemini::{GeminiRequestTransformer, GeminiResponseTransformer};
use crate::types::{PromptRequest, PromptResponse, ProviderKind, TokenTriage, WebSearchSupport};

pub const DEFAULT_LOCATION: &str = "us-central1";

/// How `GEMINI_API_KEY` selects the Google backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoogleAuthMode {
    /// Plain Generative Language API key
    ApiKey,
    /// Path to a service-account key file
    ServiceAccount(std::path::PathBuf),
    /// Application Default Credentials
    Adc,
}

impl GoogleAuthMode {
    pub fn detect(key: &str) -> Self {
        let key = key.trim();
        if key.eq_ignore_ascii_case("adc") {
            Self::Adc
        } else if key.to_ascii_lowercase().ends_with(".json") {
            Self::ServiceAccount(key.into())
        } else {
            Self::ApiKey
        }
    }
}

/// API host for a location; `global` uses the unprefixed host
pub fn vertex_host(location: &str) -> String {
    if location == "global" {
        "https://aiplatform.googleapis.com".to_string()
    } else {
        format!("https://{location}-aiplatform.googleapis.com")
    }
}

/// `{host}/v1/projects/{project}/locations/{location}/publishers/{publisher}`
pub fn vertex_base_url(host: &str, project: &str, location: &str, publisher: &str) -> String {
    format!("{host}/v1/projects/{project}/locations/{location}/publishers/{publisher}")
}

/// Where and as whom to call Vertex AI
#[derive(Debug, Clone)]
pub struct VertexConfig {
    pub location: String,
    /// Fixed project id; discovered through [`ProjectDiscovery`] when absent
    pub project: Option<String>,
    /// Replaces the regional API host
    pub host: Option<String>,
}

impl Default for VertexConfig {
    fn default() -> Self {
        Self {
            location: DEFAULT_LOCATION.to_string(),
            project: None,
            host: None,
        }
    }
}

pub struct VertexBackend {
    settings: ProviderSettings,
    config: VertexConfig,
    token_provider: Arc<dyn TokenProvider>,
    discovery: ProjectDiscovery,
    retry: RetryExecutor,
    project: OnceCell<String>,
    executor: OnceCell<HttpPromptExecutor>,
}

impl VertexBackend {
    pub fn new(
        settings: ProviderSettings,
        config: VertexConfig,
        token_provider: Arc<dyn TokenProvider>,
        discovery: ProjectDiscovery,
    ) -> Self {
        Self {
            settings,
            config,
            token_provider,
            discovery,
            retry: RetryExecutor::new(RetryPolicy::default()),
            project: OnceCell::new(),
            executor: OnceCell::new(),
        }
    }

    pub fn with_retry(mut self, retry: RetryExecutor) -> Self {
        self.retry = retry;
        self
    }

    fn host(&self) -> String {
        self.config
            .host
            .clone()
            .unwrap_or_else(|| vertex_host(&self.config.location))
    }

    async fn project(&self) -> Result<&str, ProviderError> {
        self.project
            .get_or_try_init(|| async {
                match &self.config.project {
                    Some(p) => Ok(p.clone()),
                    None => self.discovery.discover(&self.settings.http).await,
                }
            })
            .await
            .map(String::as_str)
    }

    async fn executor(&self) -> Result<&HttpPromptExecutor, ProviderError> {
        self.executor
            .get_or_try_init(|| async {
                let project = self.project().await?;
                let base = vertex_base_url(&self.host(), project, &self.config.location, "google");
                tracing::debug!("vertex: using {base}");
                Ok::<_, ProviderError>(
                    HttpPromptExecutor::new(
                        "vertex",
                        self.settings.http.clone(),
                        Arc::new(GeminiRequestTransformer::new("vertex")),
                        Arc::new(GeminiResponseTransformer::new("vertex")),
                        Box::new(move |model: &str| format!("{base}/models/{model}:generateContent")),
                        Box::new(|| Ok::<_, ProviderError>(HeaderMap::new())),
                    )
                    .with_token_provider(self.token_provider.clone())
                    .with_retry(self.retry.clone())
                    .with_debug_log_max_length(self.settings.debug_log_max_length),
                )
            })
            .await
    }
}

#[async_trait]
impl ProviderBackend for VertexBackend {
    fn name(&self) -> &str {
        "vertex"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn discover_models(&self) -> Result<Option<ModelSet>, ProviderError> {
        let mut models = ModelSet::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = format!("{}/v1beta1/publishers/google/models?pageSize=100", self.host());
            if let Some(token) = &page_token {
                url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
            }
            let bearer = format!("Bearer {}", self.token_provider.token().await?);
            let headers = header_map([("authorization", bearer.as_str())])?;
            let page = get_json(&self.settings.http, &url, headers, "vertex").await?;
            models.extend(model_names(&page, "publisherModels"));

            match page.get("nextPageToken").and_then(Value::as_str) {
                Some(next) if !next.is_empty() => page_token = Some(next.to_string()),
                _ => break,
            }
        }
        Ok(Some(models))
    }

    fn supports_web_search(&self, model: &str) -> WebSearchSupport {
        gemini_supports_web_search(model)
    }

    fn handle_large_token_count(&self, token_count: u64) -> TokenTriage {
        gemini_context_triage(token_count, LARGE_CONTEXT_MODEL)
    }

    fn supports_reasoning_effort(&self, model: &str) -> bool {
        gemini_supports_thinking(model)
    }

    async fn send(
        &self,
        req: &PromptRequest,
        available: Option<&ModelSet>,
    ) -> Result<PromptResponse, ProviderError> {
        self.executor().await?.execute(req, available).await
    }
}

pub type VertexProvider = LlmProvider<VertexBackend>;
