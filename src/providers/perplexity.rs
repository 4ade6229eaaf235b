//! Perplexity chat completions.
//!
//! Every Perplexity model searches the web natively. Calls are retried on rate limits.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::sync::Arc;

use super::{LlmProvider, ProviderBackend, ProviderSettings};
use crate::error::ProviderError;
use crate::executors::header_map;
use crate::executors::models::{get_json, ids_from_data};
use crate::executors::prompt::HttpPromptExecutor;
use crate::resolver::ModelSet;
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::transformers::openai::{
    OpenAiRequestTransformer, OpenAiResponseTransformer, WebSearchStyle,
};
use crate::types::{PromptRequest, PromptResponse, ProviderKind, WebSearchSupport};

/// Used when the listing endpoint is unavailable
pub const KNOWN_MODELS: &[&str] = &[
    "sonar",
    "sonar-pro",
    "sonar-reasoning",
    "sonar-reasoning-pro",
    "sonar-deep-research",
    "r1-1776",
];

pub struct PerplexityBackend {
    settings: ProviderSettings,
    executor: HttpPromptExecutor,
}

impl PerplexityBackend {
    pub fn new(settings: ProviderSettings) -> Self {
        Self::with_retry(settings, RetryExecutor::new(RetryPolicy::default()))
    }

    pub fn with_retry(settings: ProviderSettings, retry: RetryExecutor) -> Self {
        let base = settings.base_url.clone();
        let key = settings.api_key.clone();
        let executor = HttpPromptExecutor::new(
            "perplexity",
            settings.http.clone(),
            Arc::new(OpenAiRequestTransformer::new("perplexity", WebSearchStyle::Native)),
            Arc::new(OpenAiResponseTransformer::new("perplexity")),
            Box::new(move |_model: &str| format!("{base}/chat/completions")),
            Box::new(move || {
                let bearer = format!("Bearer {}", key.expose_secret());
                header_map([("authorization", bearer.as_str())])
            }),
        )
        .with_retry(retry)
        .with_debug_log_max_length(settings.debug_log_max_length);
        Self { settings, executor }
    }
}

#[async_trait]
impl ProviderBackend for PerplexityBackend {
    fn name(&self) -> &str {
        "perplexity"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Perplexity
    }

    async fn discover_models(&self) -> Result<Option<ModelSet>, ProviderError> {
        let bearer = format!("Bearer {}", self.settings.api_key.expose_secret());
        let url = format!("{}/models", self.settings.base_url);
        let listed = match header_map([("authorization", bearer.as_str())]) {
            Ok(headers) => get_json(&self.settings.http, &url, headers, "perplexity")
                .await
                .map(|v| ids_from_data(&v)),
            Err(e) => Err(e),
        };
        match listed {
            Ok(models) if !models.is_empty() => Ok(Some(models)),
            Ok(_) => Ok(Some(known_models())),
            Err(e) => {
                tracing::debug!("perplexity model listing unavailable ({e}); using known models");
                Ok(Some(known_models()))
            }
        }
    }

    fn supports_web_search(&self, _model: &str) -> WebSearchSupport {
        WebSearchSupport::supported()
    }

    fn supports_reasoning_effort(&self, model: &str) -> bool {
        model.starts_with("sonar-deep-research") || model.starts_with("sonar-reasoning")
    }

    async fn send(
        &self,
        req: &PromptRequest,
        available: Option<&ModelSet>,
    ) -> Result<PromptResponse, ProviderError> {
        self.executor.execute(req, available).await
    }
}

fn known_models() -> ModelSet {
    KNOWN_MODELS.iter().map(|m| m.to_string()).collect()
}

pub type PerplexityProvider = LlmProvider<PerplexityBackend>;

impl PerplexityProvider {
    pub fn create(settings: ProviderSettings) -> Self {
        LlmProvider::new(PerplexityBackend::new(settings.clone()), &settings)
    }
}
