//! Google Generative Language API (`GEMINI_API_KEY` holding a plain API key).

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::Value;
use std::sync::Arc;

use super::{LlmProvider, ProviderBackend, ProviderSettings, gemini_context_triage};
use crate::error::ProviderError;
use crate::executors::header_map;
use crate::executors::models::get_json;
use crate::executors::prompt::HttpPromptExecutor;
use crate::resolver::ModelSet;
use crate::resolver::similarity::strip_namespace;
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::transformers::gemini::{GeminiRequestTransformer, GeminiResponseTransformer};
use crate::types::{PromptRequest, PromptResponse, ProviderKind, TokenTriage, WebSearchSupport};

/// Model used when the requested one cannot search or the prompt is very large
pub const LARGE_CONTEXT_MODEL: &str = "gemini-2.5-pro";

/// Google Search grounding is available on Gemini 1.5 and later
pub(crate) fn gemini_supports_web_search(model: &str) -> WebSearchSupport {
    let bare = strip_namespace(model);
    if bare.starts_with("gemini-") && !bare.starts_with("gemini-1.0") && !bare.contains("embedding")
    {
        WebSearchSupport::supported()
    } else {
        WebSearchSupport::substitute(
            LARGE_CONTEXT_MODEL,
            format!("Model {model} does not support Google Search grounding."),
        )
    }
}

/// Gemini 2.5 models accept a thinking budget
pub(crate) fn gemini_supports_thinking(model: &str) -> bool {
    strip_namespace(model).starts_with("gemini-2.5")
}

/// Collect model names from a `models` / `publisherModels` listing page, stripping the
/// resource prefix and skipping models that cannot generate content.
pub(crate) fn model_names(page: &Value, field: &str) -> Vec<String> {
    page.get(field)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|m| {
            m.get("supportedGenerationMethods")
                .and_then(Value::as_array)
                .is_none_or(|methods| methods.iter().any(|x| x == "generateContent"))
        })
        .filter_map(|m| m.get("name").and_then(Value::as_str))
        .map(|name| name.rsplit('/').next().unwrap_or(name).to_string())
        .collect()
}

pub struct GeminiBackend {
    settings: ProviderSettings,
    executor: HttpPromptExecutor,
}

impl GeminiBackend {
    pub fn new(settings: ProviderSettings) -> Self {
        Self::with_retry(settings, RetryExecutor::new(RetryPolicy::default()))
    }

    pub fn with_retry(settings: ProviderSettings, retry: RetryExecutor) -> Self {
        let base = settings.base_url.clone();
        let key = settings.api_key.clone();
        let executor = HttpPromptExecutor::new(
            "gemini",
            settings.http.clone(),
            Arc::new(GeminiRequestTransformer::new("gemini")),
            Arc::new(GeminiResponseTransformer::new("gemini")),
            Box::new(move |model: &str| format!("{base}/models/{model}:generateContent")),
            Box::new(move || header_map([("x-goog-api-key", key.expose_secret())])),
        )
        .with_retry(retry)
        .with_debug_log_max_length(settings.debug_log_max_length);
        Self { settings, executor }
    }
}

#[async_trait]
impl ProviderBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn discover_models(&self) -> Result<Option<ModelSet>, ProviderError> {
        let mut models = ModelSet::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = format!("{}/models?pageSize=1000", self.settings.base_url);
            if let Some(token) = &page_token {
                url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
            }
            let headers = header_map([("x-goog-api-key", self.settings.api_key.expose_secret())])?;
            let page = get_json(&self.settings.http, &url, headers, "gemini").await?;
            models.extend(model_names(&page, "models"));

            match page.get("nextPageToken").and_then(Value::as_str) {
                Some(next) if !next.is_empty() => page_token = Some(next.to_string()),
                _ => break,
            }
        }
        tracing::debug!("gemini: discovered {} models", models.len());
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
        self.executor.execute(req, available).await
    }
}

pub type GeminiProvider = LlmProvider<GeminiBackend>;

impl GeminiProvider {
    pub fn create(settings: ProviderSettings) -> Self {
        LlmProvider::new(GeminiBackend::new(settings.clone()), &settings)
    }
}
