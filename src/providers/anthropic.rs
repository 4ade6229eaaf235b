//! Anthropic Messages API.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::sync::Arc;

use super::{LlmProvider, ProviderBackend, ProviderSettings, hard_limit_triage};
use crate::error::ProviderError;
use crate::executors::header_map;
use crate::executors::prompt::HttpPromptExecutor;
use crate::resolver::ModelSet;
use crate::resolver::similarity::strip_namespace;
use crate::transformers::anthropic::{AnthropicRequestTransformer, AnthropicResponseTransformer};
use crate::types::{PromptRequest, PromptResponse, ProviderKind, TokenTriage, WebSearchSupport};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
const TOKEN_LIMIT: u64 = 200_000;

/// Families with the server-side web search tool
const WEB_SEARCH_FAMILIES: &[&str] = &[
    "claude-3-5-sonnet",
    "claude-3-5-haiku",
    "claude-3-7-sonnet",
    "claude-sonnet-4",
    "claude-opus-4",
];

/// Families with extended thinking
const THINKING_FAMILIES: &[&str] = &["claude-3-7", "claude-sonnet-4", "claude-opus-4"];

pub struct AnthropicBackend {
    executor: HttpPromptExecutor,
}

impl AnthropicBackend {
    pub fn new(settings: &ProviderSettings) -> Self {
        let base = settings.base_url.clone();
        let key = settings.api_key.clone();
        let executor = HttpPromptExecutor::new(
            "anthropic",
            settings.http.clone(),
            Arc::new(AnthropicRequestTransformer),
            Arc::new(AnthropicResponseTransformer),
            Box::new(move |_model: &str| format!("{base}/messages")),
            Box::new(move || {
                header_map([
                    ("x-api-key", key.expose_secret()),
                    ("anthropic-version", ANTHROPIC_VERSION),
                ])
            }),
        )
        .with_debug_log_max_length(settings.debug_log_max_length);
        Self { executor }
    }
}

#[async_trait]
impl ProviderBackend for AnthropicBackend {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    /// No discovery: model names go to the API unchanged.
    async fn discover_models(&self) -> Result<Option<ModelSet>, ProviderError> {
        Ok(None)
    }

    fn supports_web_search(&self, model: &str) -> WebSearchSupport {
        let bare = strip_namespace(model);
        if WEB_SEARCH_FAMILIES.iter().any(|f| bare.starts_with(f)) {
            WebSearchSupport::supported()
        } else {
            WebSearchSupport::unsupported(format!(
                "Anthropic web search requires Claude 3.5 or newer; {model} is not supported"
            ))
        }
    }

    fn handle_large_token_count(&self, token_count: u64) -> TokenTriage {
        hard_limit_triage("anthropic", token_count, TOKEN_LIMIT)
    }

    fn supports_reasoning_effort(&self, model: &str) -> bool {
        let bare = strip_namespace(model);
        THINKING_FAMILIES.iter().any(|f| bare.starts_with(f))
    }

    async fn send(
        &self,
        req: &PromptRequest,
        available: Option<&ModelSet>,
    ) -> Result<PromptResponse, ProviderError> {
        self.executor.execute(req, available).await
    }
}

pub type AnthropicProvider = LlmProvider<AnthropicBackend>;

impl AnthropicProvider {
    pub fn create(settings: ProviderSettings) -> Self {
        LlmProvider::new(AnthropicBackend::new(&settings), &settings)
    }
}
