//! OpenAI-compatible backends: OpenAI, OpenRouter, ModelBox, xAI and Groq.
//!
//! They share the chat-completions wire format and differ in headers, model discovery,
//! web-search negotiation, reasoning allow-lists and token triage.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::sync::Arc;

use super::{
    LlmProvider, ProviderBackend, ProviderSettings, gemini_context_triage, hard_limit_triage,
};
use crate::error::ProviderError;
use crate::executors::header_map;
use crate::executors::models::{get_json, ids_from_data};
use crate::executors::prompt::HttpPromptExecutor;
use crate::resolver::ModelSet;
use crate::resolver::similarity::strip_namespace;
use crate::transformers::openai::{
    OpenAiRequestTransformer, OpenAiResponseTransformer, WebSearchStyle, is_reasoning_model,
};
use crate::types::{PromptRequest, PromptResponse, ProviderKind, TokenTriage, WebSearchSupport};

/// xAI publishes no discovery endpoint we rely on; these are the models it serves.
pub const XAI_MODELS: &[&str] = &[
    "grok-4",
    "grok-4-latest",
    "grok-3",
    "grok-3-latest",
    "grok-3-fast",
    "grok-3-mini",
    "grok-3-mini-fast",
    "grok-3-mini-latest",
    "grok-2-1212",
    "grok-2-vision-1212",
];

const OPENAI_SEARCH_MODEL: &str = "gpt-4o-search-preview";
const ROUTER_SEARCH_MODEL: &str = "perplexity/sonar-pro";
const GROQ_SEARCH_MODEL: &str = "compound-beta";
const XAI_SEARCH_MODEL: &str = "grok-3-latest";
const ROUTER_LARGE_CONTEXT_MODEL: &str = "google/gemini-2.5-pro";
const OPENAI_TOKEN_LIMIT: u64 = 1_000_000;

/// Chat-completions backend for one OpenAI-compatible provider
pub struct OpenAiCompatibleBackend {
    kind: ProviderKind,
    settings: ProviderSettings,
    executor: HttpPromptExecutor,
}

impl OpenAiCompatibleBackend {
    pub fn new(kind: ProviderKind, settings: ProviderSettings) -> Result<Self, ProviderError> {
        if !matches!(
            kind,
            ProviderKind::OpenAi
                | ProviderKind::OpenRouter
                | ProviderKind::ModelBox
                | ProviderKind::Xai
                | ProviderKind::Groq
        ) {
            return Err(ProviderError::InvalidParameter(format!(
                "{kind} is not an OpenAI-compatible provider"
            )));
        }

        let web_search_style = match kind {
            ProviderKind::OpenAi => WebSearchStyle::WebSearchOptions,
            ProviderKind::Xai => WebSearchStyle::SearchParameters,
            _ => WebSearchStyle::Native,
        };
        let request = OpenAiRequestTransformer::new(kind.as_str(), web_search_style)
            .with_reasoning_quirks(kind == ProviderKind::OpenAi);

        let base = settings.base_url.clone();
        let headers_settings = settings.clone();
        let executor = HttpPromptExecutor::new(
            kind.as_str(),
            settings.http.clone(),
            Arc::new(request),
            Arc::new(OpenAiResponseTransformer::new(kind.as_str())),
            Box::new(move |_model: &str| format!("{base}/chat/completions")),
            Box::new(move || auth_headers(kind, &headers_settings)),
        )
        .with_debug_log_max_length(settings.debug_log_max_length);

        Ok(Self {
            kind,
            settings,
            executor,
        })
    }
}

fn auth_headers(
    kind: ProviderKind,
    settings: &ProviderSettings,
) -> Result<reqwest::header::HeaderMap, ProviderError> {
    let bearer = format!("Bearer {}", settings.api_key.expose_secret());
    let mut pairs = vec![("authorization", bearer.as_str())];
    if kind == ProviderKind::OpenRouter {
        pairs.push(("http-referer", "https://vibe-tools.com"));
        pairs.push(("x-title", "vibe-tools"));
    }
    header_map(pairs)
}

#[async_trait]
impl ProviderBackend for OpenAiCompatibleBackend {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn discover_models(&self) -> Result<Option<ModelSet>, ProviderError> {
        if self.kind == ProviderKind::Xai {
            return Ok(Some(XAI_MODELS.iter().map(|m| m.to_string()).collect()));
        }
        let url = format!("{}/models", self.settings.base_url);
        let listing = get_json(
            &self.settings.http,
            &url,
            auth_headers(self.kind, &self.settings)?,
            self.name(),
        )
        .await?;
        let models = ids_from_data(&listing);
        tracing::debug!("{}: discovered {} models", self.name(), models.len());
        Ok(Some(models))
    }

    fn supports_web_search(&self, model: &str) -> WebSearchSupport {
        let bare = strip_namespace(model);
        match self.kind {
            ProviderKind::OpenAi if bare.ends_with("-search-preview") => {
                WebSearchSupport::supported()
            }
            ProviderKind::OpenAi => WebSearchSupport::substitute(
                OPENAI_SEARCH_MODEL,
                format!("OpenAI model {model} does not support web search."),
            ),
            ProviderKind::OpenRouter | ProviderKind::ModelBox
                if model.starts_with("perplexity/") =>
            {
                WebSearchSupport::supported()
            }
            ProviderKind::OpenRouter | ProviderKind::ModelBox => WebSearchSupport::substitute(
                ROUTER_SEARCH_MODEL,
                format!("Only perplexity/* models search the web through {}.", self.kind),
            ),
            ProviderKind::Xai if bare.starts_with("grok-3") || bare.starts_with("grok-4") => {
                WebSearchSupport::supported()
            }
            ProviderKind::Xai => WebSearchSupport::substitute(
                XAI_SEARCH_MODEL,
                format!("xAI Live Search is not available for {model}."),
            ),
            ProviderKind::Groq if bare.starts_with("compound") => WebSearchSupport::supported(),
            ProviderKind::Groq => WebSearchSupport::substitute(
                GROQ_SEARCH_MODEL,
                format!("Groq model {model} does not support web search."),
            ),
            _ => WebSearchSupport::unsupported(format!("{} does not support web search", self.kind)),
        }
    }

    fn handle_large_token_count(&self, token_count: u64) -> TokenTriage {
        match self.kind {
            ProviderKind::OpenAi => hard_limit_triage("openai", token_count, OPENAI_TOKEN_LIMIT),
            ProviderKind::OpenRouter | ProviderKind::ModelBox => {
                gemini_context_triage(token_count, ROUTER_LARGE_CONTEXT_MODEL)
            }
            _ => TokenTriage::default(),
        }
    }

    fn supports_reasoning_effort(&self, model: &str) -> bool {
        match self.kind {
            ProviderKind::OpenAi | ProviderKind::OpenRouter | ProviderKind::ModelBox => {
                is_reasoning_model(model)
            }
            ProviderKind::Xai => strip_namespace(model).starts_with("grok-3-mini"),
            _ => false,
        }
    }

    async fn send(
        &self,
        req: &PromptRequest,
        available: Option<&ModelSet>,
    ) -> Result<PromptResponse, ProviderError> {
        self.executor.execute(req, available).await
    }
}

/// Provider for any OpenAI-compatible backend
pub type OpenAiCompatibleProvider = LlmProvider<OpenAiCompatibleBackend>;

impl OpenAiCompatibleProvider {
    pub fn create(kind: ProviderKind, settings: ProviderSettings) -> Result<Self, ProviderError> {
        let backend = OpenAiCompatibleBackend::new(kind, settings.clone())?;
        Ok(LlmProvider::new(backend, &settings))
    }
}
