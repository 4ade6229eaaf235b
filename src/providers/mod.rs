//! Provider adapters.
//!
//! Every backend implements [`ProviderBackend`]: wire encoding, model discovery and
//! capability answers. [`LlmProvider`] wraps a backend with the shared prompt flow:
//!
//! 1. token-limit triage
//! 2. model resolution against the discovered model set
//! 3. web-search negotiation
//! 4. reasoning-effort gating
//! 5. system prompt assembly, send, usage accounting
//!
//! An adapter is committed to one backend for its lifetime; resolution never leaves that
//! backend's model set.

use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Mutex;
use tokio::sync::OnceCell;

use crate::config::Config;
use crate::env::EnvSnapshot;
use crate::error::{DEFAULT_DEBUG_LOG_MAX_LENGTH, ProviderError};
use crate::resolver::{ModelSet, resolve_model};
use crate::types::{
    ModelOptions, PromptRequest, PromptResponse, ProviderKind, TokenTriage, TokenUsage,
    WebSearchSupport,
};

pub mod anthropic;
pub mod factory;
pub mod gemini;
pub mod openai_compatible;
pub mod perplexity;
pub mod vertex;

pub use factory::create_provider;

/// Instruction used when the caller supplies none
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a helpful assistant.";

/// `"Today's date is <ISO date>.\n\n"` followed by the instruction or the generic default.
pub fn build_system_prompt(instruction: Option<&str>, today: chrono::NaiveDate) -> String {
    let instruction = instruction
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SYSTEM_INSTRUCTION);
    format!("Today's date is {}.\n\n{instruction}", today.format("%Y-%m-%d"))
}

/// The prompt-execution interface commands talk to.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Backend name used in logs and error context
    fn name(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    /// Execute a single prompt and return the response text
    async fn execute_prompt(
        &self,
        prompt: &str,
        options: &ModelOptions,
    ) -> Result<String, ProviderError>;

    fn supports_web_search(&self, model: &str) -> WebSearchSupport;

    /// Veto or redirect a call based on its estimated prompt size
    fn handle_large_token_count(&self, token_count: u64) -> TokenTriage;

    fn default_max_tokens(&self) -> u32;

    /// Usage of the most recent successful call
    fn last_token_usage(&self) -> Option<TokenUsage>;

    /// Discovered model set, if the backend offers one
    async fn available_models(&self) -> Option<ModelSet>;
}

/// Backend-specific half of a provider
#[async_trait]
pub trait ProviderBackend: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    /// `Ok(None)` when the backend has no discovery endpoint
    async fn discover_models(&self) -> Result<Option<ModelSet>, ProviderError>;

    fn supports_web_search(&self, model: &str) -> WebSearchSupport;

    fn handle_large_token_count(&self, _token_count: u64) -> TokenTriage {
        TokenTriage::default()
    }

    /// Allow-list for `reasoning_effort` / extended thinking
    fn supports_reasoning_effort(&self, _model: &str) -> bool {
        false
    }

    async fn send(
        &self,
        req: &PromptRequest,
        available: Option<&ModelSet>,
    ) -> Result<PromptResponse, ProviderError>;
}

/// Connection settings shared by every adapter
#[derive(Clone)]
pub struct ProviderSettings {
    pub api_key: SecretString,
    pub base_url: String,
    pub http: reqwest::Client,
    pub default_max_tokens: u32,
    /// Skip the reasoning-effort and web-search allow-lists
    pub override_safety_checks: bool,
    pub debug_log_max_length: usize,
}

impl ProviderSettings {
    pub fn new(kind: ProviderKind, api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            base_url: kind.default_base_url().to_string(),
            http: reqwest::Client::new(),
            default_max_tokens: kind.default_max_tokens(),
            override_safety_checks: false,
            debug_log_max_length: DEFAULT_DEBUG_LOG_MAX_LENGTH,
        }
    }

    /// Settings for `kind` from the environment snapshot and config file
    pub fn from_env(
        kind: ProviderKind,
        env: &EnvSnapshot,
        config: &Config,
    ) -> Result<Self, ProviderError> {
        let api_key = env
            .api_key(kind)
            .cloned()
            .ok_or_else(|| ProviderError::missing_api_key(kind.as_str(), kind.env_key()))?;
        Ok(Self {
            api_key,
            base_url: kind.default_base_url().to_string(),
            http: reqwest::Client::new(),
            default_max_tokens: config.max_tokens_for(kind),
            override_safety_checks: env.override_safety_checks(),
            debug_log_max_length: config.debug_log_max_length(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub const fn with_override_safety_checks(mut self, enabled: bool) -> Self {
        self.override_safety_checks = enabled;
        self
    }

    pub const fn with_debug_log_max_length(mut self, len: usize) -> Self {
        self.debug_log_max_length = len;
        self
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("override_safety_checks", &self.override_safety_checks)
            .finish()
    }
}

/// A backend plus the shared prompt flow, lazily discovered model set and usage tracking.
pub struct LlmProvider<B> {
    backend: B,
    models: OnceCell<Option<ModelSet>>,
    usage: Mutex<Option<TokenUsage>>,
    default_max_tokens: u32,
    override_safety_checks: bool,
}

impl<B: ProviderBackend> LlmProvider<B> {
    pub fn new(backend: B, settings: &ProviderSettings) -> Self {
        Self {
            backend,
            models: OnceCell::new(),
            usage: Mutex::new(None),
            default_max_tokens: settings.default_max_tokens,
            override_safety_checks: settings.override_safety_checks,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Capability answer shared by negotiation and callers; the override accepts any model as-is.
    fn web_search_support(&self, model: &str) -> WebSearchSupport {
        if self.override_safety_checks {
            tracing::debug!(
                "{}: safety checks overridden, sending {model} for web search",
                self.backend.name()
            );
            return WebSearchSupport::supported();
        }
        self.backend.supports_web_search(model)
    }

    /// Discover once per instance; failures are logged and treated as "no model set".
    async fn model_set(&self) -> Option<&ModelSet> {
        self.models
            .get_or_init(|| async {
                match self.backend.discover_models().await {
                    Ok(models) => models,
                    Err(e) => {
                        tracing::warn!(
                            "Model discovery failed for {}: {e}. Using requested model names as-is",
                            self.backend.name()
                        );
                        None
                    }
                }
            })
            .await
            .as_ref()
    }

    async fn prepare(
        &self,
        prompt: &str,
        options: &ModelOptions,
    ) -> Result<PromptRequest, ProviderError> {
        let name = self.backend.name();
        let mut requested = options.model.clone();

        if let Some(count) = options.token_count {
            let triage = self.backend.handle_large_token_count(count);
            if let Some(error) = triage.error {
                return Err(ProviderError::TokenLimitExceeded(error));
            }
            if let Some(model) = triage.model.filter(|m| *m != requested) {
                tracing::info!(
                    "{name}: {count} tokens exceeds {requested}'s comfortable context; switching to {model}"
                );
                requested = model;
            }
        }

        let available = self.model_set().await;
        let mut model = resolve_model(name, &requested, available)?;

        if options.web_search {
            let support = self.web_search_support(&model);
            if !support.supported {
                let reason = support.error.unwrap_or_default();
                match support.model {
                    Some(substitute) => {
                        tracing::info!("{name}: {reason} Using {substitute} for web search");
                        model = resolve_model(name, &substitute, available)?;
                    }
                    None => {
                        return Err(ProviderError::WebSearchUnsupported {
                            provider: name.to_string(),
                            model,
                            reason,
                        });
                    }
                }
            }
        }

        let reasoning_effort = options.reasoning_effort.filter(|effort| {
            let allowed =
                self.override_safety_checks || self.backend.supports_reasoning_effort(&model);
            if !allowed {
                tracing::warn!("{name}: {model} does not support reasoning effort; ignoring {effort}");
            }
            allowed
        });

        let max_tokens = if options.max_tokens == 0 {
            self.default_max_tokens
        } else {
            options.max_tokens
        };

        if options.debug {
            tracing::info!("{name}: executing prompt with model {model}, max tokens {max_tokens}");
        }

        Ok(PromptRequest {
            model,
            prompt: prompt.to_string(),
            system_prompt: build_system_prompt(
                options.system_prompt.as_deref(),
                chrono::Utc::now().date_naive(),
            ),
            max_tokens,
            web_search: options.web_search,
            reasoning_effort,
        })
    }
}

#[async_trait]
impl<B: ProviderBackend> Provider for LlmProvider<B> {
    fn name(&self) -> &str {
        self.backend.name()
    }

    fn kind(&self) -> ProviderKind {
        self.backend.kind()
    }

    async fn execute_prompt(
        &self,
        prompt: &str,
        options: &ModelOptions,
    ) -> Result<String, ProviderError> {
        let name = self.backend.name();
        let req = self
            .prepare(prompt, options)
            .await
            .map_err(|e| e.with_context(name, &options.model))?;

        let available = self.model_set().await;
        let call = self.backend.send(&req, available);
        let result = match options.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(ProviderError::from)
                .and_then(|r| r),
            None => call.await,
        };

        let response = result.map_err(|e| e.with_context(name, &req.model))?;
        if let Some(usage) = response.usage
            && let Ok(mut slot) = self.usage.lock()
        {
            *slot = Some(usage);
        }
        Ok(response.text)
    }

    fn supports_web_search(&self, model: &str) -> WebSearchSupport {
        self.web_search_support(model)
    }

    fn handle_large_token_count(&self, token_count: u64) -> TokenTriage {
        self.backend.handle_large_token_count(token_count)
    }

    fn default_max_tokens(&self) -> u32 {
        self.default_max_tokens
    }

    fn last_token_usage(&self) -> Option<TokenUsage> {
        self.usage.lock().ok().and_then(|u| *u)
    }

    async fn available_models(&self) -> Option<ModelSet> {
        self.model_set().await.cloned()
    }
}

/// Hard-limit / substitute triage shared by the Gemini-backed providers
pub(crate) fn gemini_context_triage(token_count: u64, large_model: &str) -> TokenTriage {
    const HARD_LIMIT: u64 = 2_000_000;
    const LARGE_CONTEXT_THRESHOLD: u64 = 800_000;
    if token_count > HARD_LIMIT {
        TokenTriage::reject(format!(
            "Repository content is too large ({token_count} tokens, limit {HARD_LIMIT}). \
             Narrow it with --subdir or ignore patterns"
        ))
    } else if token_count > LARGE_CONTEXT_THRESHOLD {
        TokenTriage::switch_to(large_model)
    } else {
        TokenTriage::default()
    }
}

/// Hard-limit-only triage
pub(crate) fn hard_limit_triage(provider: &str, token_count: u64, limit: u64) -> TokenTriage {
    if token_count > limit {
        TokenTriage::reject(format!(
            "Content is too large for {provider} ({token_count} tokens, limit {limit}). \
             Use a larger-context provider such as gemini, or narrow the input"
        ))
    } else {
        TokenTriage::default()
    }
}
