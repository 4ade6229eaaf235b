//! Command layer.
//!
//! Each command resolves a provider and model (explicit option, then the config file, then
//! the per-command preference order with failover), builds its prompt and streams
//! user-facing output lines. Commands share one [`CommandContext`] holding the environment
//! snapshot, the loaded config and the provider factory.

use futures::Stream;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::config::{CommandConfig, Config};
use crate::env::EnvSnapshot;
use crate::error::ProviderError;
use crate::providers::{Provider, create_provider};
use crate::registry::{CommandCategory, get_next_available_provider, try_candidates};
use crate::types::{ModelOptions, ProviderKind, ReasoningEffort};

pub mod ask;
pub mod doc;
pub mod packer;
pub mod plan;
pub mod repo;
pub mod web;

pub use ask::AskCommand;
pub use doc::DocCommand;
pub use packer::{FsPacker, PackedFile, PackedRepo, Packer};
pub use plan::PlanCommand;
pub use repo::RepoCommand;
pub use web::WebCommand;

/// Output lines of a running command
pub type CommandStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// A CLI command
pub trait Command: Send + Sync {
    fn execute(&self, query: &str, options: CommandOptions) -> CommandStream;
}

/// Per-invocation options shared by every command
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    pub provider: Option<ProviderKind>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    /// Emit the resolved provider and model
    pub debug: bool,
    pub reasoning_effort: Option<ReasoningEffort>,
    /// Restrict repository packing to this directory (relative to the working directory)
    pub subdir: Option<PathBuf>,
    /// Write the final answer to this file as well
    pub save_to: Option<PathBuf>,
    pub file_provider: Option<ProviderKind>,
    pub file_model: Option<String>,
    pub thinking_provider: Option<ProviderKind>,
    pub thinking_model: Option<String>,
}

/// Builds provider adapters; swapped out in tests
pub trait ProviderFactory: Send + Sync {
    fn create(
        &self,
        kind: ProviderKind,
        env: &EnvSnapshot,
        config: &Config,
    ) -> Result<Box<dyn Provider>, ProviderError>;
}

/// Factory backed by [`create_provider`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProviderFactory;

impl ProviderFactory for DefaultProviderFactory {
    fn create(
        &self,
        kind: ProviderKind,
        env: &EnvSnapshot,
        config: &Config,
    ) -> Result<Box<dyn Provider>, ProviderError> {
        create_provider(kind, env, config)
    }
}

/// Everything a command needs beyond its query
pub struct CommandContext {
    pub env: EnvSnapshot,
    pub config: Config,
    pub cwd: PathBuf,
    pub factory: Arc<dyn ProviderFactory>,
    pub packer: Arc<dyn Packer>,
}

impl CommandContext {
    pub fn new(env: EnvSnapshot, config: Config, cwd: PathBuf) -> Self {
        Self {
            env,
            config,
            cwd,
            factory: Arc::new(DefaultProviderFactory),
            packer: Arc::new(FsPacker::default()),
        }
    }

    pub fn with_factory(mut self, factory: Arc<dyn ProviderFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_packer(mut self, packer: Arc<dyn Packer>) -> Self {
        self.packer = packer;
        self
    }

    /// Root directory to pack for `options`
    pub(crate) fn pack_root(&self, options: &CommandOptions) -> PathBuf {
        match &options.subdir {
            Some(sub) => self.cwd.join(sub),
            None => self.cwd.clone(),
        }
    }

    /// Pack the repository on the blocking pool
    pub(crate) async fn pack(&self, options: &CommandOptions) -> Result<PackedRepo, ProviderError> {
        let packer = Arc::clone(&self.packer);
        let root = self.pack_root(options);
        tokio::task::spawn_blocking(move || packer.pack(&root))
            .await
            .map_err(|e| ProviderError::InternalError(format!("Repository packing failed: {e}")))?
    }
}

/// One prompt to run against the first provider that answers
#[derive(Debug, Clone)]
pub(crate) struct PromptPlan {
    pub category: CommandCategory,
    /// Ordered providers to try; a single entry disables failover
    pub candidates: Vec<ProviderKind>,
    /// `--model`, only honoured together with an explicit or configured provider
    pub model: Option<String>,
    pub section: CommandConfig,
    pub max_tokens: Option<u32>,
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub token_count: Option<u64>,
    pub web_search: bool,
    pub timeout: Option<Duration>,
    pub debug: bool,
    pub reasoning_effort: Option<ReasoningEffort>,
}

impl PromptPlan {
    pub fn new(
        ctx: &CommandContext,
        category: CommandCategory,
        explicit: Option<ProviderKind>,
        section: CommandConfig,
        prompt: String,
    ) -> Result<Self, ProviderError> {
        let candidates = candidates(&ctx.env, category, explicit.or(section.provider));
        if candidates.is_empty() {
            return Err(ProviderError::NoProviderAvailable {
                command: category.to_string(),
                attempts: Vec::new(),
            });
        }
        Ok(Self {
            category,
            candidates,
            model: None,
            section,
            max_tokens: None,
            prompt,
            system_prompt: None,
            token_count: None,
            web_search: false,
            timeout: None,
            debug: false,
            reasoning_effort: None,
        })
    }

    /// Apply the common `CommandOptions` fields
    pub fn with_options(mut self, options: &CommandOptions) -> Self {
        self.model = options.model.clone();
        self.max_tokens = options.max_tokens;
        self.debug = options.debug;
        self.reasoning_effort = options.reasoning_effort;
        self
    }

    fn model_for(&self, kind: ProviderKind, config: &Config) -> String {
        if let Some(model) = &self.model {
            return model.clone();
        }
        self.section
            .model
            .clone()
            .filter(|_| self.section.provider == Some(kind))
            .unwrap_or_else(|| config.model_for(kind))
    }

    fn max_tokens_for(&self, kind: ProviderKind, config: &Config) -> u32 {
        self.max_tokens
            .or_else(|| self.section.max_tokens.filter(|_| self.section.provider == Some(kind)))
            .unwrap_or_else(|| config.max_tokens_for(kind))
    }
}

/// An explicit provider is the only candidate; otherwise every available provider in
/// preference order.
pub(crate) fn candidates(
    env: &EnvSnapshot,
    category: CommandCategory,
    explicit: Option<ProviderKind>,
) -> Vec<ProviderKind> {
    if let Some(kind) = explicit {
        return vec![kind];
    }
    let mut out = Vec::new();
    let mut current = None;
    while let Some(kind) = get_next_available_provider(category, current, env) {
        out.push(kind);
        current = Some(kind);
    }
    out
}

/// Reject `--model` without a provider to pin it to
pub(crate) fn check_model_has_provider(
    options: &CommandOptions,
    section: &CommandConfig,
) -> Result<(), ProviderError> {
    if options.model.is_some() && options.provider.is_none() && section.provider.is_none() {
        return Err(ProviderError::InvalidParameter(
            "--model requires --provider (or a configured provider)".to_string(),
        ));
    }
    Ok(())
}

/// Successful run of a [`PromptPlan`]
#[derive(Debug, Clone)]
pub(crate) struct PromptOutcome {
    /// Informational lines to show before the answer
    pub notes: Vec<String>,
    pub text: String,
}

/// Run `plan` on each candidate until one succeeds.
///
/// With a single candidate its error is returned as-is; otherwise failures are noted and the
/// next provider is tried, ending in [`ProviderError::NoProviderAvailable`].
pub(crate) async fn run_prompt(
    ctx: &CommandContext,
    plan: &PromptPlan,
) -> Result<PromptOutcome, ProviderError> {
    let notes = Mutex::new(Vec::new());
    let result = match plan.candidates.as_slice() {
        [only] => attempt(ctx, plan, *only, &notes).await,
        candidates => {
            try_candidates(
                plan.category,
                candidates,
                |kind| attempt(ctx, plan, kind, &notes),
                |kind, e| {
                    push_note(&notes, format!("{kind} failed: {e}. Trying next provider..."));
                },
            )
            .await
        }
    };
    let notes = notes.into_inner().unwrap_or_else(PoisonError::into_inner);
    result.map(|text| PromptOutcome { notes, text })
}

fn push_note(notes: &Mutex<Vec<String>>, note: String) {
    notes.lock().unwrap_or_else(PoisonError::into_inner).push(note);
}

async fn attempt(
    ctx: &CommandContext,
    plan: &PromptPlan,
    kind: ProviderKind,
    notes: &Mutex<Vec<String>>,
) -> Result<String, ProviderError> {
    let provider = ctx.factory.create(kind, &ctx.env, &ctx.config)?;
    let mut model = plan.model_for(kind, &ctx.config);
    if plan.debug {
        push_note(notes, format!("Using {} with model {model}", provider.name()));
    }

    if plan.web_search {
        let support = provider.supports_web_search(&model);
        if !support.supported {
            let reason = support.error.unwrap_or_default();
            match support.model {
                Some(substitute) => {
                    push_note(notes, format!("Note: {reason} Using {substitute} instead."));
                    model = substitute;
                }
                None => {
                    return Err(ProviderError::WebSearchUnsupported {
                        provider: provider.name().to_string(),
                        model,
                        reason,
                    });
                }
            }
        }
    }

    let mut options = ModelOptions::new(model, plan.max_tokens_for(kind, &ctx.config))
        .with_web_search(plan.web_search)
        .with_debug(plan.debug);
    options.system_prompt = plan.system_prompt.clone();
    options.token_count = plan.token_count;
    options.timeout = plan.timeout;
    options.reasoning_effort = plan.reasoning_effort;

    let text = provider.execute_prompt(&plan.prompt, &options).await?;
    if plan.debug
        && let Some(usage) = provider.last_token_usage()
    {
        push_note(
            notes,
            format!(
                "Token usage: {} prompt, {} completion",
                usage.prompt_tokens, usage.completion_tokens
            ),
        );
    }
    Ok(text)
}

/// Write `text` to `path` when requested
pub(crate) async fn save_output(
    path: Option<&PathBuf>,
    text: &str,
) -> Result<Option<String>, ProviderError> {
    let Some(path) = path else {
        return Ok(None);
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            ProviderError::ConfigurationError(format!("Cannot create {}: {e}", parent.display()))
        })?;
    }
    tokio::fs::write(path, text).await.map_err(|e| {
        ProviderError::ConfigurationError(format!("Cannot write {}: {e}", path.display()))
    })?;
    Ok(Some(format!("Output saved to {}", path.display())))
}
