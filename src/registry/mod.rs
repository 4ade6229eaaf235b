//! Provider availability and per-command preference order.
//!
//! A provider is available when its API key is present in the [`EnvSnapshot`]. Nothing here
//! is cached; every answer is recomputed from the snapshot it is given.

use std::future::Future;

use crate::env::EnvSnapshot;
use crate::error::ProviderError;
use crate::types::ProviderKind;

use ProviderKind::*;

/// Command categories with their own provider preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandCategory {
    Web,
    Repo,
    PlanFile,
    PlanThinking,
    Doc,
    Ask,
    Browser,
}

impl CommandCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Repo => "repo",
            Self::PlanFile => "plan_file",
            Self::PlanThinking => "plan_thinking",
            Self::Doc => "doc",
            Self::Ask => "ask",
            Self::Browser => "browser",
        }
    }
}

impl std::fmt::Display for CommandCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static preference table, most preferred first
pub const PROVIDER_PREFERENCE: &[(CommandCategory, &[ProviderKind])] = &[
    (CommandCategory::Web, &[Perplexity, Gemini, ModelBox, OpenRouter]),
    (
        CommandCategory::Repo,
        &[Gemini, ModelBox, OpenRouter, OpenAi, Perplexity, Anthropic, Xai, Groq],
    ),
    (
        CommandCategory::PlanFile,
        &[Gemini, ModelBox, OpenRouter, OpenAi, Perplexity, Anthropic, Xai, Groq],
    ),
    (
        CommandCategory::PlanThinking,
        &[OpenAi, ModelBox, OpenRouter, Gemini, Anthropic, Perplexity, Xai, Groq],
    ),
    (
        CommandCategory::Doc,
        &[Gemini, ModelBox, OpenRouter, OpenAi, Perplexity, Anthropic, Xai, Groq],
    ),
    (
        CommandCategory::Ask,
        &[OpenAi, ModelBox, OpenRouter, Gemini, Anthropic, Perplexity, Xai, Groq],
    ),
    (
        CommandCategory::Browser,
        &[Anthropic, OpenAi, ModelBox, OpenRouter, Gemini, Perplexity],
    ),
];

/// Preference order for a command category
pub fn preference(category: CommandCategory) -> &'static [ProviderKind] {
    PROVIDER_PREFERENCE
        .iter()
        .find(|(c, _)| *c == category)
        .map(|(_, order)| *order)
        .unwrap_or(&[])
}

/// A provider's name, availability and default model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfo {
    pub provider: ProviderKind,
    pub available: bool,
    pub default_model: &'static str,
}

/// Every known provider with its availability
pub fn get_all_providers(env: &EnvSnapshot) -> Vec<ProviderInfo> {
    ProviderKind::ALL
        .into_iter()
        .map(|provider| ProviderInfo {
            provider,
            available: env.has_api_key(provider),
            default_model: provider.default_model(),
        })
        .collect()
}

/// Providers whose API key is set
pub fn get_available_providers(env: &EnvSnapshot) -> Vec<ProviderInfo> {
    get_all_providers(env)
        .into_iter()
        .filter(|p| p.available)
        .collect()
}

/// Next available provider in `order` after `current` (from the start when `None`)
pub fn next_available_in(
    order: &[ProviderKind],
    current: Option<ProviderKind>,
    env: &EnvSnapshot,
) -> Option<ProviderKind> {
    let start = match current {
        Some(c) => order.iter().position(|p| *p == c).map_or(0, |i| i + 1),
        None => 0,
    };
    order
        .iter()
        .skip(start)
        .copied()
        .find(|p| Some(*p) != current && env.has_api_key(*p))
}

/// Next available provider for `category` after `current`
pub fn get_next_available_provider(
    category: CommandCategory,
    current: Option<ProviderKind>,
    env: &EnvSnapshot,
) -> Option<ProviderKind> {
    next_available_in(preference(category), current, env)
}

/// Run `attempt` on each of `candidates` in order until one succeeds.
///
/// Failures are logged, passed to `on_failure` and recorded; once the list is exhausted the
/// result is [`ProviderError::NoProviderAvailable`] carrying every recorded failure.
pub async fn try_candidates<T, F, Fut, N>(
    category: CommandCategory,
    candidates: &[ProviderKind],
    mut attempt: F,
    mut on_failure: N,
) -> Result<T, ProviderError>
where
    F: FnMut(ProviderKind) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
    N: FnMut(ProviderKind, &ProviderError),
{
    let mut attempts = Vec::new();
    for &kind in candidates {
        match attempt(kind).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::warn!("{kind} failed for {category}: {e}. Trying next provider");
                on_failure(kind, &e);
                attempts.push(format!("{kind}: {e}"));
            }
        }
    }
    Err(ProviderError::NoProviderAvailable {
        command: category.to_string(),
        attempts,
    })
}

/// Run `attempt` against each available provider in preference order until one succeeds.
pub async fn try_providers<T, F, Fut>(
    category: CommandCategory,
    env: &EnvSnapshot,
    attempt: F,
) -> Result<T, ProviderError>
where
    F: FnMut(ProviderKind) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let available: Vec<ProviderKind> = preference(category)
        .iter()
        .copied()
        .filter(|kind| env.has_api_key(*kind))
        .collect();
    try_candidates(category, &available, attempt, |_, _| {}).await
}
