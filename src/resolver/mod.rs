//! Model-name resolution.
//!
//! Maps a user-supplied model string onto a name the backend recognises, tolerating typos,
//! missing namespace prefixes and `-latest` / `-exp` suffixes. Strategies run in a fixed
//! order and the first hit wins:
//!
//! 1. exact match
//! 2. namespace match (`openai/gpt-4o` against `someone/gpt-4o`)
//! 3. prefix match (`gpt-4o` against `openai/gpt-4o` or `*/gpt-4o`)
//! 4. `-latest` suffix
//! 5. `-exp` / `-exp-*` suffix
//! 6. similarity ranking
//!
//! Resolution never leaves the provider's own model set.

pub mod similarity;

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::error::ProviderError;
use similarity::{rank_similar_models, strip_namespace};

/// The model set a provider discovered at construction time
pub type ModelSet = BTreeSet<String>;

static EXP_SUFFIX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"-exp(-[A-Za-z0-9.-]+)?$").ok());

/// Resolve `requested` against `available`.
///
/// With no available set (discovery pending, failed, or unsupported) the request is returned
/// unchanged and validation is left to the backend.
pub fn resolve_model(
    provider: &str,
    requested: &str,
    available: Option<&ModelSet>,
) -> Result<String, ProviderError> {
    let Some(available) = available else {
        tracing::debug!(provider, model = requested, "No model list available, passing through");
        return Ok(requested.to_string());
    };
    if available.is_empty() {
        return Ok(requested.to_string());
    }

    if available.contains(requested) {
        return Ok(requested.to_string());
    }

    if let Some(found) = match_namespace(requested, available) {
        tracing::debug!(provider, requested, resolved = %found, "Resolved by namespace");
        return Ok(found);
    }

    if let Some(found) = match_prefix(requested, available) {
        tracing::debug!(provider, requested, resolved = %found, "Resolved by prefix");
        return Ok(found);
    }

    if let Some(base) = requested.strip_suffix("-latest")
        && let Some(found) = pick_by_base(base, available)
    {
        tracing::debug!(provider, requested, resolved = %found, "Resolved -latest alias");
        return Ok(found);
    }

    if let Some(m) = EXP_SUFFIX.as_ref().and_then(|re| re.find(requested))
        && let Some(found) = pick_by_base(&requested[..m.start()], available)
    {
        tracing::debug!(provider, requested, resolved = %found, "Resolved experimental alias");
        return Ok(found);
    }

    match_similar(provider, requested, available)
}

/// Requests carrying a namespace: match any entry with the same bare name.
fn match_namespace(requested: &str, available: &ModelSet) -> Option<String> {
    if !requested.contains('/') {
        return None;
    }
    let bare = strip_namespace(requested);
    if available.contains(bare) {
        return Some(bare.to_string());
    }
    available
        .iter()
        .find(|m| m.contains('/') && strip_namespace(m) == bare)
        .cloned()
}

/// Requests without a namespace: try `openai/` and then any `*/<requested>` entry.
fn match_prefix(requested: &str, available: &ModelSet) -> Option<String> {
    if requested.contains('/') {
        return None;
    }
    let openai = format!("openai/{requested}");
    if available.contains(&openai) {
        return Some(openai);
    }
    let suffix = format!("/{requested}");
    available.iter().find(|m| m.ends_with(&suffix)).cloned()
}

/// Entries whose bare name starts with `base`, sorted descending; the last one is chosen.
///
/// Picking the last element of a descending sort selects the lexicographically smallest
/// match (for dated names, the oldest).
fn pick_by_base(base: &str, available: &ModelSet) -> Option<String> {
    if base.is_empty() {
        return None;
    }
    let bare_base = strip_namespace(base);
    let mut matches: Vec<&String> = available
        .iter()
        .filter(|m| m.starts_with(base) || strip_namespace(m).starts_with(bare_base))
        .collect();
    matches.sort_by(|a, b| b.cmp(a));
    matches.last().map(|m| (*m).clone())
}

fn match_similar(
    provider: &str,
    requested: &str,
    available: &ModelSet,
) -> Result<String, ProviderError> {
    let namespace = requested.split_once('/').map(|(ns, _)| format!("{ns}/"));
    let in_namespace: Vec<&String> = match &namespace {
        Some(ns) => available.iter().filter(|m| m.starts_with(ns.as_str())).collect(),
        None => Vec::new(),
    };
    let suggestions = if in_namespace.is_empty() {
        rank_similar_models(requested, available)
    } else {
        rank_similar_models(requested, in_namespace)
    };

    let bare = strip_namespace(requested);
    if let Some(best) = suggestions.first()
        && best.contains(bare)
    {
        tracing::warn!("Model '{requested}' not found for {provider}; using closest match '{best}'");
        return Ok(best.clone());
    }

    Err(ProviderError::ModelNotFound {
        provider: provider.to_string(),
        model: requested.to_string(),
        suggestions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(models: &[&str]) -> ModelSet {
        models.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn passes_through_without_model_set() {
        assert_eq!(resolve_model("gemini", "anything", None).unwrap(), "anything");
    }

    #[test]
    fn exact_match_wins() {
        let models = set(&["gpt-4o", "gpt-4o-mini"]);
        assert_eq!(resolve_model("openai", "gpt-4o", Some(&models)).unwrap(), "gpt-4o");
    }

    #[test]
    fn namespace_and_prefix_matching() {
        let models = set(&["openai/gpt-4o", "anthropic/claude-sonnet-4"]);
        assert_eq!(
            resolve_model("openrouter", "gpt-4o", Some(&models)).unwrap(),
            "openai/gpt-4o"
        );
        assert_eq!(
            resolve_model("openrouter", "claude/claude-sonnet-4", Some(&models)).unwrap(),
            "anthropic/claude-sonnet-4"
        );
    }

    #[test]
    fn latest_suffix_selects_oldest_match() {
        let models = set(&["gpt-4-2023-06", "gpt-4-2023-01"]);
        assert_eq!(
            resolve_model("openai", "gpt-4-latest", Some(&models)).unwrap(),
            "gpt-4-2023-01"
        );
    }

    #[test]
    fn exp_suffix_is_stripped() {
        let models = set(&["gemini-2.0-flash-001", "gemini-1.5-pro"]);
        assert_eq!(
            resolve_model("gemini", "gemini-2.0-flash-exp-0205", Some(&models)).unwrap(),
            "gemini-2.0-flash-001"
        );
    }

    #[test]
    fn similar_match_containing_request_is_auto_selected() {
        let models = set(&["sonar-pro-2025", "sonar-reasoning"]);
        assert_eq!(
            resolve_model("perplexity", "pro-2025", Some(&models)).unwrap(),
            "sonar-pro-2025"
        );
    }

    #[test]
    fn unknown_model_lists_ranked_suggestions() {
        let models = set(&["claude-sonnet-4", "claude-opus-4", "claude-3-5-haiku"]);
        let err = resolve_model("anthropic", "claude-sonet-4", Some(&models)).unwrap_err();
        match err {
            ProviderError::ModelNotFound { suggestions, .. } => {
                assert_eq!(suggestions[0], "claude-sonnet-4");
                assert!(suggestions.len() <= 5);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
