//! Configuration file support.
//!
//! Config is loaded from `vibe-tools.config.json` in the working directory, falling back to
//! `~/.vibe-tools/config.json`. Every field is optional; unset values resolve to the
//! per-provider defaults in [`ProviderKind`]. The loaded value is constructed once in `main`
//! and handed to commands by reference.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::env::EnvSnapshot;
use crate::error::{DEFAULT_DEBUG_LOG_MAX_LENGTH, ProviderError};
use crate::types::ProviderKind;

/// Project-local config file name
pub const CONFIG_FILE_NAME: &str = "vibe-tools.config.json";

/// Persisted per-provider settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderConfig {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    /// Overrides `<PROVIDER>_API_KEY`
    pub api_key: Option<String>,
    /// Truncation length for raw payloads in debug output
    pub debug_log_max_length: Option<usize>,
}

/// Per-command provider/model overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommandConfig {
    pub provider: Option<ProviderKind>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
}

/// Two-pass planning configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlanConfig {
    pub file_provider: Option<ProviderKind>,
    pub thinking_provider: Option<ProviderKind>,
    pub file_model: Option<String>,
    pub thinking_model: Option<String>,
    pub file_max_tokens: Option<u32>,
    pub thinking_max_tokens: Option<u32>,
}

impl PlanConfig {
    /// The file-selection pass as a command section
    pub fn file_section(&self) -> CommandConfig {
        CommandConfig {
            provider: self.file_provider,
            model: self.file_model.clone(),
            max_tokens: self.file_max_tokens,
        }
    }

    /// The thinking pass as a command section
    pub fn thinking_section(&self) -> CommandConfig {
        CommandConfig {
            provider: self.thinking_provider,
            model: self.thinking_model.clone(),
            max_tokens: self.thinking_max_tokens,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub gemini: ProviderConfig,
    pub openai: ProviderConfig,
    pub openrouter: ProviderConfig,
    pub perplexity: ProviderConfig,
    pub modelbox: ProviderConfig,
    pub anthropic: ProviderConfig,
    pub xai: ProviderConfig,
    pub groq: ProviderConfig,

    pub ask: CommandConfig,
    pub web: CommandConfig,
    pub repo: CommandConfig,
    pub doc: CommandConfig,
    pub plan: PlanConfig,
}

impl Config {
    /// Candidate config paths, most specific first
    pub fn search_paths(cwd: &Path) -> Vec<PathBuf> {
        let mut paths = vec![cwd.join(CONFIG_FILE_NAME)];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".vibe-tools").join("config.json"));
        }
        paths
    }

    /// Load the first config file found, or defaults when none exists.
    ///
    /// A file that exists but is not valid JSON is a fatal configuration error.
    pub fn load(cwd: &Path) -> Result<Self, ProviderError> {
        for path in Self::search_paths(cwd) {
            if path.is_file() {
                tracing::debug!("Loading config from {}", path.display());
                return Self::from_path(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load a specific config file
    pub fn from_path(path: &Path) -> Result<Self, ProviderError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::ConfigurationError(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ProviderError::ConfigurationError(format!(
                "Invalid JSON in config file {}: {e}",
                path.display()
            ))
        })
    }

    pub fn provider(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::Gemini => &self.gemini,
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::OpenRouter => &self.openrouter,
            ProviderKind::Perplexity => &self.perplexity,
            ProviderKind::ModelBox => &self.modelbox,
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::Xai => &self.xai,
            ProviderKind::Groq => &self.groq,
        }
    }

    /// Configured model for a provider, falling back to its default
    pub fn model_for(&self, kind: ProviderKind) -> String {
        self.provider(kind)
            .model
            .clone()
            .unwrap_or_else(|| kind.default_model().to_string())
    }

    /// Configured max tokens for a provider, falling back to its default
    pub fn max_tokens_for(&self, kind: ProviderKind) -> u32 {
        self.provider(kind)
            .max_tokens
            .unwrap_or_else(|| kind.default_max_tokens())
    }

    /// Truncation length for debug payloads (the largest configured value wins)
    pub fn debug_log_max_length(&self) -> usize {
        ProviderKind::ALL
            .iter()
            .filter_map(|k| self.provider(*k).debug_log_max_length)
            .max()
            .unwrap_or(DEFAULT_DEBUG_LOG_MAX_LENGTH)
    }

    /// Layer config-file API keys over the environment snapshot
    pub fn apply_api_keys(&self, env: EnvSnapshot) -> EnvSnapshot {
        ProviderKind::ALL.into_iter().fold(env, |env, kind| {
            match self.provider(kind).api_key.as_deref().map(str::trim) {
                Some(key) if !key.is_empty() => env.with_api_key(kind, key),
                _ => env,
            }
        })
    }
}
