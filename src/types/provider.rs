//! Provider identities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ProviderError;

/// Every backend the tool can dispatch to.
///
/// Vertex AI is not a separate kind: it is selected inside [`ProviderKind::Gemini`] from the
/// shape of `GEMINI_API_KEY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    OpenAi,
    OpenRouter,
    Perplexity,
    ModelBox,
    Anthropic,
    Xai,
    Groq,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 8] = [
        ProviderKind::Gemini,
        ProviderKind::OpenAi,
        ProviderKind::OpenRouter,
        ProviderKind::Perplexity,
        ProviderKind::ModelBox,
        ProviderKind::Anthropic,
        ProviderKind::Xai,
        ProviderKind::Groq,
    ];

    /// Lowercase identifier used in config files and on the command line
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::OpenRouter => "openrouter",
            Self::Perplexity => "perplexity",
            Self::ModelBox => "modelbox",
            Self::Anthropic => "anthropic",
            Self::Xai => "xai",
            Self::Groq => "groq",
        }
    }

    /// Environment variable holding the API key
    pub const fn env_key(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
            Self::OpenRouter => "OPENROUTER_API_KEY",
            Self::Perplexity => "PERPLEXITY_API_KEY",
            Self::ModelBox => "MODELBOX_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Xai => "XAI_API_KEY",
            Self::Groq => "GROQ_API_KEY",
        }
    }

    /// Model used when neither the caller nor the config names one
    pub const fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.5-pro",
            Self::OpenAi => "gpt-4.1",
            Self::OpenRouter => "google/gemini-2.5-pro",
            Self::Perplexity => "sonar-pro",
            Self::ModelBox => "google/gemini-2.5-pro",
            Self::Anthropic => "claude-sonnet-4-20250514",
            Self::Xai => "grok-3-latest",
            Self::Groq => "moonshotai/kimi-k2-instruct",
        }
    }

    /// Default API base URL
    pub const fn default_base_url(&self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
            Self::Perplexity => "https://api.perplexity.ai",
            Self::ModelBox => "https://api.model.box/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
            Self::Xai => "https://api.x.ai/v1",
            Self::Groq => "https://api.groq.com/openai/v1",
        }
    }

    /// Default output token budget
    pub const fn default_max_tokens(&self) -> u32 {
        match self {
            Self::Gemini => 64_000,
            Self::OpenAi => 32_000,
            Self::OpenRouter | Self::ModelBox => 32_000,
            Self::Perplexity => 8_000,
            Self::Anthropic => 32_000,
            Self::Xai => 16_000,
            Self::Groq => 16_000,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| {
                ProviderError::InvalidParameter(format!(
                    "Unknown provider '{s}'. Valid providers: {}",
                    Self::ALL.map(|k| k.as_str()).join(", ")
                ))
            })
    }
}
