//! Backend-ready prompt requests and responses.

use super::{ReasoningEffort, TokenUsage};

/// A prompt after model resolution and capability gating, ready to be encoded for a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    /// Resolved model identifier
    pub model: String,
    pub prompt: String,
    /// Full system prompt, date line included
    pub system_prompt: String,
    pub max_tokens: u32,
    pub web_search: bool,
    /// Present only when the model accepts it
    pub reasoning_effort: Option<ReasoningEffort>,
}

impl PromptRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system_prompt: String::new(),
            max_tokens: 4096,
            web_search: false,
            reasoning_effort: None,
        }
    }
}

/// Decoded backend answer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptResponse {
    /// Text content, with any citation block already appended
    pub text: String,
    pub usage: Option<TokenUsage>,
}
