//! Per-call model options.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Reasoning effort requested from models that support it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Extended-thinking token budget for backends that take a budget instead of a level
    pub const fn thinking_budget(&self) -> u32 {
        match self {
            Self::Low => 1024,
            Self::Medium => 8192,
            Self::High => 24_576,
        }
    }
}

impl fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for a single prompt execution.
///
/// Constructed fresh by each command and never mutated by adapters.
#[derive(Debug, Clone, Default)]
pub struct ModelOptions {
    /// Requested model name (resolved against the provider's model set)
    pub model: String,
    /// Output token budget
    pub max_tokens: u32,
    /// Caller-supplied system instruction; a generic default is used when absent
    pub system_prompt: Option<String>,
    /// Estimated prompt size, used for token-limit triage
    pub token_count: Option<u64>,
    /// Request web-search grounding
    pub web_search: bool,
    /// Whole-call deadline
    pub timeout: Option<Duration>,
    /// Log request/response detail
    pub debug: bool,
    /// Reasoning effort for models that support it
    pub reasoning_effort: Option<ReasoningEffort>,
}

impl ModelOptions {
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            ..Default::default()
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub const fn with_token_count(mut self, count: u64) -> Self {
        self.token_count = Some(count);
        self
    }

    pub const fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search = enabled;
        self
    }

    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub const fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = Some(effort);
        self
    }

    /// Same options for a different model
    pub fn for_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }
}
