//! Transformers layer
//!
//! Converts a resolved [`PromptRequest`] into a backend JSON body and a backend JSON response
//! into a [`PromptResponse`]. Executors own the HTTP; transformers stay pure.

use serde_json::Value;

use crate::error::ProviderError;
use crate::types::{PromptRequest, PromptResponse};

pub mod anthropic;
pub mod gemini;
pub mod openai;

/// Transform a resolved prompt into a provider-specific payload
pub trait RequestTransformer: Send + Sync {
    /// Provider identifier (e.g. "openai", "gemini", "vertex")
    fn provider_id(&self) -> &str;

    fn transform_prompt(&self, req: &PromptRequest) -> Result<Value, ProviderError>;
}

/// Transform provider-specific responses into a [`PromptResponse`]
pub trait ResponseTransformer: Send + Sync {
    fn provider_id(&self) -> &str;

    fn transform_prompt_response(&self, raw: &Value) -> Result<PromptResponse, ProviderError>;
}

/// A web source attached to a grounded answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub title: Option<String>,
    pub url: String,
}

impl Citation {
    pub fn new(url: impl Into<String>, title: Option<String>) -> Self {
        Self {
            url: url.into(),
            title: title.filter(|t| !t.trim().is_empty()),
        }
    }
}

/// Append a numbered citation list and the search queries to `text`.
///
/// The original text is never truncated; with no citations and no queries it is returned
/// unchanged. Duplicate URLs are listed once.
pub fn append_citations(text: &str, citations: &[Citation], queries: &[String]) -> String {
    let mut out = text.to_string();
    let mut seen = std::collections::HashSet::new();
    let unique: Vec<&Citation> = citations.iter().filter(|c| seen.insert(&c.url)).collect();
    if !unique.is_empty() {
        out.push_str("\n\nCitations:");
        for (i, c) in unique.iter().enumerate() {
            match &c.title {
                Some(title) => out.push_str(&format!("\n[{}] {}: {}", i + 1, title, c.url)),
                None => out.push_str(&format!("\n[{}] {}", i + 1, c.url)),
            }
        }
    }
    if !queries.is_empty() {
        out.push_str(&format!("\n\nWeb search queries: {}", queries.join(", ")));
    }
    out
}

pub(crate) fn u64_at(v: &Value, key: &str) -> u64 {
    v.get(key).and_then(Value::as_u64).unwrap_or(0)
}
