//! OpenAI chat-completions wire format, shared by every OpenAI-compatible backend.

use serde_json::{Value, json};

use super::{Citation, RequestTransformer, ResponseTransformer, append_citations, u64_at};
use crate::error::ProviderError;
use crate::resolver::similarity::strip_namespace;
use crate::types::{PromptRequest, PromptResponse, TokenUsage};

/// How a backend expects web search to be requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebSearchStyle {
    /// The model searches natively (Perplexity, `perplexity/*`, Groq compound)
    Native,
    /// `web_search_options: {}` (OpenAI search-preview models)
    WebSearchOptions,
    /// `search_parameters` Live Search (xAI)
    SearchParameters,
}

/// OpenAI reasoning families take `max_completion_tokens` and a `developer` system role
pub fn is_reasoning_model(model: &str) -> bool {
    let bare = strip_namespace(model);
    ["o1", "o3", "o4", "gpt-5"]
        .iter()
        .any(|p| bare == *p || bare.starts_with(&format!("{p}-")))
}

#[derive(Debug, Clone)]
pub struct OpenAiRequestTransformer {
    provider_id: String,
    reasoning_quirks: bool,
    web_search_style: WebSearchStyle,
}

impl OpenAiRequestTransformer {
    pub fn new(provider_id: impl Into<String>, web_search_style: WebSearchStyle) -> Self {
        Self {
            provider_id: provider_id.into(),
            reasoning_quirks: false,
            web_search_style,
        }
    }

    /// Apply the OpenAI reasoning-model parameter names
    pub const fn with_reasoning_quirks(mut self, enabled: bool) -> Self {
        self.reasoning_quirks = enabled;
        self
    }
}

impl RequestTransformer for OpenAiRequestTransformer {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn transform_prompt(&self, req: &PromptRequest) -> Result<Value, ProviderError> {
        let reasoning = self.reasoning_quirks && is_reasoning_model(&req.model);
        let system_role = if reasoning { "developer" } else { "system" };
        let mut body = json!({
            "model": req.model,
            "messages": [
                { "role": system_role, "content": req.system_prompt },
                { "role": "user", "content": req.prompt },
            ],
        });
        let tokens_key = if reasoning {
            "max_completion_tokens"
        } else {
            "max_tokens"
        };
        body[tokens_key] = json!(req.max_tokens);

        if let Some(effort) = req.reasoning_effort {
            body["reasoning_effort"] = json!(effort.as_str());
        }

        if req.web_search {
            match self.web_search_style {
                WebSearchStyle::Native => {}
                WebSearchStyle::WebSearchOptions => body["web_search_options"] = json!({}),
                WebSearchStyle::SearchParameters => {
                    body["search_parameters"] = json!({ "mode": "on", "return_citations": true })
                }
            }
        }
        Ok(body)
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiResponseTransformer {
    provider_id: String,
}

impl OpenAiResponseTransformer {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
        }
    }
}

impl ResponseTransformer for OpenAiResponseTransformer {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn transform_prompt_response(&self, raw: &Value) -> Result<PromptResponse, ProviderError> {
        let message = raw
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .ok_or_else(|| {
                ProviderError::ParseError(format!(
                    "{} response has no choices[0].message",
                    self.provider_id
                ))
            })?;
        let content = message
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let mut citations: Vec<Citation> = raw
            .get("citations")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|c| c.as_str().map(|url| Citation::new(url, None)))
            .collect();
        citations.extend(
            message
                .get("annotations")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(|a| a.get("url_citation"))
                .filter_map(|u| {
                    let url = u.get("url")?.as_str()?;
                    let title = u.get("title").and_then(Value::as_str).map(str::to_string);
                    Some(Citation::new(url, title))
                }),
        );

        let text = if content.trim().is_empty() {
            String::new()
        } else {
            append_citations(content, &citations, &[])
        };

        let usage = raw
            .get("usage")
            .map(|u| TokenUsage::new(u64_at(u, "prompt_tokens"), u64_at(u, "completion_tokens")));
        Ok(PromptResponse { text, usage })
    }
}
