//! Anthropic Messages API wire format.

use serde_json::{Value, json};

use super::{Citation, RequestTransformer, ResponseTransformer, append_citations, u64_at};
use crate::error::ProviderError;
use crate::types::{PromptRequest, PromptResponse, TokenUsage};

/// Smallest thinking budget the API accepts
pub const MIN_THINKING_BUDGET: u32 = 1024;

#[derive(Debug, Clone, Default)]
pub struct AnthropicRequestTransformer;

impl RequestTransformer for AnthropicRequestTransformer {
    fn provider_id(&self) -> &str {
        "anthropic"
    }

    fn transform_prompt(&self, req: &PromptRequest) -> Result<Value, ProviderError> {
        let mut body = json!({
            "model": req.model,
            "max_tokens": req.max_tokens,
            "system": req.system_prompt,
            "messages": [{ "role": "user", "content": req.prompt }],
        });

        if let Some(effort) = req.reasoning_effort {
            // budget_tokens must stay below max_tokens
            let budget = effort
                .thinking_budget()
                .min(req.max_tokens.saturating_sub(1));
            if budget >= MIN_THINKING_BUDGET {
                body["thinking"] = json!({ "type": "enabled", "budget_tokens": budget });
            } else {
                tracing::warn!(
                    "max_tokens {} too small for extended thinking; sending without it",
                    req.max_tokens
                );
            }
        }

        if req.web_search {
            body["tools"] = json!([{
                "type": "web_search_20250305",
                "name": "web_search",
                "max_uses": 5
            }]);
        }
        Ok(body)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnthropicResponseTransformer;

impl ResponseTransformer for AnthropicResponseTransformer {
    fn provider_id(&self) -> &str {
        "anthropic"
    }

    fn transform_prompt_response(&self, raw: &Value) -> Result<PromptResponse, ProviderError> {
        let blocks = raw
            .get("content")
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::ParseError("anthropic response has no content".into()))?;

        let mut content = String::new();
        let mut citations = Vec::new();
        for block in blocks
            .iter()
            .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
        {
            if let Some(t) = block.get("text").and_then(Value::as_str) {
                content.push_str(t);
            }
            citations.extend(
                block
                    .get("citations")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                    .filter_map(|c| {
                        let url = c.get("url")?.as_str()?;
                        let title = c.get("title").and_then(Value::as_str).map(str::to_string);
                        Some(Citation::new(url, title))
                    }),
            );
        }

        let text = if content.trim().is_empty() {
            String::new()
        } else {
            append_citations(&content, &citations, &[])
        };
        let usage = raw
            .get("usage")
            .map(|u| TokenUsage::new(u64_at(u, "input_tokens"), u64_at(u, "output_tokens")));
        Ok(PromptResponse { text, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReasoningEffort;

    #[test]
    fn thinking_budget_is_capped_below_max_tokens() {
        let mut req = PromptRequest::new("claude-sonnet-4", "hi");
        req.max_tokens = 8192;
        req.reasoning_effort = Some(ReasoningEffort::High);
        let body = AnthropicRequestTransformer.transform_prompt(&req).unwrap();
        assert_eq!(body["thinking"]["budget_tokens"], 8191);

        req.max_tokens = 512;
        let body = AnthropicRequestTransformer.transform_prompt(&req).unwrap();
        assert!(body.get("thinking").is_none());
    }

    #[test]
    fn response_joins_text_blocks() {
        let raw = serde_json::json!({
            "content": [
                { "type": "thinking", "thinking": "..." },
                { "type": "text", "text": "Hello", "citations": [
                    { "type": "web_search_result_location", "url": "https://x.dev", "title": "X" }
                ]},
                { "type": "text", "text": " world" }
            ],
            "usage": { "input_tokens": 3, "output_tokens": 2 }
        });
        let out = AnthropicResponseTransformer.transform_prompt_response(&raw).unwrap();
        assert_eq!(out.text, "Hello world\n\nCitations:\n[1] X: https://x.dev");
        assert_eq!(out.usage, Some(TokenUsage::new(3, 2)));
    }
}
