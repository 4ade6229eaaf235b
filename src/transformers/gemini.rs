//! Google `generateContent` wire format (Generative Language API and Vertex AI).

use serde_json::{Value, json};

use super::{Citation, RequestTransformer, ResponseTransformer, append_citations, u64_at};
use crate::error::ProviderError;
use crate::types::{PromptRequest, PromptResponse, TokenUsage};

#[derive(Debug, Clone)]
pub struct GeminiRequestTransformer {
    provider_id: String,
}

impl GeminiRequestTransformer {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
        }
    }
}

impl RequestTransformer for GeminiRequestTransformer {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn transform_prompt(&self, req: &PromptRequest) -> Result<Value, ProviderError> {
        let mut generation_config = json!({ "maxOutputTokens": req.max_tokens });
        if let Some(effort) = req.reasoning_effort {
            // Thinking counts against maxOutputTokens; keep half for the answer
            let budget = effort.thinking_budget().min(req.max_tokens / 2);
            if budget > 0 {
                generation_config["thinkingConfig"] = json!({ "thinkingBudget": budget });
            }
        }

        let mut body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": req.prompt }] }],
            "systemInstruction": { "parts": [{ "text": req.system_prompt }] },
            "generationConfig": generation_config,
        });
        if req.web_search {
            body["tools"] = json!([{ "google_search": {} }]);
        }
        Ok(body)
    }
}

#[derive(Debug, Clone)]
pub struct GeminiResponseTransformer {
    provider_id: String,
}

impl GeminiResponseTransformer {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
        }
    }
}

impl ResponseTransformer for GeminiResponseTransformer {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn transform_prompt_response(&self, raw: &Value) -> Result<PromptResponse, ProviderError> {
        let candidate = raw
            .get("candidates")
            .and_then(|c| c.get(0))
            .ok_or_else(|| {
                let reason = raw
                    .pointer("/promptFeedback/blockReason")
                    .and_then(Value::as_str)
                    .map(|r| format!(" (blocked: {r})"))
                    .unwrap_or_default();
                ProviderError::ParseError(format!(
                    "{} response has no candidates{reason}",
                    self.provider_id
                ))
            })?;

        let content: String = candidate
            .pointer("/content/parts")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter(|p| !p.get("thought").and_then(Value::as_bool).unwrap_or(false))
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect();

        let (citations, queries) = grounding_sources(candidate.get("groundingMetadata"));
        let text = if content.trim().is_empty() {
            String::new()
        } else {
            append_citations(&content, &citations, &queries)
        };

        let usage = raw.get("usageMetadata").map(|u| {
            TokenUsage::new(u64_at(u, "promptTokenCount"), u64_at(u, "candidatesTokenCount"))
        });
        Ok(PromptResponse { text, usage })
    }
}

/// Citations and search queries from `groundingMetadata`
fn grounding_sources(metadata: Option<&Value>) -> (Vec<Citation>, Vec<String>) {
    let Some(md) = metadata else {
        return (Vec::new(), Vec::new());
    };
    let citations = md
        .get("groundingChunks")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|chunk| {
            let web = chunk.get("web")?;
            let url = web.get("uri")?.as_str()?;
            let title = web.get("title").and_then(Value::as_str).map(str::to_string);
            Some(Citation::new(url, title))
        })
        .collect();
    let queries = md
        .get("webSearchQueries")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|q| q.as_str().map(str::to_string))
        .collect();
    (citations, queries)
}
