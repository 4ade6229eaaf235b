#![allow(dead_code)]

use std::time::Duration;

use vibe_tools::providers::ProviderSettings;
use vibe_tools::retry::{RetryExecutor, RetryPolicy};
use vibe_tools::types::ProviderKind;
use wiremock::MockServer;

pub const TEST_KEY: &str = "test-key";

/// Settings pointing `kind` at a mock server
pub fn settings(kind: ProviderKind, server: &MockServer) -> ProviderSettings {
    ProviderSettings::new(kind, TEST_KEY).with_base_url(server.uri())
}

/// Rate-limit retry with millisecond delays
pub fn fast_retry(max_attempts: u32) -> RetryExecutor {
    RetryExecutor::new(
        RetryPolicy::new()
            .with_max_attempts(max_attempts)
            .with_initial_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(5))
            .with_jitter_factor(0.0),
    )
}

/// JSON body of the `n`th request received by `server` at `path`
pub async fn request_body(server: &MockServer, path: &str, n: usize) -> serde_json::Value {
    let requests = server.received_requests().await.unwrap_or_default();
    let request = requests
        .iter()
        .filter(|r| r.url.path() == path)
        .nth(n)
        .unwrap_or_else(|| panic!("no request #{n} to {path}"));
    serde_json::from_slice(&request.body).unwrap()
}

pub fn openai_reply(text: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": text } }],
        "usage": { "prompt_tokens": 11, "completion_tokens": 3, "total_tokens": 14 }
    })
}

pub fn model_list(ids: &[&str]) -> serde_json::Value {
    serde_json::json!({ "data": ids.iter().map(|id| serde_json::json!({ "id": id })).collect::<Vec<_>>() })
}
