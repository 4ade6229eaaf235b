mod support;

use support::*;
use vibe_tools::error::ProviderError;
use vibe_tools::providers::Provider;
use vibe_tools::providers::openai_compatible::OpenAiCompatibleProvider;
use vibe_tools::types::{ModelOptions, ProviderKind, ReasoningEffort};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_models(server: &MockServer, ids: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(model_list(ids)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn openai_request_shape_and_usage() {
    let server = MockServer::start().await;
    mount_models(&server, &["gpt-4o", "gpt-4o-mini"]).await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({ "model": "gpt-4o", "max_tokens": 256 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_reply("Hello!")))
        .expect(1)
        .mount(&server)
        .await;

    let provider =
        OpenAiCompatibleProvider::create(ProviderKind::OpenAi, settings(ProviderKind::OpenAi, &server))
            .unwrap();
    let text = provider
        .execute_prompt("Say hello", &ModelOptions::new("gpt-4o", 256))
        .await
        .unwrap();
    assert_eq!(text, "Hello!");

    let usage = provider.last_token_usage().unwrap();
    assert_eq!((usage.prompt_tokens, usage.completion_tokens), (11, 3));

    let body = request_body(&server, "/chat/completions", 0).await;
    assert_eq!(body["messages"][0]["role"], "system");
    assert!(body["messages"][0]["content"]
        .as_str()
        .unwrap()
        .starts_with("Today's date is "));
    assert_eq!(body["messages"][1]["content"], "Say hello");
    assert!(body.get("reasoning_effort").is_none());
}

#[tokio::test]
async fn openai_reasoning_models_use_completion_tokens() {
    let server = MockServer::start().await;
    mount_models(&server, &["o3", "gpt-4o"]).await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_reply("thought")))
        .mount(&server)
        .await;

    let provider =
        OpenAiCompatibleProvider::create(ProviderKind::OpenAi, settings(ProviderKind::OpenAi, &server))
            .unwrap();
    let options = ModelOptions::new("o3", 1000).with_reasoning_effort(ReasoningEffort::High);
    provider.execute_prompt("think", &options).await.unwrap();

    let body = request_body(&server, "/chat/completions", 0).await;
    assert_eq!(body["max_completion_tokens"], 1000);
    assert!(body.get("max_tokens").is_none());
    assert_eq!(body["messages"][0]["role"], "developer");
    assert_eq!(body["reasoning_effort"], "high");
}

#[tokio::test]
async fn reasoning_effort_is_dropped_for_unsupported_models() {
    let server = MockServer::start().await;
    mount_models(&server, &["gpt-4o"]).await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_reply("ok")))
        .mount(&server)
        .await;

    let provider =
        OpenAiCompatibleProvider::create(ProviderKind::OpenAi, settings(ProviderKind::OpenAi, &server))
            .unwrap();
    let options = ModelOptions::new("gpt-4o", 100).with_reasoning_effort(ReasoningEffort::Low);
    provider.execute_prompt("q", &options).await.unwrap();

    let body = request_body(&server, "/chat/completions", 0).await;
    assert!(body.get("reasoning_effort").is_none());
}

#[tokio::test]
async fn openrouter_sends_attribution_headers_and_resolves_prefix() {
    let server = MockServer::start().await;
    mount_models(&server, &["openai/gpt-4o", "anthropic/claude-sonnet-4"]).await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("x-title", "vibe-tools"))
        .and(body_partial_json(serde_json::json!({ "model": "openai/gpt-4o" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_reply("routed")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiCompatibleProvider::create(
        ProviderKind::OpenRouter,
        settings(ProviderKind::OpenRouter, &server),
    )
    .unwrap();
    let text = provider
        .execute_prompt("q", &ModelOptions::new("gpt-4o", 100))
        .await
        .unwrap();
    assert_eq!(text, "routed");
}

#[tokio::test]
async fn router_web_search_substitutes_perplexity_and_formats_citations() {
    let server = MockServer::start().await;
    mount_models(&server, &["openai/gpt-4o", "perplexity/sonar-pro"]).await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({ "model": "perplexity/sonar-pro" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "content": "Rust 1.90 is out." } }],
            "citations": ["https://blog.rust-lang.org"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiCompatibleProvider::create(
        ProviderKind::ModelBox,
        settings(ProviderKind::ModelBox, &server),
    )
    .unwrap();
    let options = ModelOptions::new("openai/gpt-4o", 100).with_web_search(true);
    let text = provider.execute_prompt("latest rust", &options).await.unwrap();
    assert_eq!(
        text,
        "Rust 1.90 is out.\n\nCitations:\n[1] https://blog.rust-lang.org"
    );
}

#[tokio::test]
async fn unknown_model_fails_before_sending_with_suggestions() {
    let server = MockServer::start().await;
    mount_models(&server, &["gpt-4o", "gpt-4o-mini", "o3"]).await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_reply("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let provider =
        OpenAiCompatibleProvider::create(ProviderKind::OpenAi, settings(ProviderKind::OpenAi, &server))
            .unwrap();
    let err = provider
        .execute_prompt("q", &ModelOptions::new("gpt-4x", 100))
        .await
        .unwrap_err();
    match err {
        ProviderError::ModelNotFound {
            provider,
            model,
            suggestions,
        } => {
            assert_eq!(provider, "openai");
            assert_eq!(model, "gpt-4x");
            assert_eq!(suggestions.first().map(String::as_str), Some("gpt-4o"));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn backend_404_becomes_model_not_found() {
    let server = MockServer::start().await;
    mount_models(&server, &["gpt-4o", "gpt-4o-mini"]).await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": { "message": "The model `gpt-4o-mini` does not exist", "code": "model_not_found" }
        })))
        .mount(&server)
        .await;

    let provider =
        OpenAiCompatibleProvider::create(ProviderKind::OpenAi, settings(ProviderKind::OpenAi, &server))
            .unwrap();
    let err = provider
        .execute_prompt("q", &ModelOptions::new("gpt-4o-mini", 100))
        .await
        .unwrap_err();
    assert!(err.is_model_not_found());
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn blank_content_is_an_empty_response() {
    let server = MockServer::start().await;
    mount_models(&server, &["llama-3.3-70b-versatile"]).await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_reply("   ")))
        .mount(&server)
        .await;

    let provider =
        OpenAiCompatibleProvider::create(ProviderKind::Groq, settings(ProviderKind::Groq, &server))
            .unwrap();
    let err = provider
        .execute_prompt("q", &ModelOptions::new("llama-3.3-70b-versatile", 100))
        .await
        .unwrap_err();
    assert!(matches!(err.root(), ProviderError::EmptyResponse { .. }));
    assert!(err.to_string().starts_with("groq (llama-3.3-70b-versatile)"));
}

#[tokio::test]
async fn failed_discovery_passes_model_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({ "model": "custom-model" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_reply("fine")))
        .expect(1)
        .mount(&server)
        .await;

    let provider =
        OpenAiCompatibleProvider::create(ProviderKind::OpenAi, settings(ProviderKind::OpenAi, &server))
            .unwrap();
    let text = provider
        .execute_prompt("q", &ModelOptions::new("custom-model", 100))
        .await
        .unwrap();
    assert_eq!(text, "fine");
    assert!(provider.available_models().await.is_none());
}

fn openai(server: &MockServer, override_checks: bool) -> OpenAiCompatibleProvider {
    let settings = settings(ProviderKind::OpenAi, server).with_override_safety_checks(override_checks);
    OpenAiCompatibleProvider::create(ProviderKind::OpenAi, settings).unwrap()
}

async fn mount_chat(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_reply("ok")))
        .mount(server)
        .await;
}

#[tokio::test]
async fn web_search_substitutes_search_model_without_override() {
    let server = MockServer::start().await;
    mount_models(&server, &["gpt-4.1", "gpt-4o-search-preview"]).await;
    mount_chat(&server).await;

    let provider = openai(&server, false);
    assert!(!provider.supports_web_search("gpt-4.1").supported);
    let options = ModelOptions::new("gpt-4.1", 100).with_web_search(true);
    provider.execute_prompt("news", &options).await.unwrap();

    let body = request_body(&server, "/chat/completions", 0).await;
    assert_eq!(body["model"], "gpt-4o-search-preview");
    assert_eq!(body["web_search_options"], serde_json::json!({}));
}

#[tokio::test]
async fn override_sends_requested_model_for_web_search() {
    let server = MockServer::start().await;
    mount_models(&server, &["gpt-4.1", "gpt-4o-search-preview"]).await;
    mount_chat(&server).await;

    let provider = openai(&server, true);
    assert!(provider.supports_web_search("gpt-4.1").supported);
    let options = ModelOptions::new("gpt-4.1", 100).with_web_search(true);
    provider.execute_prompt("news", &options).await.unwrap();

    let body = request_body(&server, "/chat/completions", 0).await;
    assert_eq!(body["model"], "gpt-4.1");
    assert_eq!(body["web_search_options"], serde_json::json!({}));
}

#[tokio::test]
async fn override_forwards_reasoning_effort_to_any_model() {
    let server = MockServer::start().await;
    mount_models(&server, &["gpt-4o"]).await;
    mount_chat(&server).await;

    let options = ModelOptions::new("gpt-4o", 100).with_reasoning_effort(ReasoningEffort::Low);
    openai(&server, true).execute_prompt("q", &options).await.unwrap();
    openai(&server, false).execute_prompt("q", &options).await.unwrap();

    let overridden = request_body(&server, "/chat/completions", 0).await;
    assert_eq!(overridden["reasoning_effort"], "low");
    let gated = request_body(&server, "/chat/completions", 1).await;
    assert!(gated.get("reasoning_effort").is_none());
}
