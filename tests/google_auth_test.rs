mod support;

use std::sync::Arc;

use support::*;
use vibe_tools::auth::{
    ProjectDiscovery, ServiceAccountCredentials, ServiceAccountTokenProvider, StaticTokenProvider,
    TokenProvider,
};
use vibe_tools::env::EnvSnapshot;
use vibe_tools::error::ProviderError;
use vibe_tools::providers::vertex::{VertexBackend, VertexConfig};
use vibe_tools::providers::{LlmProvider, Provider};
use vibe_tools::types::{ModelOptions, ProviderKind};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VERTEX_GENERATE: &str =
    "/v1/projects/test-project/locations/us-central1/publishers/google/models/gemini-2.5-pro:generateContent";

fn vertex(server: &MockServer, token: Arc<dyn TokenProvider>) -> LlmProvider<VertexBackend> {
    let settings = settings(ProviderKind::Gemini, server);
    let config = VertexConfig {
        project: Some("test-project".into()),
        host: Some(server.uri()),
        ..Default::default()
    };
    let discovery = ProjectDiscovery::new(&EnvSnapshot::default(), None).with_gcloud(false);
    let backend =
        VertexBackend::new(settings.clone(), config, token, discovery).with_retry(fast_retry(1));
    LlmProvider::new(backend, &settings)
}

#[tokio::test]
async fn vertex_uses_bearer_token_and_project_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta1/publishers/google/models"))
        .and(header("authorization", "Bearer vertex-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "publisherModels": [
                { "name": "publishers/google/models/gemini-2.5-pro" },
                { "name": "publishers/google/models/gemini-2.5-flash" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(VERTEX_GENERATE))
        .and(header("authorization", "Bearer vertex-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "from vertex" }] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = vertex(&server, Arc::new(StaticTokenProvider::new("vertex-token")));
    assert_eq!(provider.name(), "vertex");
    let text = provider
        .execute_prompt("q", &ModelOptions::new("gemini-2.5-pro", 100))
        .await
        .unwrap();
    assert_eq!(text, "from vertex");
    assert!(provider.available_models().await.unwrap().contains("gemini-2.5-flash"));
}

#[tokio::test]
async fn vertex_errors_carry_provider_context() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta1/publishers/google/models"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(VERTEX_GENERATE))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": { "code": 403, "message": "Permission denied on project" }
        })))
        .mount(&server)
        .await;

    let provider = vertex(&server, Arc::new(StaticTokenProvider::new("t")));
    let err = provider
        .execute_prompt("q", &ModelOptions::new("gemini-2.5-pro", 100))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(403));
    assert!(err.to_string().starts_with("vertex (gemini-2.5-pro): "));
}

#[tokio::test]
async fn service_account_token_is_exchanged_once_and_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("assertion=test-assertion"))
        .and(body_string_contains("grant-type%3Ajwt-bearer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "ya29.test-token",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let creds = ServiceAccountCredentials {
        client_email: "svc@test.iam.gserviceaccount.com".into(),
        private_key: "unused".into(),
        token_uri: Some(format!("{}/token", server.uri())),
        project_id: Some("test-project".into()),
    };
    let provider = ServiceAccountTokenProvider::new(creds, reqwest::Client::new())
        .with_assertion_override("test-assertion");
    assert_eq!(provider.token().await.unwrap(), "ya29.test-token");
    assert_eq!(provider.token().await.unwrap(), "ya29.test-token");
}

#[tokio::test]
async fn token_endpoint_failure_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant"
        })))
        .mount(&server)
        .await;

    let creds = ServiceAccountCredentials {
        client_email: "svc@test.iam.gserviceaccount.com".into(),
        private_key: "unused".into(),
        token_uri: Some(format!("{}/token", server.uri())),
        project_id: None,
    };
    let provider = ServiceAccountTokenProvider::new(creds, reqwest::Client::new())
        .with_assertion_override("test-assertion");
    let err = provider.token().await.unwrap_err();
    assert!(!matches!(err, ProviderError::RateLimitError(_)));
    assert_eq!(err.status_code(), Some(400));
    assert_eq!(err.details().unwrap()["error"], "invalid_grant");
}

#[tokio::test]
async fn plain_text_token_error_body_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("signature mismatch\n"))
        .mount(&server)
        .await;

    let creds = ServiceAccountCredentials {
        client_email: "svc@test.iam.gserviceaccount.com".into(),
        private_key: "unused".into(),
        token_uri: Some(format!("{}/token", server.uri())),
        project_id: None,
    };
    let provider = ServiceAccountTokenProvider::new(creds, reqwest::Client::new())
        .with_assertion_override("test-assertion");
    let err = provider.token().await.unwrap_err();
    assert_eq!(
        err.details(),
        Some(&serde_json::Value::String("signature mismatch".into()))
    );
}

#[tokio::test]
async fn project_is_discovered_from_metadata_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/project/project-id"))
        .and(header("metadata-flavor", "Google"))
        .respond_with(ResponseTemplate::new(200).set_body_string("meta-project"))
        .mount(&server)
        .await;

    let discovery = ProjectDiscovery::new(&EnvSnapshot::default(), None)
        .with_credentials_path(None)
        .with_metadata_root(Some(server.uri()))
        .with_gcloud(false);
    let project = discovery.discover(&reqwest::Client::new()).await.unwrap();
    assert_eq!(project, "meta-project");
}

#[tokio::test]
async fn project_env_var_wins() {
    let env = EnvSnapshot::from_pairs([("GOOGLE_CLOUD_PROJECT", "env-project")]);
    let discovery = ProjectDiscovery::new(&env, None)
        .with_metadata_root(None)
        .with_gcloud(false);
    assert_eq!(
        discovery.discover(&reqwest::Client::new()).await.unwrap(),
        "env-project"
    );
}
