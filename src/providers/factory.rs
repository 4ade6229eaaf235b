//! Provider construction from the environment and config.

use secrecy::ExposeSecret;
use std::sync::Arc;

use super::anthropic::AnthropicProvider;
use super::gemini::GeminiProvider;
use super::openai_compatible::OpenAiCompatibleProvider;
use super::perplexity::PerplexityProvider;
use super::vertex::{DEFAULT_LOCATION, GoogleAuthMode, VertexBackend, VertexConfig};
use super::{LlmProvider, Provider, ProviderSettings};
use crate::auth::{
    AdcTokenProvider, ProjectDiscovery, ServiceAccountCredentials, ServiceAccountTokenProvider,
    TokenProvider,
};
use crate::config::Config;
use crate::env::EnvSnapshot;
use crate::error::ProviderError;
use crate::types::ProviderKind;

/// Build the adapter for `kind`.
///
/// Fails with [`ProviderError::MissingApiKey`] when no key is configured. For
/// [`ProviderKind::Gemini`], the shape of the key selects the Generative Language API or
/// Vertex AI.
pub fn create_provider(
    kind: ProviderKind,
    env: &EnvSnapshot,
    config: &Config,
) -> Result<Box<dyn Provider>, ProviderError> {
    let settings = ProviderSettings::from_env(kind, env, config)?;
    tracing::debug!("Creating {kind} provider");
    Ok(match kind {
        ProviderKind::Gemini => create_google_provider(settings, env)?,
        ProviderKind::Perplexity => Box::new(PerplexityProvider::create(settings)),
        ProviderKind::Anthropic => Box::new(AnthropicProvider::create(settings)),
        ProviderKind::OpenAi
        | ProviderKind::OpenRouter
        | ProviderKind::ModelBox
        | ProviderKind::Xai
        | ProviderKind::Groq => Box::new(OpenAiCompatibleProvider::create(kind, settings)?),
    })
}

fn create_google_provider(
    settings: ProviderSettings,
    env: &EnvSnapshot,
) -> Result<Box<dyn Provider>, ProviderError> {
    let mode = GoogleAuthMode::detect(settings.api_key.expose_secret());
    let (token_provider, key_file) = match mode {
        GoogleAuthMode::ApiKey => return Ok(Box::new(GeminiProvider::create(settings))),
        GoogleAuthMode::ServiceAccount(path) => {
            tracing::debug!("Using Vertex AI with service account {}", path.display());
            let creds = ServiceAccountCredentials::from_file(&path)?;
            (
                Arc::new(ServiceAccountTokenProvider::new(creds, settings.http.clone()))
                    as Arc<dyn TokenProvider>,
                Some(path),
            )
        }
        GoogleAuthMode::Adc => {
            tracing::debug!("Using Vertex AI with Application Default Credentials");
            (
                Arc::new(AdcTokenProvider::new(settings.http.clone(), env)) as Arc<dyn TokenProvider>,
                None,
            )
        }
    };

    let config = VertexConfig {
        location: env
            .var("GOOGLE_CLOUD_LOCATION")
            .unwrap_or(DEFAULT_LOCATION)
            .to_string(),
        project: None,
        host: None,
    };
    let discovery = ProjectDiscovery::new(env, key_file);
    let backend = VertexBackend::new(settings.clone(), config, token_provider, discovery);
    Ok(Box::new(LlmProvider::new(backend, &settings)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_reported_with_env_var() {
        let err = create_provider(ProviderKind::Groq, &EnvSnapshot::default(), &Config::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("GROQ_API_KEY"));
    }

    #[test]
    fn builds_each_kind() {
        let env = EnvSnapshot::from_pairs(ProviderKind::ALL.map(|k| (k.env_key(), "key")));
        for kind in ProviderKind::ALL {
            let provider = create_provider(kind, &env, &Config::default()).unwrap();
            assert_eq!(provider.kind(), kind);
        }
    }

    #[test]
    fn json_key_selects_vertex() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("sa.json");
        std::fs::write(
            &key,
            r#"{"type":"service_account","client_email":"a@b","private_key":"k","project_id":"p"}"#,
        )
        .unwrap();
        let env = EnvSnapshot::from_pairs([("GEMINI_API_KEY", key.to_string_lossy().to_string())]);
        let provider = create_provider(ProviderKind::Gemini, &env, &Config::default()).unwrap();
        assert_eq!(provider.name(), "vertex");
    }

    #[test]
    fn config_max_tokens_becomes_default() {
        let env = EnvSnapshot::from_pairs([("OPENAI_API_KEY", "k")]);
        let config: Config = serde_json::from_str(r#"{"openai":{"maxTokens":1234}}"#).unwrap();
        let provider = create_provider(ProviderKind::OpenAi, &env, &config).unwrap();
        assert_eq!(provider.default_max_tokens(), 1234);
    }
}
