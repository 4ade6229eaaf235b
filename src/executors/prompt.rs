//! Prompt executor

use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde_json::Value;
use std::sync::Arc;

use super::{HeaderBuilder, UrlBuilder};
use crate::auth::TokenProvider;
use crate::error::{DEFAULT_DEBUG_LOG_MAX_LENGTH, ProviderError, truncate_for_log};
use crate::resolver::ModelSet;
use crate::retry::RetryExecutor;
use crate::transformers::{RequestTransformer, ResponseTransformer};
use crate::types::{PromptRequest, PromptResponse};

/// Generic HTTP-based prompt executor that wires transformers and HTTP
pub struct HttpPromptExecutor {
    pub provider_id: String,
    pub http_client: reqwest::Client,
    pub request_transformer: Arc<dyn RequestTransformer>,
    pub response_transformer: Arc<dyn ResponseTransformer>,
    pub build_url: UrlBuilder,
    pub build_headers: HeaderBuilder,
    /// Bearer token source (Vertex AI)
    pub token_provider: Option<Arc<dyn TokenProvider>>,
    /// Rate-limit retry; `None` sends once
    pub retry: Option<RetryExecutor>,
    pub debug_log_max_length: usize,
}

impl HttpPromptExecutor {
    pub fn new(
        provider_id: impl Into<String>,
        http_client: reqwest::Client,
        request_transformer: Arc<dyn RequestTransformer>,
        response_transformer: Arc<dyn ResponseTransformer>,
        build_url: UrlBuilder,
        build_headers: HeaderBuilder,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            http_client,
            request_transformer,
            response_transformer,
            build_url,
            build_headers,
            token_provider: None,
            retry: None,
            debug_log_max_length: DEFAULT_DEBUG_LOG_MAX_LENGTH,
        }
    }

    pub fn with_token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    pub fn with_retry(mut self, retry: RetryExecutor) -> Self {
        self.retry = Some(retry);
        self
    }

    pub const fn with_debug_log_max_length(mut self, len: usize) -> Self {
        self.debug_log_max_length = len;
        self
    }

    /// Send `req`; `available` seeds suggestions when the backend reports an unknown model.
    pub async fn execute(
        &self,
        req: &PromptRequest,
        available: Option<&ModelSet>,
    ) -> Result<PromptResponse, ProviderError> {
        let body = self.request_transformer.transform_prompt(req)?;
        tracing::debug!(
            provider = %self.provider_id,
            model = %req.model,
            "Request body: {}",
            truncate_for_log(&body.to_string(), self.debug_log_max_length)
        );
        match &self.retry {
            Some(retry) => retry.execute(|| self.send_once(req, &body, available)).await,
            None => self.send_once(req, &body, available).await,
        }
    }

    async fn send_once(
        &self,
        req: &PromptRequest,
        body: &Value,
        available: Option<&ModelSet>,
    ) -> Result<PromptResponse, ProviderError> {
        let url = (self.build_url)(&req.model);
        let mut headers = (self.build_headers)()?;
        if let Some(tp) = &self.token_provider {
            let token = tp.token().await?;
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                ProviderError::ConfigurationError(format!("Invalid bearer token: {e}"))
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let resp = self
            .http_client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            tracing::debug!(
                provider = %self.provider_id,
                status = status.as_u16(),
                "Error body: {}",
                truncate_for_log(&text, self.debug_log_max_length)
            );
            return Err(ProviderError::from_http_response(
                &self.provider_id,
                &req.model,
                status.as_u16(),
                &text,
                available,
            ));
        }

        let json: Value = serde_json::from_str(&text).map_err(|e| {
            ProviderError::ParseError(format!("Failed to parse response JSON: {e}"))
        })?;
        let out = self.response_transformer.transform_prompt_response(&json)?;
        if out.text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse {
                provider: self.provider_id.clone(),
                model: req.model.clone(),
            });
        }
        Ok(out)
    }
}
