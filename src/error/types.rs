//! Core error types.

use thiserror::Error;

use crate::resolver::similarity::rank_similar_models;

/// Substrings that identify a "model not found" response body across backends.
const MODEL_NOT_FOUND_SIGNATURES: &[&str] = &[
    "model_not_found",
    "model not found",
    "does not exist",
    "is not found for api version",
    "unknown model",
    "invalid model",
    "no such model",
    "not a valid model",
];

/// Substrings that identify rate limiting or quota exhaustion.
const RATE_LIMIT_SIGNATURES: &[&str] = &[
    "resource exhausted",
    "resource_exhausted",
    "resource has been exhausted",
    "rate limit",
    "rate_limit",
    "too many requests",
    "quota",
];

/// Every failure a provider adapter or command can surface.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// No API key configured for the provider
    #[error("No API key found for {provider}. Set {env_var} in your environment")]
    MissingApiKey { provider: String, env_var: String },

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The requested model is unknown to the backend
    #[error(
        "Model '{model}' not found for {provider}.{}",
        suggestion_suffix(.suggestions)
    )]
    ModelNotFound {
        provider: String,
        model: String,
        suggestions: Vec<String>,
    },

    /// Non-success response from the backend that is not otherwise classified
    #[error("API error {code}: {message}")]
    ApiError {
        code: u16,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Rate limiting or quota exhaustion (the only retryable kind)
    #[error("Rate limit exceeded: {0}")]
    RateLimitError(String),

    /// Transport failure before a response was received
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Request or command deadline elapsed
    #[error("Request timed out: {0}")]
    TimeoutError(String),

    /// Backend answered successfully but without usable content
    #[error("Empty response from {provider} for model {model}")]
    EmptyResponse { provider: String, model: String },

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Token count exceeds the provider's hard limit
    #[error("{0}")]
    TokenLimitExceeded(String),

    /// Web search requested for a model with no search support and no substitute
    #[error("Web search is not supported by {provider} model {model}: {reason}")]
    WebSearchUnsupported {
        provider: String,
        model: String,
        reason: String,
    },

    /// Every preference-ordered provider failed or none had a key
    #[error("No provider available for {command}.{}", attempt_suffix(.attempts))]
    NoProviderAvailable {
        command: String,
        attempts: Vec<String>,
    },

    /// Invalid caller-supplied parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Internal invariant violation
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Any of the above, decorated with the provider and model in flight
    #[error("{provider} ({model}): {source}")]
    Provider {
        provider: String,
        model: String,
        #[source]
        source: Box<ProviderError>,
    },
}

fn suggestion_suffix(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" Did you mean one of: {}?", suggestions.join(", "))
    }
}

fn attempt_suffix(attempts: &[String]) -> String {
    if attempts.is_empty() {
        " Set an API key for at least one supported provider".to_string()
    } else {
        format!(" Tried: {}", attempts.join("; "))
    }
}

/// Coarse error category used for rendering and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Authentication,
    ModelResolution,
    RateLimit,
    Client,
    Server,
    Network,
    Parsing,
    Validation,
    Unsupported,
    Unavailable,
    Internal,
}

impl ProviderError {
    /// Create an API error from a status code and message
    pub fn api_error(code: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a missing-key error for the given provider and environment variable
    pub fn missing_api_key(provider: impl Into<String>, env_var: impl Into<String>) -> Self {
        Self::MissingApiKey {
            provider: provider.into(),
            env_var: env_var.into(),
        }
    }

    /// Create a model-not-found error, ranking suggestions from the available set
    pub fn model_not_found<'a, I>(provider: impl Into<String>, model: &str, available: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        Self::ModelNotFound {
            provider: provider.into(),
            model: model.to_string(),
            suggestions: rank_similar_models(model, available),
        }
    }

    /// Decorate with provider/model context. Already-decorated errors are returned as-is.
    pub fn with_context(self, provider: &str, model: &str) -> Self {
        match self {
            Self::Provider { .. }
            | Self::ModelNotFound { .. }
            | Self::MissingApiKey { .. }
            | Self::NoProviderAvailable { .. } => self,
            other => Self::Provider {
                provider: provider.to_string(),
                model: model.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, with any provider decoration removed
    pub fn root(&self) -> &ProviderError {
        match self {
            Self::Provider { source, .. } => source.root(),
            other => other,
        }
    }

    /// Classify a non-success HTTP response at the adapter boundary.
    ///
    /// `available` is the provider's discovered model set, when one exists; it seeds the
    /// suggestion list of a model-not-found error.
    pub fn from_http_response<'a, I>(
        provider: &str,
        model: &str,
        status: u16,
        body: &str,
        available: Option<I>,
    ) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let details: Option<serde_json::Value> = serde_json::from_str(body).ok();
        let message = details
            .as_ref()
            .and_then(extract_error_message)
            .unwrap_or_else(|| body.trim().to_string());
        let haystack = format!("{} {}", message, body).to_lowercase();

        if status == 429 || contains_any(&haystack, RATE_LIMIT_SIGNATURES) {
            return Self::RateLimitError(format!("{status}: {message}"));
        }

        if status == 404 || contains_any(&haystack, MODEL_NOT_FOUND_SIGNATURES) {
            let suggestions = match available {
                Some(models) => rank_similar_models(model, models),
                None => Vec::new(),
            };
            return Self::ModelNotFound {
                provider: provider.to_string(),
                model: model.to_string(),
                suggestions,
            };
        }

        Self::ApiError {
            code: status,
            message,
            details,
        }
    }

    /// Category for presentation and retry decisions
    pub fn category(&self) -> ErrorCategory {
        match self.root() {
            Self::MissingApiKey { .. } | Self::ConfigurationError(_) => {
                ErrorCategory::Configuration
            }
            Self::ModelNotFound { .. } => ErrorCategory::ModelResolution,
            Self::RateLimitError(_) => ErrorCategory::RateLimit,
            Self::ApiError { code, message, .. } => match code {
                429 => ErrorCategory::RateLimit,
                _ if contains_any(&message.to_lowercase(), RATE_LIMIT_SIGNATURES) => {
                    ErrorCategory::RateLimit
                }
                401 | 403 => ErrorCategory::Authentication,
                400..=499 => ErrorCategory::Client,
                _ => ErrorCategory::Server,
            },
            Self::HttpError(_) | Self::TimeoutError(_) => ErrorCategory::Network,
            Self::EmptyResponse { .. } | Self::ParseError(_) => ErrorCategory::Parsing,
            Self::TokenLimitExceeded(_) | Self::InvalidParameter(_) => ErrorCategory::Validation,
            Self::WebSearchUnsupported { .. } => ErrorCategory::Unsupported,
            Self::NoProviderAvailable { .. } => ErrorCategory::Unavailable,
            Self::InternalError(_) | Self::Provider { .. } => ErrorCategory::Internal,
        }
    }

    /// HTTP status code, if the error carries one
    pub fn status_code(&self) -> Option<u16> {
        match self.root() {
            Self::ApiError { code, .. } => Some(*code),
            Self::RateLimitError(_) => Some(429),
            Self::ModelNotFound { .. } => Some(404),
            _ => None,
        }
    }

    /// Only rate-limit and quota signatures are retried; everything else propagates at once.
    pub fn is_retryable(&self) -> bool {
        matches!(self.category(), ErrorCategory::RateLimit)
    }

    /// Whether this is a model-not-found error
    pub fn is_model_not_found(&self) -> bool {
        matches!(self.root(), Self::ModelNotFound { .. })
    }

    /// Raw provider payload, when one was captured
    pub fn details(&self) -> Option<&serde_json::Value> {
        match self.root() {
            Self::ApiError { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Pull the human-readable message out of the common error envelopes:
/// `{"error": {"message": ..}}`, `{"error": ".."}`, `{"message": ..}`, `[{"error": {..}}]`.
fn extract_error_message(value: &serde_json::Value) -> Option<String> {
    if let Some(first) = value.as_array().and_then(|a| a.first()) {
        return extract_error_message(first);
    }
    let error = value.get("error");
    error
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .or_else(|| error.and_then(|e| e.as_str()))
        .or_else(|| value.get("message").and_then(|m| m.as_str()))
        .or_else(|| value.get("detail").and_then(|m| m.as_str()))
        .map(|s| s.to_string())
}
