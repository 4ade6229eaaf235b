//! User-facing error helpers for CLI rendering.
//!
//! Errors render as a single line by default. Debug mode appends the category, the
//! remediation hints and the raw provider payload, truncated so that long bodies (which
//! may echo request headers) never reach the terminal in full.

use std::error::Error;

use super::types::{ErrorCategory, ProviderError};

/// Default truncation length for raw payloads in debug output
pub const DEFAULT_DEBUG_LOG_MAX_LENGTH: usize = 200;

/// Structured error summary for CLI consumption
#[derive(Debug, Clone)]
pub struct ErrorSummary {
    pub category: ErrorCategory,
    pub status: Option<u16>,
    pub message: String,
    pub suggestions: Vec<String>,
    pub details: Option<serde_json::Value>,
}

/// Summarize an error with remediation suggestions.
pub fn summarize_error(err: &ProviderError) -> ErrorSummary {
    ErrorSummary {
        category: err.category(),
        status: err.status_code(),
        message: err.to_string(),
        suggestions: suggest_fixes(err),
        details: err.details().cloned(),
    }
}

/// Suggest fixes based on the error category.
pub fn suggest_fixes(err: &ProviderError) -> Vec<String> {
    let mut tips = Vec::new();
    match err.root() {
        ProviderError::MissingApiKey { env_var, .. } => {
            tips.push(format!("Export {env_var} or add an apiKey to the config file"));
        }
        ProviderError::ModelNotFound { suggestions, .. } if suggestions.is_empty() => {
            tips.push("Check the model name against the provider's model list".to_string());
        }
        ProviderError::TokenLimitExceeded(_) => {
            tips.push("Narrow the packed context with --subdir or ignore patterns".to_string());
        }
        ProviderError::WebSearchUnsupported { .. } => {
            tips.push("Use perplexity or a gemini model for web search".to_string());
        }
        _ => {}
    }
    match err.category() {
        ErrorCategory::Authentication => tips.push("Verify the API key is valid".to_string()),
        ErrorCategory::RateLimit => {
            tips.push("Wait and retry, or switch to another provider".to_string())
        }
        ErrorCategory::Server => tips.push("Retry later; check the provider status page".to_string()),
        ErrorCategory::Configuration => {
            tips.push("Check environment variables and vibe-tools.config.json".to_string())
        }
        _ => {}
    }
    tips
}

/// Truncate to `max_len` characters, marking the cut.
pub fn truncate_for_log(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let head: String = text.chars().take(max_len).collect();
    format!("{head}... (truncated)")
}

/// Render an error for the terminal.
///
/// Without `debug` this is a single line. With `debug`, category, suggestions and the raw
/// provider payload (truncated to `max_len`) follow on subsequent lines.
pub fn render_error(err: &ProviderError, debug: bool, max_len: usize) -> String {
    if !debug {
        return err.to_string();
    }
    let summary = summarize_error(err);
    let mut lines = vec![summary.message.clone()];
    lines.push(format!("Category: {:?}", summary.category));
    if let Some(code) = summary.status {
        lines.push(format!("Status: {code}"));
    }
    for s in &summary.suggestions {
        lines.push(format!("  - {s}"));
    }
    if let Some(d) = &summary.details {
        lines.push(format!("Details: {}", truncate_for_log(&d.to_string(), max_len)));
    }
    let mut source = err.source();
    while let Some(cause) = source {
        lines.push(format!("Caused by: {}", truncate_for_log(&cause.to_string(), max_len)));
        source = cause.source();
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rendering_is_single_line() {
        let e = ProviderError::api_error(500, "boom");
        let out = render_error(&e, false, DEFAULT_DEBUG_LOG_MAX_LENGTH);
        assert!(!out.contains('\n'));
    }

    #[test]
    fn debug_rendering_truncates_payloads() {
        let long = "x".repeat(500);
        let e = ProviderError::ApiError {
            code: 400,
            message: "bad".into(),
            details: Some(serde_json::json!({ "raw": long })),
        };
        let out = render_error(&e, true, 50);
        assert!(out.contains("(truncated)"));
        assert!(out.lines().all(|l| l.chars().count() < 120));
    }

    #[test]
    fn missing_key_suggests_env_var() {
        let e = ProviderError::missing_api_key("gemini", "GEMINI_API_KEY");
        let tips = suggest_fixes(&e);
        assert!(tips.iter().any(|t| t.contains("GEMINI_API_KEY")));
    }
}
