//! Executors Layer
//!
//! HTTP orchestration that wires transformers with provider endpoints. Non-success
//! responses are classified into [`ProviderError`](crate::error::ProviderError) variants
//! here, once, at the HTTP boundary.

pub mod models;
pub mod prompt;

use reqwest::header::HeaderMap;

use crate::error::ProviderError;

/// Builds the static headers of a request (API keys, versions)
pub type HeaderBuilder = Box<dyn Fn() -> Result<HeaderMap, ProviderError> + Send + Sync>;

/// Builds the endpoint URL for a resolved model
pub type UrlBuilder = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Header map from `(name, value)` pairs, rejecting values that are not valid header text
pub fn header_map<'a, I>(pairs: I) -> Result<HeaderMap, ProviderError>
where
    I: IntoIterator<Item = (&'static str, &'a str)>,
{
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let value = reqwest::header::HeaderValue::from_str(value).map_err(|e| {
            ProviderError::ConfigurationError(format!("Invalid value for header {name}: {e}"))
        })?;
        headers.insert(name, value);
    }
    Ok(headers)
}
