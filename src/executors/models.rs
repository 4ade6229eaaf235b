//! Model discovery requests

use reqwest::header::HeaderMap;
use serde_json::Value;

use crate::error::ProviderError;
use crate::resolver::ModelSet;

/// GET a JSON document from a discovery endpoint
pub async fn get_json(
    http: &reqwest::Client,
    url: &str,
    headers: HeaderMap,
    provider: &str,
) -> Result<Value, ProviderError> {
    let resp = http.get(url).headers(headers).send().await?;
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        return Err(ProviderError::ApiError {
            code: status.as_u16(),
            message: format!("{provider} model listing failed"),
            details: serde_json::from_str(&text).ok(),
        });
    }
    Ok(serde_json::from_str(&text)?)
}

/// Collect `data[].id` (OpenAI-compatible listing shape)
pub fn ids_from_data(listing: &Value) -> ModelSet {
    listing
        .get("data")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|m| m.get("id").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}
