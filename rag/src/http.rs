use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::from_str;

use crate::error::{classify_text, ProviderError};

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// POST a JSON body with bearer auth and decode the JSON reply.
///
/// Every failure comes back as a classified [`ProviderError`].
pub fn post_json<T: DeserializeOwned, B: Serialize>(
    url: &str,
    api_key: &str,
    timeout: Duration,
    body: &B,
) -> Result<T, ProviderError> {
    let client = Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::unknown(e.to_string()))?;
    let resp = client
        .post(url)
        .bearer_auth(api_key)
        .header(CONTENT_TYPE, "application/json")
        .json(body)
        .send()
        .map_err(|e| {
            let text = e.to_string();
            ProviderError::new(classify_text(&text), format!("POST {url} failed: {text}"))
        })?;
    let status = resp.status();
    let text = resp.text().unwrap_or_default();
    if !status.is_success() {
        return Err(error_from_response(status.as_u16(), &text));
    }
    from_str::<T>(&text)
        .map_err(|e| ProviderError::unknown(format!("POST {url} decode failed: {e} | {text}")))
}

/// Turn a non-success reply into a classified error. OpenAI-style bodies
/// carry the message under `error.message`; anything else is used as is.
pub(crate) fn error_from_response(status: u16, body: &str) -> ProviderError {
    let detail = from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());
    ProviderError::from_status(status, &detail)
}
