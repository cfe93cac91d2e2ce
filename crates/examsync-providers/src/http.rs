//! HTTP plumbing shared by the Outlook and Google adapters.

use std::time::Duration;

use reqwest::Response;
use serde::de::DeserializeOwned;

use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};

/// Builds the HTTP client used by an adapter.
pub(crate) fn build_client(timeout: Duration) -> ProviderResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("examsync/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ProviderError::internal("failed to create HTTP client").with_source(e))
}

/// Maps a transport failure to a network error.
pub(crate) fn request_error(err: reqwest::Error, provider: &str) -> ProviderError {
    let message = if err.is_timeout() {
        "request timeout".to_string()
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        format!("request failed: {}", err)
    };
    ProviderError::network(message)
        .with_provider(provider)
        .with_source(err)
}

/// Passes successful responses through and classifies the rest.
///
/// The response body is kept in the error message so callers can log the
/// provider's own error payload.
pub(crate) async fn check_status(response: Response, provider: &str) -> ProviderResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();

    let code = ProviderErrorCode::from_status(status.as_u16());
    let mut message = format!("API error ({}): {}", status, body);
    if code == ProviderErrorCode::RateLimited
        && let Some(secs) = retry_after
    {
        message.push_str(&format!(", retry after {} seconds", secs));
    }
    let err = ProviderError::new(code, message);
    Err(err.with_provider(provider))
}

/// Reads and parses a JSON response body.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
    provider: &str,
) -> ProviderResult<T> {
    let body = response.text().await.map_err(|e| {
        ProviderError::network(format!("failed to read response: {}", e)).with_provider(provider)
    })?;

    serde_json::from_str(&body).map_err(|e| {
        ProviderError::invalid_response(format!("failed to parse response: {}", e))
            .with_provider(provider)
    })
}
