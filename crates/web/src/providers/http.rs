//! Shared HTTP plumbing for providers

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

use docqa_core::ProviderError;

use crate::WebError;

/// Client with the configured user agent and a hard request timeout
pub(crate) fn build_client(user_agent: &str, timeout: Duration) -> Result<Client, WebError> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
        .map_err(|e| WebError::Client(format!("Failed to create HTTP client: {}", e)))
}

pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout {
            after_ms: timeout.as_millis() as u64,
        }
    } else if let Some(status) = err.status() {
        ProviderError::Status(status.as_u16())
    } else {
        ProviderError::Transport(err.to_string())
    }
}

async fn send(
    request: RequestBuilder,
    timeout: Duration,
) -> Result<reqwest::Response, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Status(status.as_u16()));
    }
    Ok(response)
}

/// Send `request` and decode a JSON body
pub(crate) async fn get_json<T: DeserializeOwned>(
    request: RequestBuilder,
    timeout: Duration,
) -> Result<T, ProviderError> {
    let body = send(request, timeout)
        .await?
        .bytes()
        .await
        .map_err(|e| transport_error(e, timeout))?;

    serde_json::from_slice(&body).map_err(|e| ProviderError::Malformed(e.to_string()))
}

/// Send `request` and return the body as text
pub(crate) async fn get_text(
    request: RequestBuilder,
    timeout: Duration,
) -> Result<String, ProviderError> {
    send(request, timeout)
        .await?
        .text()
        .await
        .map_err(|e| transport_error(e, timeout))
}
