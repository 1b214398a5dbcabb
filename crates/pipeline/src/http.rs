//! Shared HTTP plumbing for provider adapters

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};

use crate::PipelineError;

pub(crate) fn client(timeout: Duration) -> Result<Client, PipelineError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PipelineError::Configuration(format!("Failed to create HTTP client: {}", e)))
}

/// Send and turn transport failures and non-success statuses into errors
pub(crate) async fn send(
    provider: &'static str,
    request: RequestBuilder,
) -> Result<Response, PipelineError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            PipelineError::Timeout(provider)
        } else {
            PipelineError::Network {
                provider,
                message: e.to_string(),
            }
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(provider, status = status.as_u16(), "Provider request failed");
        return Err(PipelineError::Status {
            provider,
            status,
            body,
        });
    }

    Ok(response)
}

pub(crate) async fn json<T: serde::de::DeserializeOwned>(
    provider: &'static str,
    response: Response,
) -> Result<T, PipelineError> {
    response
        .json()
        .await
        .map_err(|e| PipelineError::InvalidResponse {
            provider,
            message: e.to_string(),
        })
}

pub(crate) async fn bytes(
    provider: &'static str,
    response: Response,
) -> Result<Vec<u8>, PipelineError> {
    let body = response.bytes().await.map_err(|e| PipelineError::Network {
        provider,
        message: e.to_string(),
    })?;
    if body.is_empty() {
        return Err(PipelineError::InvalidResponse {
            provider,
            message: "empty audio body".to_string(),
        });
    }
    Ok(body.to_vec())
}

pub(crate) fn trim_url(url: &str) -> &str {
    url.trim_end_matches('/')
}
