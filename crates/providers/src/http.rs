//! HTTP plumbing shared by the backends.

use pokerag_core::error::ProviderError;
use std::time::Duration;
use tracing::warn;

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::NotConfigured(format!("failed to create HTTP client: {e}")))
}

pub(crate) fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Map non-success statuses to typed errors; pass successful responses through.
pub(crate) async fn check_status(
    response: reqwest::Response,
    model: &str,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status().as_u16();
    match status {
        200..=299 => Ok(response),
        429 => {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            Err(ProviderError::RateLimited { retry_after_secs })
        }
        401 | 403 => Err(ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        )),
        404 => Err(ProviderError::ModelNotFound(model.to_string())),
        _ => {
            let body = response.text().await.unwrap_or_default();
            warn!(status, body = %body, "Provider returned error");
            Err(ProviderError::ApiError {
                status_code: status,
                message: body,
            })
        }
    }
}

pub(crate) fn parse_error(what: &str, e: impl std::fmt::Display) -> ProviderError {
    ProviderError::ApiError {
        status_code: 200,
        message: format!("Failed to parse {what}: {e}"),
    }
}
