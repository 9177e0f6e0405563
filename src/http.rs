//! Shared plumbing for the blocking HTTP clients.

use crate::error::{AnchorcastError, AnchorcastResult};
use serde::de::DeserializeOwned;
use std::time::Duration;
use ureq::http::Response;
use ureq::{Agent, Body};

/// Upper bound for buffered JSON/audio bodies. Base64 portraits run a few MB.
const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// Longest response body excerpt kept in an error message.
const ERROR_BODY_EXCERPT: usize = 2048;

/// Build an agent that reports non-2xx statuses as responses, so callers can
/// attach the provider's error body to the failure.
pub fn agent(timeout: Duration) -> Agent {
    let config = Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build();
    Agent::new_with_config(config)
}

/// Turn a transport result into a 2xx response or a typed error.
pub fn expect_success(
    provider: &'static str,
    result: Result<Response<Body>, ureq::Error>,
) -> AnchorcastResult<Response<Body>> {
    let mut response = result.map_err(|e| AnchorcastError::Transport {
        provider,
        message: e.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.body_mut().read_to_string().unwrap_or_default();
        let body: String = body.chars().take(ERROR_BODY_EXCERPT).collect();
        return Err(AnchorcastError::Http {
            provider,
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

pub fn read_bytes(provider: &'static str, response: Response<Body>) -> AnchorcastResult<Vec<u8>> {
    response
        .into_body()
        .with_config()
        .limit(MAX_BODY_BYTES)
        .read_to_vec()
        .map_err(|e| AnchorcastError::Transport {
            provider,
            message: format!("failed to read response body: {e}"),
        })
}

pub fn read_json<T: DeserializeOwned>(
    provider: &'static str,
    response: Response<Body>,
) -> AnchorcastResult<T> {
    let bytes = read_bytes(provider, response)?;
    serde_json::from_slice(&bytes).map_err(|e| AnchorcastError::MalformedResponse {
        provider,
        message: e.to_string(),
    })
}
