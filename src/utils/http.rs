use std::time::Duration;

use reqwest::Client;

use crate::error::DecodeError;

/// User-Agent presented to subscription providers. Some panels only hand out
/// the full node list to browser-like agents.
const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Fetches a subscription payload from a remote URL.
///
/// The request is bounded by `timeout`; dropping the returned future cancels
/// the in-flight request. Any transport or non-2xx failure is reported as
/// `DecodeError::FetchFailed`.
pub async fn fetch_subscription(url: &str, timeout: Duration) -> Result<Vec<u8>, DecodeError> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| DecodeError::FetchFailed(format!("failed to build HTTP client: {}", e)))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| DecodeError::FetchFailed(e.to_string()))?;

    if !response.status().is_success() {
        return Err(DecodeError::FetchFailed(format!(
            "HTTP error: {}",
            response.status()
        )));
    }

    response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| DecodeError::FetchFailed(format!("failed to read response body: {}", e)))
}

/// Reads a subscription payload from a local file path.
pub async fn read_subscription_file(path: &str) -> Result<Vec<u8>, DecodeError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| DecodeError::FetchFailed(format!("{}: {}", path, e)))
}
