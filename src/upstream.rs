//! HTTP client for upstream JSON APIs
//!
//! Performs exactly one GET per call and classifies the outcome. No retries,
//! no caching, no writes to the snapshot store.

use crate::{constants::USER_AGENT, error::FetchError};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Single-shot JSON fetcher
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
}

impl UpstreamClient {
    /// Creates a new upstream client with a per-request timeout
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(FetchError::Transport)?;

        Ok(Self { client })
    }

    /// Fetches `url` and parses the body as JSON
    pub async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        tracing::debug!(url = %redact(url), "Fetching upstream");

        let response = self.client.get(url).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await.map_err(classify)?;
        parse_body(&body)
    }
}

/// Parses a response body, mapping invalid JSON to `Malformed`
pub(crate) fn parse_body(body: &str) -> Result<Value, FetchError> {
    serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(120).collect();
        FetchError::malformed(format!("invalid JSON ({}): {}", e, preview))
    })
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(err)
    }
}

/// Hides API key query parameters before a URL is logged
pub(crate) fn redact(url: &str) -> String {
    match url.split_once('?') {
        None => url.to_string(),
        Some((path, query)) => {
            let params = query
                .split('&')
                .map(|pair| match pair.split_once('=') {
                    Some((key, _)) if key.contains("key") => format!("{}=***", key),
                    _ => pair.to_string(),
                })
                .collect::<Vec<_>>()
                .join("&");
            format!("{}?{}", path, params)
        }
    }
}
