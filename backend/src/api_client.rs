//! Shared plumbing for talking to the R2S API over HTTP.

use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Base URL plus a configured `reqwest` client.
#[derive(Debug, Clone)]
pub struct ApiEndpoint {
    client: Client,
    base_url: String,
}

impl ApiEndpoint {
    /// Create an endpoint. A trailing slash on `base_url` is ignored.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Absolute URL for `path` (which starts with `/`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// Best available error message from a response body.
///
/// Understands `{ message }` bodies from the session service and
/// `{ detail }` bodies from the solver; falls back to the raw text.
pub fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.message.filter(|m| !m.trim().is_empty()) {
            return message;
        }
        match parsed.detail {
            Some(serde_json::Value::String(detail)) if !detail.trim().is_empty() => return detail,
            Some(other) if !other.is_null() => return other.to_string(),
            _ => {}
        }
    }
    let body = body.trim();
    if body.is_empty() {
        format!("Request failed with status {}", status)
    } else {
        format!("Request failed with status {}: {}", status, body)
    }
}

/// Split a response into success or `(status, message)`.
pub async fn check_status(response: Response) -> Result<Response, (StatusCode, String)> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<empty response>".to_string());
    Err((status, error_message(status, &body)))
}
