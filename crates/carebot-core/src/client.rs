use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ChatError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

#[derive(Serialize)]
struct RecommendRequest<'a> {
    user_query: &'a str,
}

/// Anything that can answer a user query with display text.
#[async_trait]
pub trait RecommendBackend: Send + Sync {
    async fn recommend(&self, query: &str) -> Result<String, ChatError>;
}

/// HTTP client for `POST {base_url}/recommend`
#[derive(Clone)]
pub struct RecommendClient {
    client: Client,
    base_url: String,
}

impl RecommendClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Like [`RecommendClient::new`] but with a whole-request timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, client))
    }

    /// Use a preconfigured `reqwest::Client` (proxies, TLS, headers).
    pub fn with_client(base_url: &str, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self) -> String {
        format!("{}/recommend", self.base_url)
    }
}

#[async_trait]
impl RecommendBackend for RecommendClient {
    async fn recommend(&self, query: &str) -> Result<String, ChatError> {
        let url = self.endpoint();
        debug!(%url, "sending recommendation request");

        let response = self
            .client
            .post(&url)
            .json(&RecommendRequest { user_query: query })
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "recommendation request did not complete");
                ChatError::from_send(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "recommendation service returned an error status");
            return Err(ChatError::Server(status));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ChatError::Unknown(e.to_string()))?;

        Ok(extract_display_text(body))
    }
}

/// Pick the text to show for a successful reply: the `response` field when it
/// is a string, a bare JSON string body as-is, otherwise the whole body
/// pretty-printed.
pub fn extract_display_text(body: Value) -> String {
    match body {
        Value::Object(ref map) => match map.get("response") {
            Some(Value::String(text)) => text.clone(),
            _ => pretty(&body),
        },
        Value::String(text) => text,
        other => pretty(&other),
    }
}

fn pretty(body: &Value) -> String {
    serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string())
}
