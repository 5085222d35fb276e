use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::{info, warn};

use crate::error::{QaError, QaResult};

/// Live web search used when the recipe corpus is not enough.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> QaResult<String>;
}

/// Client for a Jina-style search endpoint (`GET ?q=...`, bearer auth).
pub struct JinaSearch {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl JinaSearch {
    pub fn new(url: &str, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create web search HTTP client")?;
        Ok(Self {
            client,
            url: url.to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl WebSearch for JinaSearch {
    async fn search(&self, query: &str) -> QaResult<String> {
        info!(query, "Performing web search");
        let resp = self
            .client
            .get(&self.url)
            .query(&[("q", query)])
            .header(
                AUTHORIZATION,
                format!("Bearer {}", self.api_key.as_deref().unwrap_or_default()),
            )
            .header("X-Respond-With", "no-content")
            .send()
            .await
            .map_err(|e| QaError::WebFallback(e.to_string()))?;

        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = resp
            .text()
            .await
            .map_err(|e| QaError::WebFallback(e.to_string()))?;

        if !status.is_success() {
            warn!(%status, "web search returned non-success status");
            return Err(QaError::WebFallback(format!(
                "search endpoint returned {}: {}",
                status, body
            )));
        }

        let text = if content_type.contains("html") {
            html2text::from_read(body.as_bytes(), 120).unwrap_or(body)
        } else {
            body
        };
        info!(result_len = text.len(), "Web search completed");
        Ok(text)
    }
}
