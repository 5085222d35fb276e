use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{QaError, QaResult};

/// Prompt in, complete generated text out.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> QaResult<String>;
}

/// Streaming client for an Ollama `/api/generate` endpoint.
pub struct OllamaClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create generation HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')),
            model: model.to_string(),
        })
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// One NDJSON line of a streamed generation.
#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl Generator for OllamaClient {
    async fn generate(&self, prompt: &str) -> QaResult<String> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: true,
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| QaError::Generation(e.to_string()))?;
        let resp = resp
            .error_for_status()
            .map_err(|e| QaError::Generation(e.to_string()))?;

        let mut acc = StreamAccumulator::default();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| QaError::Generation(e.to_string()))?;
            acc.push(&bytes)?;
        }
        let answer = acc.finish()?;

        debug!(
            model = %self.model,
            answer_len = answer.len(),
            "generation stream complete"
        );
        Ok(answer)
    }
}

/// Folds a newline-delimited JSON stream into the concatenated `response` text.
///
/// Transport chunks may split a line anywhere; incomplete lines wait in
/// `pending` until their newline arrives. Lines that do not parse are skipped.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    pending: Vec<u8>,
    answer: String,
    skipped: usize,
}

impl StreamAccumulator {
    pub fn push(&mut self, bytes: &[u8]) -> QaResult<()> {
        self.pending.extend_from_slice(bytes);
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.consume_line(&line)?;
        }
        Ok(())
    }

    /// Flush a trailing line without a newline and return the text.
    pub fn finish(mut self) -> QaResult<String> {
        let rest = std::mem::take(&mut self.pending);
        self.consume_line(&rest)?;
        if self.skipped > 0 {
            warn!(skipped = self.skipped, "skipped malformed stream lines");
        }
        Ok(self.answer)
    }

    fn consume_line(&mut self, line: &[u8]) -> QaResult<()> {
        let line = line.trim_ascii();
        if line.is_empty() {
            return Ok(());
        }
        match serde_json::from_slice::<GenerateChunk>(line) {
            Ok(GenerateChunk {
                error: Some(message),
                ..
            }) => Err(QaError::Generation(message)),
            Ok(GenerateChunk {
                response: Some(fragment),
                ..
            }) => {
                self.answer.push_str(&fragment);
                Ok(())
            }
            Ok(_) | Err(_) => {
                self.skipped += 1;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn fold(chunks: &[&str]) -> QaResult<String> {
        let mut acc = StreamAccumulator::default();
        for chunk in chunks {
            acc.push(chunk.as_bytes())?;
        }
        acc.finish()
    }

    #[test]
    fn test_concatenates_fragments_in_order() {
        let text = fold(&[
            "{\"response\":\"Mix \",\"done\":false}\n",
            "{\"response\":\"and fry.\",\"done\":false}\n",
            "{\"response\":\"\",\"done\":true}\n",
        ])
        .unwrap();
        assert_eq!(text, "Mix and fry.");
    }

    #[test]
    fn test_line_split_across_chunks() {
        let text = fold(&["{\"respo", "nse\":\"Hel", "lo\"}\n{\"response\":\" there\"}"]).unwrap();
        assert_eq!(text, "Hello there");
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let text = fold(&[
            "{\"response\":\"One\"}\n",
            "{not json\n",
            "\n",
            "{\"done\":true}\n",
            "{\"response\":\" two\"}\n",
        ])
        .unwrap();
        assert_eq!(text, "One two");
    }

    #[test]
    fn test_error_line_fails_generation() {
        let err = fold(&["{\"response\":\"partial\"}\n", "{\"error\":\"model not found\"}\n"])
            .unwrap_err();
        assert!(matches!(err, QaError::Generation(ref m) if m == "model not found"));
    }

    #[tokio::test]
    async fn test_generate_sends_streaming_request() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/api/generate")
            .match_body(Matcher::Json(json!({
                "model": "qwen2.5:latest",
                "prompt": "Question: eggs?\n\nAnswer:",
                "stream": true,
            })))
            .with_status(200)
            .with_header("content-type", "application/x-ndjson")
            .with_body("{\"response\":\"Three \"}\ngarbage\n{\"response\":\"eggs.\"}\n")
            .create_async()
            .await;

        let client =
            OllamaClient::new(&server.url(), "qwen2.5:latest", Duration::from_secs(5)).unwrap();
        let answer = client.generate("Question: eggs?\n\nAnswer:").await.unwrap();
        assert_eq!(answer, "Three eggs.");
    }

    #[tokio::test]
    async fn test_non_success_status_is_generation_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/api/generate")
            .with_status(500)
            .create_async()
            .await;

        let client = OllamaClient::new(&server.url(), "m", Duration::from_secs(5)).unwrap();
        let err = client.generate("hi").await.unwrap_err();
        assert!(matches!(err, QaError::Generation(_)));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_timeout_is_generation_error() {
        // Accepts connections but never answers.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let client = OllamaClient::new(&url, "m", Duration::from_millis(300)).unwrap();
        let err = client.generate("hi").await.unwrap_err();
        assert!(matches!(err, QaError::Generation(_)));
        drop(listener);
    }

    #[tokio::test]
    async fn test_connection_failure_is_generation_error() {
        let client = OllamaClient::new("http://127.0.0.1:1", "m", Duration::from_secs(5)).unwrap();
        let err = client.generate("hi").await.unwrap_err();
        assert!(matches!(err, QaError::Generation(_)));
    }
}
