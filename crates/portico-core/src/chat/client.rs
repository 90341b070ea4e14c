use std::pin::Pin;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use futures::io::BufReader;
use futures::{AsyncBufReadExt, Stream, StreamExt, TryStreamExt};

use super::ChatChunk;
use crate::envelope::ChatRequest;

/// Ordered chunk stream of one chat session.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatChunk>> + Send>>;

/// Opens a streaming completion call. Implemented by [`OllamaClient`] for the
/// real service and by scripted transports in tests.
pub trait ChatTransport: Send + Sync + 'static {
    fn open(&self, request: ChatRequest) -> BoxFuture<'static, Result<ChunkStream>>;
}

/// HTTP client for an Ollama-compatible chat endpoint.
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn open_stream(&self, request: &ChatRequest) -> Result<ChunkStream> {
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));

        // Session parameters fixed by the bridge: always stream, never expose
        // tools to the model.
        let body = serde_json::json!({
            "model": request.model,
            "messages": request.messages,
            "stream": true,
            "tools": [],
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to send chat request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Chat service error ({}): {}", status, error_text);
        }

        let reader = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
            .into_async_read();

        let chunks = BufReader::new(reader)
            .lines()
            .map_err(anyhow::Error::from)
            .try_filter_map(|line| async move {
                if line.trim().is_empty() {
                    return Ok(None);
                }
                let chunk = serde_json::from_str::<ChatChunk>(&line)
                    .with_context(|| format!("Failed to parse chunk: {line}"))?;
                Ok(Some(chunk))
            });

        Ok(chunks.boxed())
    }
}

impl ChatTransport for OllamaClient {
    fn open(&self, request: ChatRequest) -> BoxFuture<'static, Result<ChunkStream>> {
        let client = self.clone();
        Box::pin(async move { client.open_stream(&request).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalized_in_endpoint() {
        let client = OllamaClient::new("http://localhost:11434/");
        assert_eq!(client.base_url(), "http://localhost:11434/");
    }

    #[tokio::test]
    #[ignore] // Requires a running Ollama instance
    async fn test_open_stream_against_local_service() {
        let client = OllamaClient::new("http://localhost:11434");
        let request = ChatRequest::user_prompt("llama3.1", "Say hi in one word.");
        let mut stream = client.open_stream(&request).await.unwrap();

        let mut saw_finish = false;
        while let Some(chunk) = stream.next().await {
            if chunk.unwrap().is_finish() {
                saw_finish = true;
            }
        }
        assert!(saw_finish);
    }
}
