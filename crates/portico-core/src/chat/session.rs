use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use super::ChatTransport;
use crate::envelope::{ChatRequest, Outbound, StreamEvent};

/// Run one streaming chat session to completion.
///
/// Relays chunks in arrival order as `stream/streaming` messages and always
/// ends with exactly one terminal message: `stream/done` on normal end,
/// `stream/error` on any failure. Nothing is emitted after the terminal
/// message and a failed session never emits `done`.
pub async fn run_session(
    transport: Arc<dyn ChatTransport>,
    request: ChatRequest,
    outbound: UnboundedSender<Outbound>,
) {
    let model = request.model.clone();
    debug!("Starting chat session for model {}", model);

    let mut stream = match transport.open(request).await {
        Ok(stream) => stream,
        Err(e) => {
            send(&outbound, StreamEvent::Error { error: e.to_string() });
            return;
        }
    };

    while let Some(item) = stream.next().await {
        let chunk = match item {
            Ok(chunk) => chunk,
            Err(e) => {
                send(&outbound, StreamEvent::Error { error: e.to_string() });
                return;
            }
        };

        if let Some(error) = chunk.error {
            send(&outbound, StreamEvent::Error { error });
            return;
        }

        if let Some(text) = chunk.text_delta() {
            send(
                &outbound,
                StreamEvent::Streaming {
                    text: text.to_string(),
                },
            );
        }

        if chunk.is_finish() {
            debug!("Chat session for model {} finished", model);
            send(&outbound, StreamEvent::Done);
            return;
        }
    }

    // Stream ended without a finish chunk. Still a normal end of session.
    debug!("Chat stream for model {} closed without finish chunk", model);
    send(&outbound, StreamEvent::Done);
}

fn send(outbound: &UnboundedSender<Outbound>, event: StreamEvent) {
    if outbound.send(Outbound::Stream(event)).is_err() {
        warn!("Outbound receiver dropped mid-session");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{ChatChunk, ChunkStream};
    use anyhow::Result;
    use futures::future::BoxFuture;
    use futures::stream;
    use tokio::sync::mpsc;

    struct ScriptedTransport {
        lines: Vec<Result<&'static str, &'static str>>,
    }

    impl ChatTransport for ScriptedTransport {
        fn open(&self, _request: ChatRequest) -> BoxFuture<'static, Result<ChunkStream>> {
            let items: Vec<Result<ChatChunk>> = self
                .lines
                .iter()
                .map(|line| match line {
                    Ok(json) => Ok(serde_json::from_str(json).unwrap()),
                    Err(message) => Err(anyhow::anyhow!(*message)),
                })
                .collect();
            Box::pin(async move {
                let stream: ChunkStream = stream::iter(items).boxed();
                Ok(stream)
            })
        }
    }

    struct FailingTransport;

    impl ChatTransport for FailingTransport {
        fn open(&self, _request: ChatRequest) -> BoxFuture<'static, Result<ChunkStream>> {
            Box::pin(async { Err(anyhow::anyhow!("connection refused")) })
        }
    }

    async fn collect_session(transport: Arc<dyn ChatTransport>) -> Vec<Outbound> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        run_session(transport, ChatRequest::user_prompt("m", "p"), tx).await;

        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    fn streaming(text: &str) -> Outbound {
        Outbound::Stream(StreamEvent::Streaming {
            text: text.to_string(),
        })
    }

    #[tokio::test]
    async fn test_successful_session_order() {
        let transport = Arc::new(ScriptedTransport {
            lines: vec![
                Ok(r#"{"message":{"role":"assistant","content":"Hel"},"done":false}"#),
                Ok(r#"{"message":{"role":"assistant","content":"lo"},"done":false}"#),
                Ok(r#"{"message":{"role":"assistant","content":""},"done":true}"#),
            ],
        });

        let messages = collect_session(transport).await;
        assert_eq!(
            messages,
            vec![
                streaming("Hel"),
                streaming("lo"),
                Outbound::Stream(StreamEvent::Done),
            ]
        );
    }

    #[tokio::test]
    async fn test_mid_stream_failure_is_terminal() {
        let transport = Arc::new(ScriptedTransport {
            lines: vec![
                Ok(r#"{"message":{"role":"assistant","content":"par"},"done":false}"#),
                Err("connection reset"),
                // Never reached: the error above is terminal.
                Ok(r#"{"message":{"role":"assistant","content":""},"done":true}"#),
            ],
        });

        let messages = collect_session(transport).await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], streaming("par"));
        match &messages[1] {
            Outbound::Stream(StreamEvent::Error { error }) => {
                assert!(error.contains("connection reset"));
            }
            other => panic!("expected terminal error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_reported_error_is_terminal() {
        let transport = Arc::new(ScriptedTransport {
            lines: vec![Ok(r#"{"error":"model not found"}"#)],
        });

        let messages = collect_session(transport).await;
        assert_eq!(
            messages,
            vec![Outbound::Stream(StreamEvent::Error {
                error: "model not found".to_string(),
            })]
        );
    }

    #[tokio::test]
    async fn test_open_failure_emits_single_error() {
        let messages = collect_session(Arc::new(FailingTransport)).await;
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            Outbound::Stream(StreamEvent::Error { error }) => {
                assert!(error.contains("connection refused"));
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stream_without_finish_chunk_ends_done() {
        let transport = Arc::new(ScriptedTransport {
            lines: vec![Ok(
                r#"{"message":{"role":"assistant","content":"only"},"done":false}"#,
            )],
        });

        let messages = collect_session(transport).await;
        assert_eq!(
            messages,
            vec![streaming("only"), Outbound::Stream(StreamEvent::Done)]
        );
    }
}
