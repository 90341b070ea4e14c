use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message sent by the UI core into the bridge.
///
/// The tag set is closed: a new inbound kind means a new variant here, and
/// the dispatcher's `match` stops compiling until it handles it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", content = "data")]
pub enum Inbound {
    /// Lazily initialize the database and run migrations.
    #[serde(rename = "db.init")]
    DbInit,
    /// Start a streaming chat session.
    #[serde(rename = "chat.request")]
    ChatRequest(ChatRequest),
}

/// Message sent by the bridge back to the UI core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", content = "data")]
pub enum Outbound {
    #[serde(rename = "db.ready")]
    DbReady,
    #[serde(rename = "db.error")]
    DbError { error: String },
    #[serde(rename = "stream")]
    Stream(StreamEvent),
}

/// One event of a chat session: a chunk, normal completion, or failure.
///
/// A session emits zero or more `Streaming` events followed by exactly one
/// terminal `Done` or `Error`, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stream", rename_all = "lowercase")]
pub enum StreamEvent {
    Streaming { text: String },
    Done,
    Error { error: String },
}

/// Payload of `chat.request`, forwarded to the completion service.
///
/// `stream = true` and an empty tool list are forced by the transport, not
/// carried here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatRequest {
    pub fn user_prompt(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.into(),
            }],
            tools: Vec::new(),
        }
    }
}
