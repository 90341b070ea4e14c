use serde::Deserialize;

/// One NDJSON line of an Ollama `/api/chat` streaming response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChunk {
    /// Incremental assistant message, absent on pure status lines.
    #[serde(default)]
    pub message: Option<ChunkMessage>,
    /// Set on the final line of a successful stream.
    #[serde(default)]
    pub done: bool,
    /// Reported by the server when generation fails mid-stream.
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

impl ChatChunk {
    /// Extract the text delta if this chunk carries one.
    pub fn text_delta(&self) -> Option<&str> {
        match &self.message {
            Some(message) if !message.content.is_empty() => Some(&message.content),
            _ => None,
        }
    }

    /// Check if this is the terminal chunk of a successful stream.
    pub fn is_finish(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_delta_extraction() {
        let chunk: ChatChunk = serde_json::from_str(
            r#"{"model":"llama3.1","message":{"role":"assistant","content":"Hello"},"done":false}"#,
        )
        .unwrap();
        assert_eq!(chunk.text_delta(), Some("Hello"));
        assert!(!chunk.is_finish());
    }

    #[test]
    fn test_finish_detection() {
        let chunk: ChatChunk = serde_json::from_str(
            r#"{"model":"llama3.1","message":{"role":"assistant","content":""},"done_reason":"stop","done":true}"#,
        )
        .unwrap();
        assert!(chunk.is_finish());
        assert_eq!(chunk.text_delta(), None);
    }

    #[test]
    fn test_server_error_line() {
        let chunk: ChatChunk =
            serde_json::from_str(r#"{"error":"model not found"}"#).unwrap();
        assert_eq!(chunk.error.as_deref(), Some("model not found"));
        assert!(!chunk.is_finish());
    }

    #[test]
    fn test_empty_delta_returns_none() {
        let chunk: ChatChunk = serde_json::from_str(
            r#"{"message":{"role":"assistant","content":""},"done":false}"#,
        )
        .unwrap();
        assert_eq!(chunk.text_delta(), None);
    }
}
