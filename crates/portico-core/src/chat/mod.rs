pub mod client;
pub mod session;
pub mod types;

pub use client::{ChatTransport, ChunkStream, OllamaClient};
pub use session::run_session;
pub use types::{ChatChunk, ChunkMessage};
