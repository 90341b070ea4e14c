pub mod chat;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod envelope;
pub mod highlight;
pub mod runtime;
pub mod tracing_setup;

pub use chat::{ChatTransport, OllamaClient};
pub use config::CoreConfig;
pub use db::{DbError, DbHandle, DbManager};
pub use dispatch::Dispatcher;
pub use envelope::{ChatMessage, ChatRequest, Inbound, Outbound, StreamEvent};
pub use highlight::{GrammarRegistry, Highlighter, RehighlightPass};
pub use runtime::{BridgeHandle, BridgeRuntime};
