use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::chat::{ChatTransport, OllamaClient};
use crate::config::CoreConfig;
use crate::db::DbManager;
use crate::dispatch::Dispatcher;
use crate::envelope::{Inbound, Outbound};
use crate::highlight::{Highlighter, RehighlightPass};

/// Cloneable sender side of the bridge, handed to the UI core.
#[derive(Clone)]
pub struct BridgeHandle {
    inbound_tx: UnboundedSender<Inbound>,
}

impl BridgeHandle {
    pub fn send(&self, message: Inbound) -> Result<(), mpsc::error::SendError<Inbound>> {
        self.inbound_tx.send(message)
    }
}

/// Application-lifetime context owning the database manager, the chat
/// transport, the highlighter, and the dispatcher task. Must be created
/// inside a tokio runtime.
pub struct BridgeRuntime {
    db: Arc<DbManager>,
    handle: BridgeHandle,
    outbound_rx: Option<UnboundedReceiver<Outbound>>,
    highlighter: Highlighter,
    rehighlight_rx: Option<UnboundedReceiver<RehighlightPass>>,
    dispatcher_task: JoinHandle<()>,
}

impl BridgeRuntime {
    pub fn new(config: CoreConfig) -> Self {
        let transport: Arc<dyn ChatTransport> =
            Arc::new(OllamaClient::new(config.ollama_url.clone()));
        Self::with_transport(config, transport)
    }

    /// Used by tests and by front-ends that bring their own transport.
    pub fn with_transport(config: CoreConfig, transport: Arc<dyn ChatTransport>) -> Self {
        let db = Arc::new(DbManager::new(config.db_path()));

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let dispatcher = Dispatcher::new(db.clone(), transport, outbound_tx);
        let dispatcher_task = tokio::spawn(dispatcher.run(inbound_rx));

        let (highlighter, rehighlight_rx) = Highlighter::spawn(config.rehighlight_debounce);

        Self {
            db,
            handle: BridgeHandle { inbound_tx },
            outbound_rx: Some(outbound_rx),
            highlighter,
            rehighlight_rx: Some(rehighlight_rx),
            dispatcher_task,
        }
    }

    pub fn handle(&self) -> BridgeHandle {
        self.handle.clone()
    }

    /// The single outbound subscription. Subsequent calls return `None`.
    pub fn take_outbound_rx(&mut self) -> Option<UnboundedReceiver<Outbound>> {
        self.outbound_rx.take()
    }

    /// Side-channel receiver for debounced rehighlight passes.
    pub fn take_rehighlight_rx(&mut self) -> Option<UnboundedReceiver<RehighlightPass>> {
        self.rehighlight_rx.take()
    }

    pub fn highlighter(&self) -> Highlighter {
        self.highlighter.clone()
    }

    pub fn database(&self) -> Arc<DbManager> {
        self.db.clone()
    }

    /// Stop the dispatcher and the database worker. Callers must drop any
    /// cloned [`BridgeHandle`] first or the dispatcher will keep waiting for
    /// more messages.
    pub async fn shutdown(self) {
        let BridgeRuntime {
            db,
            handle,
            dispatcher_task,
            ..
        } = self;
        drop(handle);
        let _ = dispatcher_task.await;
        db.shutdown().await;
    }
}
