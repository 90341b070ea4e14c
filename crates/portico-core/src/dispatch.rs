use std::sync::Arc;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

use crate::chat::{run_session, ChatTransport};
use crate::db::DbManager;
use crate::envelope::{Inbound, Outbound};

/// Top-level router between the UI core and the asynchronous resources.
///
/// Every inbound message is matched exhaustively and handled on its own
/// spawned task, so a slow branch never delays receipt of the next message.
/// All branch failures are converted into error-tagged outbound messages at
/// this boundary; nothing propagates as a panic or an unobserved error.
pub struct Dispatcher {
    db: Arc<DbManager>,
    chat: Arc<dyn ChatTransport>,
    outbound: UnboundedSender<Outbound>,
}

impl Dispatcher {
    pub fn new(
        db: Arc<DbManager>,
        chat: Arc<dyn ChatTransport>,
        outbound: UnboundedSender<Outbound>,
    ) -> Self {
        Self { db, chat, outbound }
    }

    /// Consume the sole inbound receiver and route messages until the UI
    /// core drops its sender. Taking the receiver by value is what makes a
    /// second subscription impossible.
    pub async fn run(self, mut inbound: UnboundedReceiver<Inbound>) {
        info!("Dispatcher started");

        while let Some(message) = inbound.recv().await {
            self.dispatch(message);
        }

        info!("Dispatcher stopped");
    }

    fn dispatch(&self, message: Inbound) {
        match message {
            Inbound::DbInit => {
                let db = self.db.clone();
                let outbound = self.outbound.clone();
                tokio::spawn(async move {
                    let reply = match db.init().await {
                        Ok(_) => Outbound::DbReady,
                        Err(e) => Outbound::DbError {
                            error: e.to_string(),
                        },
                    };
                    if outbound.send(reply).is_err() {
                        warn!("Outbound receiver dropped, db.init result lost");
                    }
                });
            }
            Inbound::ChatRequest(request) => {
                tokio::spawn(run_session(
                    self.chat.clone(),
                    request,
                    self.outbound.clone(),
                ));
            }
        }
    }
}
