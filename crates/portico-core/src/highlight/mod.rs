pub mod registry;

pub use registry::GrammarRegistry;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tracing::{debug, warn};

/// One debounced whole-document re-highlight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RehighlightPass;

/// Dependency-injected highlighting adapter.
///
/// `highlight` looks synchronous to the caller: the input comes back
/// unchanged immediately while the grammar load and the debounced
/// re-highlight pass happen on a worker task.
#[derive(Clone)]
pub struct Highlighter {
    registry: Arc<GrammarRegistry>,
    load_tx: UnboundedSender<String>,
}

impl Highlighter {
    /// Spawn the grammar-load worker. Returns the adapter plus the channel
    /// delivering debounced [`RehighlightPass`] events to the renderer.
    pub fn spawn(debounce: Duration) -> (Self, UnboundedReceiver<RehighlightPass>) {
        let registry = Arc::new(GrammarRegistry::new());
        let (load_tx, load_rx) = mpsc::unbounded_channel();
        let (pass_tx, pass_rx) = mpsc::unbounded_channel();

        tokio::spawn(load_worker(registry.clone(), load_rx, pass_tx, debounce));

        (Self { registry, load_tx }, pass_rx)
    }

    /// Return `code` as-is and schedule the grammar load for `language`.
    pub fn highlight(&self, language: &str, code: &str) -> String {
        if self.load_tx.send(language.to_string()).is_err() {
            warn!("Grammar load worker gone, highlight request dropped");
        }
        code.to_string()
    }

    /// Highlight with an already-registered grammar, for use after a
    /// [`RehighlightPass`] arrives.
    pub fn rendered(&self, language: &str, code: &str) -> String {
        self.registry.rendered(language, code)
    }

    pub fn registry(&self) -> &GrammarRegistry {
        &self.registry
    }
}

/// Resolves grammars as requests arrive and collapses bursts of requests
/// into a single trailing-edge rehighlight pass per debounce window.
async fn load_worker(
    registry: Arc<GrammarRegistry>,
    mut load_rx: UnboundedReceiver<String>,
    pass_tx: UnboundedSender<RehighlightPass>,
    window: Duration,
) {
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            request = load_rx.recv() => match request {
                Some(language) => {
                    if registry.register(&language) {
                        debug!("Registered grammar for {}", language);
                    }
                    // Each trigger restarts the window.
                    deadline = Some(Instant::now() + window);
                }
                None => break,
            },
            _ = async { tokio::time::sleep_until(deadline.unwrap()).await }, if deadline.is_some() => {
                deadline = None;
                if pass_tx.send(RehighlightPass).is_err() {
                    break;
                }
            }
        }
    }

    // Flush a pending pass so the last burst before shutdown is not lost.
    if deadline.is_some() {
        let _ = pass_tx.send(RehighlightPass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::error::TryRecvError;

    const WINDOW: Duration = Duration::from_millis(300);

    #[tokio::test(start_paused = true)]
    async fn test_highlight_returns_input_unchanged() {
        let (highlighter, _pass_rx) = Highlighter::spawn(WINDOW);
        let code = "x = 1\n";
        assert_eq!(highlighter.highlight("python", code), code);
        assert_eq!(highlighter.highlight("no-such-language", code), code);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_one_pass() {
        let (highlighter, mut pass_rx) = Highlighter::spawn(WINDOW);

        for _ in 0..5 {
            highlighter.highlight("rust", "fn main() {}");
        }

        assert_eq!(pass_rx.recv().await, Some(RehighlightPass));

        // A long quiet period must not produce a second pass.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(pass_rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_produce_separate_passes() {
        let (highlighter, mut pass_rx) = Highlighter::spawn(WINDOW);

        highlighter.highlight("rust", "fn main() {}");
        assert_eq!(pass_rx.recv().await, Some(RehighlightPass));

        highlighter.highlight("go", "package main");
        assert_eq!(pass_rx.recv().await, Some(RehighlightPass));
    }

    #[tokio::test(start_paused = true)]
    async fn test_grammar_registered_once_per_language() {
        let (highlighter, mut pass_rx) = Highlighter::spawn(WINDOW);

        highlighter.highlight("python", "x = 1");
        highlighter.highlight("python", "y = 2");
        pass_rx.recv().await.unwrap();

        assert!(highlighter.registry().is_registered("python"));
        // Direct re-registration confirms idempotence.
        assert!(!highlighter.registry().register("python"));
    }
}
