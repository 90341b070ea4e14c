use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use portico_core::envelope::{ChatRequest, Inbound, Outbound, StreamEvent};
use portico_core::{tracing_setup, BridgeRuntime, CoreConfig};

#[derive(Parser)]
#[command(name = "portico-cli")]
#[command(about = "Terminal front-end for the portico interop bridge")]
struct Cli {
    /// Base URL of the Ollama-compatible chat service
    #[arg(long)]
    url: Option<String>,

    /// Model to send chat requests to
    #[arg(long, short)]
    model: Option<String>,

    /// Data directory for the SQLite database
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database and run migrations
    Init,
    /// Ask the model a question and stream the answer
    Ask {
        /// The prompt to send
        prompt: Vec<String>,
    },
    /// Highlight a file, waiting for the deferred rehighlight pass
    Highlight {
        /// Language name (e.g. rust, python, go)
        language: String,
        /// File to highlight
        file: PathBuf,
    },
}

fn build_config(cli: &Cli) -> CoreConfig {
    let mut config = CoreConfig::default();
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    } else if let Some(base) = dirs::data_dir() {
        config.data_dir = base.join("portico");
    }
    if let Some(url) = &cli.url {
        config.ollama_url = url.clone();
    }
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_setup::init_tracing();

    let cli = Cli::parse();
    let config = build_config(&cli);
    let model = config.model.clone();
    tracing::info!(
        "Bridge starting: service {}, data dir {}",
        config.ollama_url,
        config.data_dir.display()
    );

    let mut runtime = BridgeRuntime::new(config);
    let handle = runtime.handle();
    let mut outbound_rx = runtime
        .take_outbound_rx()
        .context("outbound channel already taken")?;

    match cli.command {
        Commands::Init => {
            handle.send(Inbound::DbInit)?;
            match outbound_rx.recv().await {
                Some(Outbound::DbReady) => println!("database ready"),
                Some(Outbound::DbError { error }) => {
                    eprintln!("database error: {error}");
                }
                Some(other) => {
                    eprintln!("unexpected reply: {}", serde_json::to_string(&other)?);
                }
                None => eprintln!("bridge closed before replying"),
            }
        }
        Commands::Ask { prompt } => {
            let prompt = prompt.join(" ");
            if prompt.is_empty() {
                anyhow::bail!("empty prompt");
            }

            handle.send(Inbound::ChatRequest(ChatRequest::user_prompt(
                model, prompt,
            )))?;

            let mut stdout = std::io::stdout();
            while let Some(message) = outbound_rx.recv().await {
                match message {
                    Outbound::Stream(StreamEvent::Streaming { text }) => {
                        print!("{text}");
                        stdout.flush()?;
                    }
                    Outbound::Stream(StreamEvent::Done) => {
                        println!();
                        break;
                    }
                    Outbound::Stream(StreamEvent::Error { error }) => {
                        eprintln!("\nstream error: {error}");
                        break;
                    }
                    Outbound::DbReady | Outbound::DbError { .. } => {}
                }
            }
        }
        Commands::Highlight { language, file } => {
            let code = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;

            let highlighter = runtime.highlighter();
            let mut rehighlight_rx = runtime
                .take_rehighlight_rx()
                .context("rehighlight channel already taken")?;

            // First pass comes back unhighlighted while the grammar loads.
            let placeholder = highlighter.highlight(&language, &code);
            debug_assert_eq!(placeholder, code);

            rehighlight_rx
                .recv()
                .await
                .context("highlight worker stopped")?;
            print!("{}", highlighter.rendered(&language, &code));
        }
    }

    drop(handle);
    drop(outbound_rx);
    runtime.shutdown().await;
    Ok(())
}
