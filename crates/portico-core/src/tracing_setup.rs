use std::fs::OpenOptions;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub fn init_tracing() {
    init_tracing_with_service("portico");
}

/// Stderr logging filtered by `RUST_LOG` (default `info`), with an optional
/// append-to-file layer selected by `PORTICO_LOG_FILE`.
pub fn init_tracing_with_service(service_name: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(filter);

    let registry = tracing_subscriber::registry().with(stderr_layer);

    if let Ok(log_path) = std::env::var("PORTICO_LOG_FILE") {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .expect("Failed to open log file");

        let file_layer = fmt::layer()
            .with_writer(std::sync::Arc::new(file))
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_filter(tracing_subscriber::filter::LevelFilter::DEBUG);

        registry.with(file_layer).init();
        eprintln!("File logging enabled for {}: {}", service_name, log_path);
    } else {
        registry.init();
    }
}
