use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Directory holding the SQLite database file.
    pub data_dir: PathBuf,
    /// Base URL of the Ollama-compatible chat service.
    pub ollama_url: String,
    /// Default model for sessions started by the CLI.
    pub model: String,
    /// Window for collapsing repeated highlight triggers.
    pub rehighlight_debounce: Duration,
}

impl CoreConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("portico.db")
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("portico_data"),
            ollama_url: "http://localhost:11434".to_string(),
            model: "llama3.1".to_string(),
            rehighlight_debounce: Duration::from_millis(300),
        }
    }
}
