use std::path::PathBuf;
use std::sync::mpsc;
use std::thread::JoinHandle;

use rusqlite::Connection;
use tokio::sync::oneshot;
use tracing::{error, info};

use super::worker::{DbError, DbHandle, DbWorker};

const MIGRATIONS: &str = include_str!("migrations.sql");

#[derive(Debug, Clone)]
enum DbLocation {
    Path(PathBuf),
    InMemory,
}

impl DbLocation {
    fn open(&self) -> Result<Connection, rusqlite::Error> {
        match self {
            DbLocation::Path(path) => Connection::open(path),
            DbLocation::InMemory => Connection::open_in_memory(),
        }
    }
}

enum Lifecycle {
    Uninitialized,
    Ready(DbHandle),
    Failed(String),
}

/// Process-wide owner of the database resource.
///
/// `init()` is idempotent: the first call spawns the worker thread and runs
/// the migration script, concurrent callers wait for that same attempt, and
/// later calls return the existing handle without touching migrations again.
/// A failed attempt is cached and reported on every subsequent call.
pub struct DbManager {
    location: DbLocation,
    state: tokio::sync::Mutex<Lifecycle>,
    worker_handle: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl DbManager {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            location: DbLocation::Path(path.into()),
            state: tokio::sync::Mutex::new(Lifecycle::Uninitialized),
            worker_handle: parking_lot::Mutex::new(None),
        }
    }

    /// Used in tests.
    pub fn in_memory() -> Self {
        Self {
            location: DbLocation::InMemory,
            state: tokio::sync::Mutex::new(Lifecycle::Uninitialized),
            worker_handle: parking_lot::Mutex::new(None),
        }
    }

    pub async fn init(&self) -> Result<DbHandle, DbError> {
        // The lock is held across the whole attempt, so callers arriving
        // while migrations run wait for that attempt instead of starting
        // another one.
        let mut state = self.state.lock().await;

        match &*state {
            Lifecycle::Ready(handle) => return Ok(handle.clone()),
            Lifecycle::Failed(message) => return Err(DbError::Init(message.clone())),
            Lifecycle::Uninitialized => {}
        }

        match self.start_worker().await {
            Ok(handle) => {
                info!("Database ready, migrations applied");
                *state = Lifecycle::Ready(handle.clone());
                Ok(handle)
            }
            Err(e) => {
                error!("Database initialization failed: {}", e);
                *state = Lifecycle::Failed(e.to_string());
                Err(DbError::Init(e.to_string()))
            }
        }
    }

    /// Ready handle, if a successful `init()` has completed.
    pub async fn handle(&self) -> Option<DbHandle> {
        match &*self.state.lock().await {
            Lifecycle::Ready(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    async fn start_worker(&self) -> Result<DbHandle, DbError> {
        if let DbLocation::Path(path) = &self.location {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DbError::Init(e.to_string()))?;
            }
        }

        let (request_tx, request_rx) = mpsc::channel();
        let (open_tx, open_rx) = oneshot::channel();
        let location = self.location.clone();

        let thread = std::thread::spawn(move || {
            let conn = match location.open() {
                Ok(conn) => {
                    let _ = open_tx.send(Ok(()));
                    conn
                }
                Err(e) => {
                    let _ = open_tx.send(Err(DbError::from(e)));
                    return;
                }
            };
            DbWorker::new(conn, request_rx).run();
        });

        open_rx.await.map_err(|_| DbError::WorkerUnavailable)??;
        *self.worker_handle.lock() = Some(thread);

        let handle = DbHandle::new(request_tx);
        handle.exec_batch(MIGRATIONS).await?;
        Ok(handle)
    }

    /// Stop the worker thread, if one was started.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.handle().await {
            handle.send_shutdown();
        }
        if let Some(thread) = self.worker_handle.lock().take() {
            let _ = thread.join();
        }
    }
}
