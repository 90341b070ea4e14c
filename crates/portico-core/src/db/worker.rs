use std::sync::mpsc::{Receiver, Sender};

use rusqlite::Connection;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

/// Errors crossing the worker boundary. Stringly typed so they stay `Clone`
/// and can be cached by the lifecycle manager.
#[derive(Debug, Clone, Error)]
pub enum DbError {
    #[error("database worker unavailable")]
    WorkerUnavailable,
    #[error("{0}")]
    Sqlite(String),
    #[error("database initialization failed: {0}")]
    Init(String),
}

impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        DbError::Sqlite(e.to_string())
    }
}

pub enum DbRequest {
    ExecBatch {
        sql: String,
        reply: oneshot::Sender<Result<(), DbError>>,
    },
    Execute {
        sql: String,
        params: Vec<String>,
        reply: oneshot::Sender<Result<usize, DbError>>,
    },
    QueryScalar {
        sql: String,
        reply: oneshot::Sender<Result<i64, DbError>>,
    },
    Shutdown,
}

/// Cloneable client side of the database worker. All access goes through the
/// request channel; the connection itself never leaves the worker thread.
#[derive(Clone, Debug)]
pub struct DbHandle {
    request_tx: Sender<DbRequest>,
}

impl DbHandle {
    pub(crate) fn new(request_tx: Sender<DbRequest>) -> Self {
        Self { request_tx }
    }

    pub async fn exec_batch(&self, sql: impl Into<String>) -> Result<(), DbError> {
        let (reply, rx) = oneshot::channel();
        self.request_tx
            .send(DbRequest::ExecBatch {
                sql: sql.into(),
                reply,
            })
            .map_err(|_| DbError::WorkerUnavailable)?;
        rx.await.map_err(|_| DbError::WorkerUnavailable)?
    }

    pub async fn execute(
        &self,
        sql: impl Into<String>,
        params: Vec<String>,
    ) -> Result<usize, DbError> {
        let (reply, rx) = oneshot::channel();
        self.request_tx
            .send(DbRequest::Execute {
                sql: sql.into(),
                params,
                reply,
            })
            .map_err(|_| DbError::WorkerUnavailable)?;
        rx.await.map_err(|_| DbError::WorkerUnavailable)?
    }

    pub async fn query_scalar(&self, sql: impl Into<String>) -> Result<i64, DbError> {
        let (reply, rx) = oneshot::channel();
        self.request_tx
            .send(DbRequest::QueryScalar {
                sql: sql.into(),
                reply,
            })
            .map_err(|_| DbError::WorkerUnavailable)?;
        rx.await.map_err(|_| DbError::WorkerUnavailable)?
    }

    pub(crate) fn send_shutdown(&self) {
        let _ = self.request_tx.send(DbRequest::Shutdown);
    }
}

/// Owns the rusqlite connection on a dedicated thread and serves requests
/// until `Shutdown` or until every handle is dropped.
pub struct DbWorker {
    conn: Connection,
    request_rx: Receiver<DbRequest>,
}

impl DbWorker {
    pub fn new(conn: Connection, request_rx: Receiver<DbRequest>) -> Self {
        Self { conn, request_rx }
    }

    pub fn run(self) {
        info!("Database worker thread started");

        while let Ok(request) = self.request_rx.recv() {
            match request {
                DbRequest::ExecBatch { sql, reply } => {
                    let result = self.conn.execute_batch(&sql).map_err(DbError::from);
                    if let Err(e) = &result {
                        error!("Batch execution failed: {}", e);
                    }
                    let _ = reply.send(result);
                }
                DbRequest::Execute { sql, params, reply } => {
                    debug!("Executing: {}", sql);
                    let result = self
                        .conn
                        .execute(&sql, rusqlite::params_from_iter(params.iter()))
                        .map_err(DbError::from);
                    let _ = reply.send(result);
                }
                DbRequest::QueryScalar { sql, reply } => {
                    let result = self
                        .conn
                        .query_row(&sql, [], |row| row.get::<_, i64>(0))
                        .map_err(DbError::from);
                    let _ = reply.send(result);
                }
                DbRequest::Shutdown => {
                    info!("Database worker shutting down");
                    break;
                }
            }
        }

        info!("Database worker thread stopped");
    }
}
