// SPDX-FileCopyrightText: 2026 Granary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide connection registry: one live connection per database file.
//!
//! All statement execution for a file goes through that file's single
//! `tokio_rusqlite::Connection`, whose background thread applies submitted
//! closures strictly in submission order. That thread IS the serialization
//! point: callers never hold the connection, so no write can bypass the
//! queue. Connections to different files are independent.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_rusqlite::Connection;
use tracing::debug;

use granary_core::error::GranaryError;

use crate::config::StorageConfig;

/// Maps normalized file paths to live connections. Lazily opens on first
/// acquire, reuses thereafter, closes on explicit request.
pub struct ConnectionRegistry {
    config: StorageConfig,
    connections: Mutex<HashMap<PathBuf, Connection>>,
}

impl ConnectionRegistry {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Get the connection for `path`, opening the file (and creating parent
    /// directories) on first use.
    ///
    /// The returned handle is a clone of the registry's own; dropping it
    /// does not close the connection.
    pub(crate) async fn acquire(&self, path: &Path) -> Result<Connection, GranaryError> {
        let normalized = normalize_path(path);
        let mut connections = self.connections.lock().await;
        if let Some(conn) = connections.get(&normalized) {
            return Ok(conn.clone());
        }

        if let Some(parent) = normalized.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
            }
        }

        let conn = Connection::open(normalized.clone()).await.map_err(io_err)?;
        let wal_mode = self.config.wal_mode;
        let busy_timeout = Duration::from_millis(self.config.busy_timeout_ms);
        conn.call(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            if wal_mode {
                conn.execute_batch("PRAGMA journal_mode=WAL;")?;
            }
            conn.execute_batch("PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;")?;
            Ok::<(), rusqlite::Error>(())
        })
        .await
        .map_err(io_err)?;

        debug!(path = %normalized.display(), "opened database connection");
        connections.insert(normalized, conn.clone());
        Ok(conn)
    }

    /// Whether a connection is currently open for `path`.
    pub async fn is_open(&self, path: &Path) -> bool {
        let normalized = normalize_path(path);
        self.connections.lock().await.contains_key(&normalized)
    }

    /// Checkpoint and close the connection for `path`. A later acquire
    /// reopens fresh. Closing an unopened path is a no-op.
    pub async fn close(&self, path: &Path) -> Result<(), GranaryError> {
        let normalized = normalize_path(path);
        let conn = self.connections.lock().await.remove(&normalized);
        match conn {
            Some(conn) => {
                checkpoint_and_close(conn).await?;
                debug!(path = %normalized.display(), "closed database connection");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Checkpoint and close every open connection.
    pub async fn close_all(&self) -> Result<(), GranaryError> {
        let drained: Vec<(PathBuf, Connection)> =
            self.connections.lock().await.drain().collect();
        for (path, conn) in drained {
            checkpoint_and_close(conn).await?;
            debug!(path = %path.display(), "closed database connection");
        }
        Ok(())
    }
}

async fn checkpoint_and_close(conn: Connection) -> Result<(), GranaryError> {
    conn.call(|conn| {
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok::<(), rusqlite::Error>(())
    })
    .await
    .map_err(io_err)?;
    conn.close().await.map_err(io_err)
}

/// Make `path` absolute and fold `.`/`..` components, so every spelling of
/// the same file routes to the same connection. No filesystem access: the
/// file may not exist yet.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

fn io_err(e: impl std::error::Error + Send + Sync + 'static) -> GranaryError {
    GranaryError::StorageIo {
        source: Box::new(e),
    }
}
