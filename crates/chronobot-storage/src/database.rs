// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;
use std::time::Duration;

use chronobot_core::ChronobotError;
use tracing::{debug, info};

use crate::migrations;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the bot's SQLite database.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path`, applies PRAGMAs and
    /// runs pending migrations.
    pub async fn open(path: impl AsRef<Path>, wal_mode: bool) -> Result<Self, ChronobotError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(ChronobotError::storage)?;
        }

        let conn = tokio_rusqlite::Connection::open(&path)
            .await
            .map_err(ChronobotError::storage)?;

        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            if wal_mode {
                let mode: String =
                    conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
                debug!(journal_mode = %mode, "journal mode set");
                conn.pragma_update(None, "synchronous", "NORMAL")?;
            }
            conn.pragma_update(None, "foreign_keys", "ON")?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| -> Result<(), refinery::Error> { migrations::run_migrations(conn) })
            .await
            .map_err(map_call_err)?;

        info!(path = %path.display(), wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// Returns the underlying async connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Flushes the WAL into the main database file.
    ///
    /// The connection stays usable; dropping the `Database` releases it.
    pub async fn checkpoint(&self) -> Result<(), ChronobotError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Maps a tokio-rusqlite error wrapping a rusqlite error.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> ChronobotError {
    map_call_err(e)
}

/// Maps a tokio-rusqlite error wrapping any error returned from a `call` closure.
///
/// The connection handle inside some variants is not `Sync`, so only the
/// rendered message is kept.
pub(crate) fn map_call_err<E>(e: tokio_rusqlite::Error<E>) -> ChronobotError
where
    E: std::fmt::Display + std::fmt::Debug,
{
    ChronobotError::storage(std::io::Error::other(format!("database error: {e}")))
}
