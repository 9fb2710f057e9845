// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only inbound message log.

use chronobot_core::{ChronobotError, MessageLogEntry};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Append an entry to the log.
pub async fn append(db: &Database, entry: &MessageLogEntry) -> Result<(), ChronobotError> {
    let entry = entry.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO message_log (chat_id, text, timestamp) VALUES (?1, ?2, ?3)",
                params![entry.chat_id.0, entry.text, entry.timestamp],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
