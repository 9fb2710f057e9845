// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat registry operations.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use chronobot_core::{ChatId, ChatKind, ChatRecord, ChronobotError};
use rusqlite::types::Type;
use rusqlite::{Row, params};

use crate::database::{Database, map_tr_err};

fn chat_from_row(row: &Row<'_>) -> Result<ChatRecord, rusqlite::Error> {
    let kind: String = row.get(2)?;
    let kind = ChatKind::from_str(&kind)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    let added_at: DateTime<Utc> = row.get(3)?;
    Ok(ChatRecord {
        chat_id: ChatId(row.get(0)?),
        title: row.get(1)?,
        kind,
        added_at,
    })
}

/// Insert a chat unless one with the same id exists.
///
/// Returns `true` if a row was inserted.
pub async fn insert_chat_if_absent(db: &Database, chat: &ChatRecord) -> Result<bool, ChronobotError> {
    let chat = chat.clone();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO chats (chat_id, title, kind, added_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![chat.chat_id.0, chat.title, chat.kind.to_string(), chat.added_at],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a chat by id.
pub async fn get_chat(db: &Database, chat_id: ChatId) -> Result<Option<ChatRecord>, ChronobotError> {
    db.connection()
        .call(move |conn| -> Result<Option<ChatRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT chat_id, title, kind, added_at FROM chats WHERE chat_id = ?1",
            )?;
            match stmt.query_row(params![chat_id.0], chat_from_row) {
                Ok(chat) => Ok(Some(chat)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a chat. Returns `true` if a row was removed.
pub async fn delete_chat(db: &Database, chat_id: ChatId) -> Result<bool, ChronobotError> {
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute("DELETE FROM chats WHERE chat_id = ?1", params![chat_id.0])?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// List all chats, oldest first.
pub async fn list_chats(db: &Database) -> Result<Vec<ChatRecord>, ChronobotError> {
    db.connection()
        .call(|conn| -> Result<Vec<ChatRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT chat_id, title, kind, added_at FROM chats ORDER BY added_at, chat_id",
            )?;
            let rows = stmt.query_map([], chat_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
