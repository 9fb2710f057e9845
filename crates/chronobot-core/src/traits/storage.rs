// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the chat registry and message log.

use async_trait::async_trait;

use crate::error::ChronobotError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatId, ChatRecord, MessageLogEntry};

/// Durable storage for known chats and the inbound message log.
///
/// Every operation is atomic on its own. Implementations serialise access
/// so that the dispatcher and the scheduler never observe a partial write.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), ChronobotError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), ChronobotError>;

    /// Inserts the chat if absent. Returns `true` if it was newly stored.
    ///
    /// An existing record is left untouched, including its `added_at`.
    async fn upsert_chat(&self, record: &ChatRecord) -> Result<bool, ChronobotError>;

    /// Fetches a stored chat by id.
    async fn get_chat(&self, chat_id: ChatId) -> Result<Option<ChatRecord>, ChronobotError>;

    /// Removes a chat. Returns `true` if a record was deleted.
    async fn delete_chat(&self, chat_id: ChatId) -> Result<bool, ChronobotError>;

    /// Lists all stored chats, oldest `added_at` first.
    async fn list_chats(&self) -> Result<Vec<ChatRecord>, ChronobotError>;

    /// Appends an entry to the message log.
    async fn append_message_log(&self, entry: &MessageLogEntry) -> Result<(), ChronobotError>;
}
