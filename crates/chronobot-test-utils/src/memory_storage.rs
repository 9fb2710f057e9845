// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory storage adapter.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use chronobot_core::traits::{PluginAdapter, StorageAdapter};
use chronobot_core::types::{AdapterType, ChatId, ChatRecord, HealthStatus, MessageLogEntry};
use chronobot_core::ChronobotError;

/// Storage adapter backed by vectors.
///
/// [`MemoryStorage::set_failing`] makes every subsequent operation fail with
/// a storage error, for exercising error paths.
#[derive(Default)]
pub struct MemoryStorage {
    chats: Mutex<Vec<ChatRecord>>,
    log: Mutex<Vec<MessageLogEntry>>,
    failing: AtomicBool,
    closed: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with chats.
    pub async fn with_chats(chats: impl IntoIterator<Item = ChatRecord>) -> Self {
        let storage = Self::new();
        storage.chats.lock().await.extend(chats);
        storage
    }

    /// Toggle failure injection.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every logged message, oldest first.
    pub async fn message_log(&self) -> Vec<MessageLogEntry> {
        self.log.lock().await.clone()
    }

    /// Whether `close` was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), ChronobotError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChronobotError::storage(std::io::Error::other(
                "injected storage failure",
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ChronobotError> {
        Ok(match self.check() {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), ChronobotError> {
        self.close().await
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn initialize(&self) -> Result<(), ChronobotError> {
        self.check()
    }

    async fn close(&self) -> Result<(), ChronobotError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn upsert_chat(&self, record: &ChatRecord) -> Result<bool, ChronobotError> {
        self.check()?;
        let mut chats = self.chats.lock().await;
        if chats.iter().any(|c| c.chat_id == record.chat_id) {
            return Ok(false);
        }
        chats.push(record.clone());
        Ok(true)
    }

    async fn get_chat(&self, chat_id: ChatId) -> Result<Option<ChatRecord>, ChronobotError> {
        self.check()?;
        Ok(self
            .chats
            .lock()
            .await
            .iter()
            .find(|c| c.chat_id == chat_id)
            .cloned())
    }

    async fn delete_chat(&self, chat_id: ChatId) -> Result<bool, ChronobotError> {
        self.check()?;
        let mut chats = self.chats.lock().await;
        let before = chats.len();
        chats.retain(|c| c.chat_id != chat_id);
        Ok(chats.len() != before)
    }

    async fn list_chats(&self) -> Result<Vec<ChatRecord>, ChronobotError> {
        self.check()?;
        let mut chats = self.chats.lock().await.clone();
        chats.sort_by_key(|c| c.added_at);
        Ok(chats)
    }

    async fn append_message_log(&self, entry: &MessageLogEntry) -> Result<(), ChronobotError> {
        self.check()?;
        self.log.lock().await.push(entry.clone());
        Ok(())
    }
}
