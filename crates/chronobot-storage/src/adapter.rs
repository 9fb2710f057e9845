// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use chronobot_config::model::StorageConfig;
use chronobot_core::{
    AdapterType, ChatId, ChatRecord, ChronobotError, HealthStatus, MessageLogEntry, PluginAdapter,
    StorageAdapter,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily opened on the first call to
/// [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`StorageAdapter::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, ChronobotError> {
        self.db.get().ok_or_else(|| ChronobotError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ChronobotError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("SELECT 1", [], |_| Ok(()))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ChronobotError> {
        if self.db.get().is_some() {
            self.close().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), ChronobotError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| ChronobotError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), ChronobotError> {
        let db = self.db()?;
        if self.config.wal_mode {
            db.checkpoint().await?;
        }
        debug!("SQLite storage closed");
        Ok(())
    }

    async fn upsert_chat(&self, record: &ChatRecord) -> Result<bool, ChronobotError> {
        queries::chats::insert_chat_if_absent(self.db()?, record).await
    }

    async fn get_chat(&self, chat_id: ChatId) -> Result<Option<ChatRecord>, ChronobotError> {
        queries::chats::get_chat(self.db()?, chat_id).await
    }

    async fn delete_chat(&self, chat_id: ChatId) -> Result<bool, ChronobotError> {
        queries::chats::delete_chat(self.db()?, chat_id).await
    }

    async fn list_chats(&self) -> Result<Vec<ChatRecord>, ChronobotError> {
        queries::chats::list_chats(self.db()?).await
    }

    async fn append_message_log(&self, entry: &MessageLogEntry) -> Result<(), ChronobotError> {
        queries::message_log::append(self.db()?, entry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &std::path::Path) -> StorageConfig {
        StorageConfig {
            database_path: path.display().to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn sqlite_storage_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(make_config(&dir.path().join("test.db")));

        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_opens_database_at_configured_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("init_test.db");
        let storage = SqliteStorage::new(make_config(&db_path));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(make_config(&dir.path().join("double_init.db")));

        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn health_check_reflects_initialization() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(make_config(&dir.path().join("health.db")));

        assert!(storage.health_check().await.is_err());
        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn operations_before_initialize_fail_as_storage_errors() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(make_config(&dir.path().join("early.db")));

        let err = storage.list_chats().await.unwrap_err();
        assert_eq!(err.category(), chronobot_core::ErrorCategory::Storage);
    }

    #[tokio::test]
    async fn shutdown_without_initialize_is_a_no_op() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(make_config(&dir.path().join("noop.db")));
        storage.shutdown().await.unwrap();
    }
}
