// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat platform trait for the remote messaging service (Telegram).

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ChronobotError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatId, FetchedUpdates};

/// Connection to the remote chat platform.
///
/// Implementations classify every failure into a
/// [`PlatformErrorKind`](crate::error::PlatformErrorKind) so callers can
/// decide whether to retry.
#[async_trait]
pub trait ChatPlatform: PluginAdapter {
    /// Long-polls for updates with identifiers at or above `offset`.
    ///
    /// Returns an empty batch when `timeout` elapses without new updates.
    async fn fetch_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<FetchedUpdates, ChronobotError>;

    /// Sends a plain text message to a chat.
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), ChronobotError>;

    /// Tells the platform that every update below `offset` has been consumed,
    /// so they are not redelivered after a restart.
    async fn acknowledge_offset(&self, offset: i64) -> Result<(), ChronobotError>;
}
