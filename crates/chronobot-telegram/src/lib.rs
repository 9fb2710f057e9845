// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram platform adapter for Chronobot.
//!
//! Implements [`ChatPlatform`] for the Telegram Bot API via teloxide using
//! explicit `getUpdates` long polling, so the engine owns the update cursor.

pub mod handler;

use std::time::Duration;

use async_trait::async_trait;
use chronobot_config::model::TelegramConfig;
use chronobot_core::error::ChronobotError;
use chronobot_core::traits::{ChatPlatform, PluginAdapter};
use chronobot_core::types::{AdapterType, ChatId, FetchedUpdates, HealthStatus};
use teloxide::payloads::GetUpdatesSetters;
use teloxide::prelude::*;
use teloxide::types::AllowedUpdate;
use tracing::{debug, info};

/// Slack added to the HTTP timeout on top of the long-poll timeout.
const HTTP_TIMEOUT_SLACK: Duration = Duration::from_secs(10);

/// Telegram adapter implementing [`ChatPlatform`].
pub struct TelegramPlatform {
    bot: Bot,
}

impl TelegramPlatform {
    /// Creates a new Telegram adapter.
    ///
    /// Requires `config.bot_token` to be set. The HTTP client timeout is sized
    /// so a long poll of `poll_timeout_secs` never trips it.
    pub fn new(config: &TelegramConfig) -> Result<Self, ChronobotError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            ChronobotError::Config("telegram.bot_token is required for Telegram adapter".into())
        })?;

        if token.trim().is_empty() {
            return Err(ChronobotError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let http_timeout =
            Duration::from_secs(u64::from(config.poll_timeout_secs)) + HTTP_TIMEOUT_SLACK;
        let client = teloxide::net::default_reqwest_settings()
            .timeout(http_timeout)
            .build()
            .map_err(|e| ChronobotError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            bot: Bot::with_client(token, client),
        })
    }
}

fn to_api_offset(offset: i64) -> Result<i32, ChronobotError> {
    i32::try_from(offset)
        .map_err(|_| ChronobotError::Internal(format!("update offset {offset} out of range")))
}

#[async_trait]
impl PluginAdapter for TelegramPlatform {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Platform
    }

    async fn health_check(&self) -> Result<HealthStatus, ChronobotError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), ChronobotError> {
        // No background tasks; in-flight requests end when the Bot is dropped.
        debug!("Telegram platform shutting down");
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for TelegramPlatform {
    async fn fetch_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<FetchedUpdates, ChronobotError> {
        let timeout_secs = u32::try_from(timeout.as_secs()).unwrap_or(u32::MAX);
        let mut request = self
            .bot
            .get_updates()
            .timeout(timeout_secs)
            .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::ChannelPost]);
        if let Some(offset) = offset {
            request = request.offset(to_api_offset(offset)?);
        }

        let updates = request
            .await
            .map_err(|e| handler::platform_error("getUpdates", e))?;

        let batch = handler::to_fetched_updates(&updates);
        debug!(
            raw = updates.len(),
            events = batch.events.len(),
            last_update_id = ?batch.last_update_id,
            "fetched updates"
        );
        Ok(batch)
    }

    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), ChronobotError> {
        self.bot
            .send_message(teloxide::types::ChatId(chat_id.0), text)
            .await
            .map_err(|e| handler::platform_error("sendMessage", e))?;
        debug!(chat_id = chat_id.0, "message sent");
        Ok(())
    }

    async fn acknowledge_offset(&self, offset: i64) -> Result<(), ChronobotError> {
        // A zero-timeout getUpdates with the offset confirms everything below it.
        self.bot
            .get_updates()
            .offset(to_api_offset(offset)?)
            .limit(1)
            .timeout(0)
            .await
            .map_err(|e| handler::platform_error("getUpdates", e))?;
        info!(offset, "acknowledged update offset");
        Ok(())
    }
}
