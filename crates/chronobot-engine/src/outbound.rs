// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single path for every outbound message.
//!
//! Replies, broadcasts and scheduled messages all go through
//! [`OutboundSender::send`], which logs failures and reports them to the
//! admin chat. It never retries.

use std::sync::Arc;

use async_trait::async_trait;
use chronobot_core::{ChatId, ChatPlatform, ChronobotError, PlatformErrorKind};
use tracing::{debug, error, warn};

use crate::metrics;
use crate::scheduler::JobAction;

/// Result of one send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    Failed(PlatformErrorKind),
}

impl SendOutcome {
    pub fn is_delivered(self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Sends messages and alerts the admin chat on failure.
pub struct OutboundSender {
    platform: Arc<dyn ChatPlatform>,
    admin_chat: Option<ChatId>,
}

impl OutboundSender {
    pub fn new(platform: Arc<dyn ChatPlatform>, admin_chat: Option<ChatId>) -> Self {
        Self {
            platform,
            admin_chat,
        }
    }

    /// Chat that receives failure diagnostics, if configured.
    pub fn admin_chat(&self) -> Option<ChatId> {
        self.admin_chat
    }

    /// Sends `text` to `chat_id`.
    ///
    /// On failure the error is logged and, when an admin chat is configured
    /// and is not the failing target, a diagnostic is sent there. A failed
    /// diagnostic is only logged.
    pub async fn send(&self, chat_id: ChatId, text: &str) -> SendOutcome {
        match self.platform.send_message(chat_id, text).await {
            Ok(()) => {
                metrics::record_send("delivered");
                SendOutcome::Delivered
            }
            Err(err) => {
                let kind = match &err {
                    ChronobotError::Platform { kind, .. } => *kind,
                    _ => PlatformErrorKind::Unclassified,
                };
                metrics::record_send("failed");
                warn!(chat_id = %chat_id, kind = %kind, error = %err, "failed to send message");
                self.alert_admin(chat_id, &err).await;
                SendOutcome::Failed(kind)
            }
        }
    }

    async fn alert_admin(&self, failed_chat: ChatId, err: &ChronobotError) {
        let Some(admin) = self.admin_chat else {
            debug!("no admin chat configured, skipping failure alert");
            return;
        };
        if admin == failed_chat {
            debug!(chat_id = %admin, "failing chat is the admin chat, skipping alert");
            return;
        }

        let alert = format!("Failed to send message to {failed_chat}. Error: {err}");
        if let Err(alert_err) = self.platform.send_message(admin, &alert).await {
            error!(
                admin_chat = %admin,
                error = %alert_err,
                "failed to notify admin chat"
            );
        }
    }
}

#[async_trait]
impl JobAction for OutboundSender {
    async fn run(&self, chat_id: ChatId, payload: &str) -> Result<(), ChronobotError> {
        match self.send(chat_id, payload).await {
            SendOutcome::Delivered => Ok(()),
            SendOutcome::Failed(kind) => Err(ChronobotError::platform(
                kind,
                format!("scheduled message to {chat_id} was not delivered"),
            )),
        }
    }
}
