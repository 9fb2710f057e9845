// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routes inbound events to command handlers or the general message path.

use std::sync::Arc;

use chronobot_core::{
    ChatId, ChatRecord, ChronobotError, InboundEvent, MessageLogEntry, StorageAdapter,
};
use tracing::{debug, info, warn};

use crate::commands::{self, BROADCAST_USAGE, Classified, Command};
use crate::metrics;
use crate::outbound::OutboundSender;

const WELCOME_TEXT: &str = "Welcome! I'm here to assist you. Use /info to know more.";
const BROADCAST_PRIVATE_ONLY: &str = "Broadcast command can only be used in private chat.";
const NO_CHATS_TEXT: &str = "No chats stored yet.";

/// Result of one broadcast fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: Vec<ChatId>,
}

/// What the dispatcher did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A command ran and replied.
    Command(&'static str),
    Broadcast(BroadcastReport),
    /// A general message was logged.
    Message,
    /// Usage error or gated command; the sender got an explanation.
    Rejected,
    /// Unknown command.
    Ignored,
}

pub struct Dispatcher {
    storage: Arc<dyn StorageAdapter>,
    sender: Arc<OutboundSender>,
    bot_name: String,
}

impl Dispatcher {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        sender: Arc<OutboundSender>,
        bot_name: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            sender,
            bot_name: bot_name.into(),
        }
    }

    /// Handles one inbound event.
    ///
    /// The chat is recorded before anything else. Usage errors are answered
    /// here; storage and other errors are returned to the caller.
    pub async fn dispatch(&self, event: &InboundEvent) -> Result<DispatchOutcome, ChronobotError> {
        let record = ChatRecord::from_chat(&event.chat, event.received_at);
        if self.storage.upsert_chat(&record).await? {
            info!(
                chat_id = %event.chat.id,
                kind = %event.chat.kind,
                title = %event.chat.title,
                "stored new chat"
            );
        }

        let text = event.text.as_deref().unwrap_or_default();
        let result = match commands::classify(text) {
            Ok(Classified::Command(command)) => {
                metrics::record_event("command");
                self.handle_command(event, command).await
            }
            Ok(Classified::Unknown(name)) => {
                debug!(chat_id = %event.chat.id, command = %name, "ignoring unknown command");
                metrics::record_event("unknown_command");
                Ok(DispatchOutcome::Ignored)
            }
            Ok(Classified::Message) => {
                metrics::record_event("message");
                self.handle_message(event).await
            }
            Err(err) => Err(err),
        };

        match result {
            Err(ChronobotError::MalformedInput { usage }) => {
                debug!(chat_id = %event.chat.id, "replying with usage");
                self.sender.send(event.chat.id, &usage).await;
                Ok(DispatchOutcome::Rejected)
            }
            other => other,
        }
    }

    async fn handle_command(
        &self,
        event: &InboundEvent,
        command: Command,
    ) -> Result<DispatchOutcome, ChronobotError> {
        let chat_id = event.chat.id;
        let name = command.name();
        debug!(chat_id = %chat_id, command = name, "handling command");

        let reply = match command {
            Command::Start => WELCOME_TEXT.to_string(),
            Command::Info => self.info_text(),
            Command::ListChats => self.list_chats_text().await?,
            Command::RemoveChat(target) => {
                let removed = match self.storage.get_chat(target).await? {
                    Some(record) => self.storage.delete_chat(target).await?.then_some(record),
                    None => None,
                };
                match removed {
                    Some(record) => {
                        info!(
                            chat_id = %target,
                            title = %record.title,
                            kind = %record.kind,
                            requested_by = %chat_id,
                            "removed chat"
                        );
                        format!("Chat with ID {target} has been removed from storage.")
                    }
                    None => format!("No stored chat with ID {target}."),
                }
            }
            Command::Broadcast(payload) => {
                if !event.chat.kind.is_private() {
                    self.sender.send(chat_id, BROADCAST_PRIVATE_ONLY).await;
                    return Ok(DispatchOutcome::Rejected);
                }
                let payload = payload.ok_or_else(|| commands::usage(BROADCAST_USAGE))?;
                let report = self.broadcast(&payload).await?;
                let summary = format!(
                    "Broadcast delivered to {} of {} chats.",
                    report.delivered, report.attempted
                );
                self.sender.send(chat_id, &summary).await;
                return Ok(DispatchOutcome::Broadcast(report));
            }
        };

        self.sender.send(chat_id, &reply).await;
        Ok(DispatchOutcome::Command(name))
    }

    async fn handle_message(&self, event: &InboundEvent) -> Result<DispatchOutcome, ChronobotError> {
        let text = event.text.clone().unwrap_or_default();
        self.storage
            .append_message_log(&MessageLogEntry {
                chat_id: event.chat.id,
                text: text.clone(),
                timestamp: event.received_at,
            })
            .await?;

        if event.text.is_none() {
            debug!(chat_id = %event.chat.id, "logged message without text");
            return Ok(DispatchOutcome::Message);
        }

        let greeting = if event.chat.kind.is_private() {
            "Hello, user!"
        } else {
            "Hello, group!"
        };
        let reply = format!("{greeting} This is a response to your message: '{text}'.");
        self.sender.send(event.chat.id, &reply).await;
        Ok(DispatchOutcome::Message)
    }

    /// Sends `text` to every stored chat, one at a time.
    ///
    /// The chat list is read once up front. Failed chats are skipped.
    pub async fn broadcast(&self, text: &str) -> Result<BroadcastReport, ChronobotError> {
        let chats = self.storage.list_chats().await?;
        let mut report = BroadcastReport {
            attempted: chats.len(),
            ..BroadcastReport::default()
        };

        for chat in &chats {
            if self.sender.send(chat.chat_id, text).await.is_delivered() {
                report.delivered += 1;
            } else {
                report.failed.push(chat.chat_id);
            }
        }

        if report.failed.is_empty() {
            info!(chats = report.attempted, "broadcast delivered");
        } else {
            warn!(
                delivered = report.delivered,
                failed = report.failed.len(),
                "broadcast partially delivered"
            );
        }
        Ok(report)
    }

    fn info_text(&self) -> String {
        format!(
            "I'm {}, a bot that can do the following:\n\
             - Send scheduled messages at configured times.\n\
             - Respond to your messages.\n\
             - Collect and store group and channel information.\n\
             - Broadcast messages to all stored chats.\n\
             - Log messages to a database.",
            self.bot_name
        )
    }

    async fn list_chats_text(&self) -> Result<String, ChronobotError> {
        let chats = self.storage.list_chats().await?;
        if chats.is_empty() {
            return Ok(NO_CHATS_TEXT.to_string());
        }

        let lines: Vec<String> = chats
            .iter()
            .map(|chat| {
                format!(
                    "{} (ID: {}, Type: {}, Added: {})",
                    chat.title,
                    chat.chat_id,
                    chat.kind,
                    chat.added_at.format("%Y-%m-%d %H:%M:%S")
                )
            })
            .collect();
        Ok(format!("Stored chats:\n{}", lines.join("\n")))
    }
}
