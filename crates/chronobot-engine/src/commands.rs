// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command recognition for inbound text.

use chronobot_core::{ChatId, ChronobotError};

pub const REMOVE_CHAT_USAGE: &str = "Usage: /remove_chat <chat_id>";
pub const BROADCAST_USAGE: &str = "Usage: /broadcast <message>";

/// A recognized bot command with its parsed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Info,
    ListChats,
    RemoveChat(ChatId),
    /// Payload is `None` when the command had no text after it.
    Broadcast(Option<String>),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Info => "info",
            Self::ListChats => "list_chats",
            Self::RemoveChat(_) => "remove_chat",
            Self::Broadcast(_) => "broadcast",
        }
    }
}

/// How a piece of inbound text should be handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    Command(Command),
    /// Looks like a command but is not in the table.
    Unknown(String),
    Message,
}

/// Classifies `text` by its first whitespace-separated token.
///
/// The token must start with `/`; an `@botname` suffix is ignored. Returns
/// [`ChronobotError::MalformedInput`] when a known command has unusable
/// arguments.
pub fn classify(text: &str) -> Result<Classified, ChronobotError> {
    let trimmed = text.trim_start();
    let (head, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest),
        None => (trimmed, ""),
    };

    let Some(name) = head.strip_prefix('/') else {
        return Ok(Classified::Message);
    };
    let name = name.split('@').next().unwrap_or_default();

    let command = match name {
        "start" => Command::Start,
        "info" => Command::Info,
        "list_chats" => Command::ListChats,
        "remove_chat" => Command::RemoveChat(parse_remove_target(rest)?),
        "broadcast" => {
            let payload = rest.trim();
            Command::Broadcast((!payload.is_empty()).then(|| payload.to_string()))
        }
        other => return Ok(Classified::Unknown(other.to_string())),
    };
    Ok(Classified::Command(command))
}

fn parse_remove_target(args: &str) -> Result<ChatId, ChronobotError> {
    let mut parts = args.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(id), None) => id.parse::<i64>().map(ChatId).map_err(|_| usage(REMOVE_CHAT_USAGE)),
        _ => Err(usage(REMOVE_CHAT_USAGE)),
    }
}

pub(crate) fn usage(text: &str) -> ChronobotError {
    ChronobotError::MalformedInput {
        usage: text.to_string(),
    }
}
