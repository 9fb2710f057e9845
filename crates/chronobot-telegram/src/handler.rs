// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of raw Telegram updates into platform-agnostic events, and
//! classification of Bot API failures.

use chrono::Utc;
use chronobot_core::{
    ChatId, ChatInfo, ChatKind, ChronobotError, FALLBACK_CHAT_TITLE, FetchedUpdates, InboundEvent,
    PlatformErrorKind,
};
use teloxide::RequestError;
use teloxide::types::{Chat, Message, Update, UpdateKind};
use tracing::debug;

/// Maps a Telegram chat to its kind.
pub fn chat_kind(chat: &Chat) -> ChatKind {
    if chat.is_private() {
        ChatKind::Private
    } else if chat.is_supergroup() {
        ChatKind::Supergroup
    } else if chat.is_channel() {
        ChatKind::Channel
    } else {
        ChatKind::Group
    }
}

/// Title of a chat: its title, else the username, else a fixed fallback.
pub fn chat_title(chat: &Chat) -> String {
    chat.title()
        .or_else(|| chat.username())
        .unwrap_or(FALLBACK_CHAT_TITLE)
        .to_string()
}

/// Builds the chat identity for a message.
pub fn chat_info(msg: &Message) -> ChatInfo {
    ChatInfo {
        id: ChatId(msg.chat.id.0),
        title: chat_title(&msg.chat),
        kind: chat_kind(&msg.chat),
    }
}

/// Converts one update into an event. Updates that carry no message
/// (edits, callbacks, membership changes) yield `None`.
pub fn to_inbound_event(update: &Update) -> Option<InboundEvent> {
    let msg = match &update.kind {
        UpdateKind::Message(msg) | UpdateKind::ChannelPost(msg) => msg,
        _ => {
            debug!(update_id = update.id.0, "skipping non-message update");
            return None;
        }
    };

    Some(InboundEvent {
        update_id: i64::from(update.id.0),
        chat: chat_info(msg),
        text: msg.text().map(str::to_string),
        received_at: Utc::now(),
    })
}

/// Converts a raw batch, keeping the highest update id even when the
/// update itself is skipped so the cursor moves past it.
pub fn to_fetched_updates(updates: &[Update]) -> FetchedUpdates {
    FetchedUpdates {
        events: updates.iter().filter_map(to_inbound_event).collect(),
        last_update_id: updates.iter().map(|u| i64::from(u.id.0)).max(),
    }
}

/// How a Bot API failure should be treated.
pub fn classify_request_error(err: &RequestError) -> PlatformErrorKind {
    match err {
        RequestError::RetryAfter(_) | RequestError::Network(_) => PlatformErrorKind::Transient,
        RequestError::Api(_) | RequestError::MigrateToChatId(_) => PlatformErrorKind::Permanent,
        _ => PlatformErrorKind::Unclassified,
    }
}

/// Wraps a Bot API failure as a classified platform error.
pub fn platform_error(context: &str, err: RequestError) -> ChronobotError {
    ChronobotError::platform(classify_request_error(&err), format!("{context}: {err}"))
}
