// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for events, chats and fetched batches.

use chrono::{TimeZone, Utc};
use chronobot_core::{
    ChatId, ChatInfo, ChatKind, ChatRecord, FALLBACK_CHAT_TITLE, FetchedUpdates, InboundEvent,
};

/// Chat identity with a title derived from the id and kind.
pub fn chat(chat_id: i64, kind: ChatKind) -> ChatInfo {
    let title = match kind {
        ChatKind::Private => FALLBACK_CHAT_TITLE.to_string(),
        _ => format!("{kind} {chat_id}"),
    };
    ChatInfo {
        id: ChatId(chat_id),
        title,
        kind,
    }
}

/// An event in `chat` carrying `text`.
pub fn event(update_id: i64, chat: ChatInfo, text: Option<&str>) -> InboundEvent {
    InboundEvent {
        update_id,
        chat,
        text: text.map(str::to_string),
        received_at: Utc::now(),
    }
}

/// A text message in a private chat.
pub fn private_text(update_id: i64, chat_id: i64, text: &str) -> InboundEvent {
    event(update_id, chat(chat_id, ChatKind::Private), Some(text))
}

/// A text message in a group chat.
pub fn group_text(update_id: i64, chat_id: i64, text: &str) -> InboundEvent {
    event(update_id, chat(chat_id, ChatKind::Group), Some(text))
}

/// A stored chat with a deterministic `added_at`, `order` minutes after a
/// fixed epoch, so listings sort predictably.
pub fn chat_record(chat_id: i64, kind: ChatKind, order: u32) -> ChatRecord {
    let base = Utc
        .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);
    ChatRecord::from_chat(
        &chat(chat_id, kind),
        base + chrono::Duration::minutes(i64::from(order)),
    )
}

/// A fetched batch whose highest update id is the highest event id.
pub fn batch(events: Vec<InboundEvent>) -> FetchedUpdates {
    let last_update_id = events.iter().map(|e| e.update_id).max();
    FetchedUpdates {
        events,
        last_update_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_tracks_highest_update() {
        let b = batch(vec![private_text(3, 1, "a"), group_text(9, -2, "b")]);
        assert_eq!(b.last_update_id, Some(9));
        assert_eq!(batch(Vec::new()).last_update_id, None);
    }

    #[test]
    fn chat_records_sort_by_order() {
        let first = chat_record(5, ChatKind::Group, 0);
        let second = chat_record(1, ChatKind::Private, 1);
        assert!(first.added_at < second.added_at);
        assert_eq!(second.title, FALLBACK_CHAT_TITLE);
    }
}
