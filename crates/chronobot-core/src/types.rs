// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the platform adapter, storage, and engine crates.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Stable identifier of a chat on the remote platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of conversation a chat represents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    /// One-to-one conversation with a user.
    pub fn is_private(self) -> bool {
        matches!(self, Self::Private)
    }
}

/// Title used when a chat has neither a title nor a username.
pub const FALLBACK_CHAT_TITLE: &str = "Private Chat";

/// Chat identity as observed on an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatInfo {
    pub id: ChatId,
    pub title: String,
    pub kind: ChatKind,
}

/// A stored chat. Created on first contact, removed only on explicit request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub chat_id: ChatId,
    pub title: String,
    pub kind: ChatKind,
    pub added_at: DateTime<Utc>,
}

impl ChatRecord {
    /// Builds the record for a chat first seen at `added_at`.
    pub fn from_chat(chat: &ChatInfo, added_at: DateTime<Utc>) -> Self {
        Self {
            chat_id: chat.id,
            title: chat.title.clone(),
            kind: chat.kind,
            added_at,
        }
    }
}

/// Append-only record of an inbound message.
///
/// `chat_id` refers to a [`ChatRecord`] but the reference is not enforced;
/// entries outlive removed chats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageLogEntry {
    pub chat_id: ChatId,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// A single inbound item from the remote platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Platform update identifier, unique and increasing.
    pub update_id: i64,
    pub chat: ChatInfo,
    /// Message text. `None` for media-only messages.
    pub text: Option<String>,
    pub received_at: DateTime<Utc>,
}

/// Result of one `getUpdates`-style call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedUpdates {
    /// Events the engine understands, in platform order.
    pub events: Vec<InboundEvent>,
    /// Highest update id in the raw batch, including updates that were not
    /// turned into events. `None` when the platform returned nothing.
    pub last_update_id: Option<i64>,
}

/// Boundary marking which platform updates have already been consumed.
///
/// Holds the identifier of the last consumed update + 1. Starts unset and
/// never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateCursor(Option<i64>);

impl UpdateCursor {
    /// A cursor that has not consumed anything yet.
    pub const fn unset() -> Self {
        Self(None)
    }

    /// The cursor positioned just past `update_id`.
    pub fn after(update_id: i64) -> Self {
        Self(Some(update_id.saturating_add(1)))
    }

    /// Lower bound to pass to the platform, if any.
    pub fn offset(&self) -> Option<i64> {
        self.0
    }

    pub fn is_unset(&self) -> bool {
        self.0.is_none()
    }

    /// Whether an update with this id has not been consumed yet.
    pub fn admits(&self, update_id: i64) -> bool {
        self.0.is_none_or(|offset| update_id >= offset)
    }

    /// Moves the cursor forward to `next`. Returns `true` if it moved.
    ///
    /// Moving to an unset or lower position is ignored.
    pub fn advance(&mut self, next: UpdateCursor) -> bool {
        match (self.0, next.0) {
            (_, None) => false,
            (Some(current), Some(candidate)) if candidate <= current => false,
            (_, Some(candidate)) => {
                self.0 = Some(candidate);
                true
            }
        }
    }
}

impl fmt::Display for UpdateCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(offset) => write!(f, "{offset}"),
            None => f.write_str("unset"),
        }
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Platform,
    Storage,
}
