// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Chronobot.
//!
//! This crate provides the trait definitions, error types, and common types
//! shared by the platform adapter, storage backend, and engine.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ChronobotError, ErrorCategory, PlatformErrorKind};
pub use types::{
    AdapterType, ChatId, ChatInfo, ChatKind, ChatRecord, FALLBACK_CHAT_TITLE, FetchedUpdates,
    HealthStatus, InboundEvent, MessageLogEntry, UpdateCursor,
};

pub use traits::{ChatPlatform, PluginAdapter, StorageAdapter};
