// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Chronobot.
//!
//! Provides SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed operations for the chat
//! registry and the inbound message log.
//!
//! All writes go through the one background thread owned by
//! [`Database`]'s `tokio_rusqlite::Connection`. Do not open additional
//! connections for writes.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
