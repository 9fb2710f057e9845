// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Chronobot.
//!
//! Provides mock adapters and event fixtures for fast, deterministic tests
//! without network access or a database.
//!
//! # Components
//!
//! - [`MockPlatform`] - scripted chat platform that records sends and acknowledgements
//! - [`MemoryStorage`] - in-memory storage adapter with failure injection
//! - [`fixtures`] - builders for events, chats, and batches

pub mod fixtures;
pub mod memory_storage;
pub mod mock_platform;

pub use memory_storage::MemoryStorage;
pub use mock_platform::{MockPlatform, ScriptedFetch};
