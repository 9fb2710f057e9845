// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each function takes a [`Database`](crate::Database)
//! and runs on its connection thread.

pub mod chats;
pub mod message_log;
