// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat platform for deterministic testing.
//!
//! `MockPlatform` implements `ChatPlatform` with a script of fetch results,
//! per-chat send failures, and captured sends and acknowledgements for
//! assertion in tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use chronobot_core::traits::{ChatPlatform, PluginAdapter};
use chronobot_core::types::{AdapterType, ChatId, FetchedUpdates, HealthStatus};
use chronobot_core::{ChronobotError, PlatformErrorKind};

/// One scripted response to `fetch_updates`.
#[derive(Debug, Clone)]
pub enum ScriptedFetch {
    Updates(FetchedUpdates),
    Fail(PlatformErrorKind, String),
    /// Panics inside `fetch_updates`.
    Panic(String),
}

/// A mock chat platform for testing.
///
/// Fetches pop from the script in order; once the script is drained every
/// fetch returns an empty batch and wakes [`MockPlatform::wait_until_drained`].
pub struct MockPlatform {
    script: Mutex<VecDeque<ScriptedFetch>>,
    fetch_offsets: Mutex<Vec<Option<i64>>>,
    failing_chats: Mutex<HashMap<ChatId, PlatformErrorKind>>,
    panicking_chats: Mutex<HashSet<ChatId>>,
    sent: Mutex<Vec<(ChatId, String)>>,
    failed_sends: Mutex<Vec<(ChatId, String)>>,
    acknowledged: Mutex<Vec<i64>>,
    drained: Notify,
    shut_down: AtomicBool,
}

impl MockPlatform {
    /// Create a new mock platform with an empty script.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fetch_offsets: Mutex::new(Vec::new()),
            failing_chats: Mutex::new(HashMap::new()),
            panicking_chats: Mutex::new(HashSet::new()),
            sent: Mutex::new(Vec::new()),
            failed_sends: Mutex::new(Vec::new()),
            acknowledged: Mutex::new(Vec::new()),
            drained: Notify::new(),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Append a response to the fetch script.
    pub async fn push_fetch(&self, fetch: ScriptedFetch) {
        self.script.lock().await.push_back(fetch);
    }

    /// Append a successful batch to the fetch script.
    pub async fn push_updates(&self, updates: FetchedUpdates) {
        self.push_fetch(ScriptedFetch::Updates(updates)).await;
    }

    /// Append a failure to the fetch script.
    pub async fn push_failure(&self, kind: PlatformErrorKind, message: &str) {
        self.push_fetch(ScriptedFetch::Fail(kind, message.to_string()))
            .await;
    }

    /// Make every send to `chat_id` fail with `kind`.
    pub async fn fail_sends_to(&self, chat_id: ChatId, kind: PlatformErrorKind) {
        self.failing_chats.lock().await.insert(chat_id, kind);
    }

    /// Make every send to `chat_id` panic.
    pub async fn panic_on_send_to(&self, chat_id: ChatId) {
        self.panicking_chats.lock().await.insert(chat_id);
    }

    /// Messages that were delivered, in order.
    pub async fn sent_messages(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().await.clone()
    }

    /// Texts delivered to one chat, in order.
    pub async fn sent_to(&self, chat_id: ChatId) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(id, _)| *id == chat_id)
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Sends that were rejected, in order.
    pub async fn failed_sends(&self) -> Vec<(ChatId, String)> {
        self.failed_sends.lock().await.clone()
    }

    /// Offsets passed to each `fetch_updates` call.
    pub async fn fetch_offsets(&self) -> Vec<Option<i64>> {
        self.fetch_offsets.lock().await.clone()
    }

    /// Offsets passed to `acknowledge_offset`.
    pub async fn acknowledged(&self) -> Vec<i64> {
        self.acknowledged.lock().await.clone()
    }

    /// Whether `shutdown` was called.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Resolves once a fetch has found the script empty.
    pub async fn wait_until_drained(&self) {
        self.drained.notified().await;
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockPlatform {
    fn name(&self) -> &str {
        "mock-platform"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Platform
    }

    async fn health_check(&self) -> Result<HealthStatus, ChronobotError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ChronobotError> {
        self.shut_down.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for MockPlatform {
    async fn fetch_updates(
        &self,
        offset: Option<i64>,
        _timeout: Duration,
    ) -> Result<FetchedUpdates, ChronobotError> {
        self.fetch_offsets.lock().await.push(offset);
        let next = self.script.lock().await.pop_front();
        match next {
            Some(ScriptedFetch::Updates(updates)) => Ok(updates),
            Some(ScriptedFetch::Fail(kind, message)) => Err(ChronobotError::platform(kind, message)),
            Some(ScriptedFetch::Panic(message)) => panic!("{message}"),
            None => {
                self.drained.notify_one();
                Ok(FetchedUpdates::default())
            }
        }
    }

    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), ChronobotError> {
        let panics = self.panicking_chats.lock().await.contains(&chat_id);
        if panics {
            panic!("sendMessage to {chat_id} panicked");
        }
        let failure = self.failing_chats.lock().await.get(&chat_id).copied();
        match failure {
            Some(kind) => {
                self.failed_sends
                    .lock()
                    .await
                    .push((chat_id, text.to_string()));
                Err(ChronobotError::platform(
                    kind,
                    format!("sendMessage to {chat_id} rejected"),
                ))
            }
            None => {
                self.sent.lock().await.push((chat_id, text.to_string()));
                Ok(())
            }
        }
    }

    async fn acknowledge_offset(&self, offset: i64) -> Result<(), ChronobotError> {
        self.acknowledged.lock().await.push(offset);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[tokio::test]
    async fn fetch_follows_script_then_returns_empty() {
        let platform = MockPlatform::new();
        platform
            .push_updates(fixtures::batch(vec![fixtures::private_text(1, 10, "hi")]))
            .await;
        platform
            .push_failure(PlatformErrorKind::Transient, "timeout")
            .await;

        let first = platform.fetch_updates(None, Duration::ZERO).await.unwrap();
        assert_eq!(first.events.len(), 1);

        let second = platform.fetch_updates(Some(2), Duration::ZERO).await;
        assert!(second.unwrap_err().is_retryable());

        let third = platform.fetch_updates(Some(2), Duration::ZERO).await.unwrap();
        assert!(third.events.is_empty());
        assert_eq!(platform.fetch_offsets().await, vec![None, Some(2), Some(2)]);
    }

    #[tokio::test]
    async fn drained_notification_is_stored() {
        let platform = MockPlatform::new();
        platform.fetch_updates(None, Duration::ZERO).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), platform.wait_until_drained())
            .await
            .expect("drained permit should be available");
    }

    #[tokio::test]
    async fn failing_chats_reject_sends() {
        let platform = MockPlatform::new();
        platform
            .fail_sends_to(ChatId(2), PlatformErrorKind::Permanent)
            .await;

        platform.send_message(ChatId(1), "one").await.unwrap();
        let err = platform.send_message(ChatId(2), "two").await.unwrap_err();
        assert!(!err.is_retryable());

        assert_eq!(platform.sent_messages().await, vec![(ChatId(1), "one".to_string())]);
        assert_eq!(platform.failed_sends().await, vec![(ChatId(2), "two".to_string())]);
        assert_eq!(platform.sent_to(ChatId(1)).await, vec!["one".to_string()]);
    }

    #[tokio::test]
    async fn panicking_chats_panic_on_send() {
        use futures::FutureExt;
        use std::panic::AssertUnwindSafe;

        let platform = MockPlatform::new();
        platform.panic_on_send_to(ChatId(4)).await;

        let result = AssertUnwindSafe(platform.send_message(ChatId(4), "boom"))
            .catch_unwind()
            .await;
        assert!(result.is_err());
        platform.send_message(ChatId(5), "fine").await.unwrap();
        assert_eq!(platform.sent_messages().await, vec![(ChatId(5), "fine".to_string())]);
    }

    #[tokio::test]
    async fn acknowledgements_and_shutdown_are_recorded() {
        let platform = MockPlatform::new();
        platform.acknowledge_offset(77).await.unwrap();
        platform.shutdown().await.unwrap();
        assert_eq!(platform.acknowledged().await, vec![77]);
        assert!(platform.is_shut_down());
    }
}
