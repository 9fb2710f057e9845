// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-poll fetching with bounded exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use chronobot_config::model::{PollerConfig, TelegramConfig};
use chronobot_core::{ChatPlatform, FetchedUpdates, InboundEvent, UpdateCursor};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::metrics;

/// Result of one [`Poller::fetch_next_batch`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// New updates. `events` may be empty when every update was of a kind
    /// the adapter skips; the cursor still has to move.
    Batch {
        events: Vec<InboundEvent>,
        next_cursor: UpdateCursor,
    },
    /// The long poll ended with nothing new.
    Empty,
    /// Retries ran out, the error was permanent, or shutdown began mid-backoff.
    Exhausted,
}

/// Retry budget for fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (zero-based): `base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl From<&PollerConfig> for RetryPolicy {
    fn from(config: &PollerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

pub struct Poller {
    platform: Arc<dyn ChatPlatform>,
    policy: RetryPolicy,
    poll_timeout: Duration,
    cancel: CancellationToken,
}

impl Poller {
    pub fn new(platform: Arc<dyn ChatPlatform>, policy: RetryPolicy, poll_timeout: Duration) -> Self {
        Self {
            platform,
            policy,
            poll_timeout,
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_config(
        platform: Arc<dyn ChatPlatform>,
        poller: &PollerConfig,
        telegram: &TelegramConfig,
    ) -> Self {
        Self::new(
            platform,
            RetryPolicy::from(poller),
            Duration::from_secs(u64::from(telegram.poll_timeout_secs)),
        )
    }

    /// Abandons backoff sleeps once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fetches updates strictly newer than `cursor`.
    ///
    /// Transient and unclassified errors are retried with exponential
    /// backoff; permanent errors are not. Failures never escape: the caller
    /// gets [`PollOutcome::Exhausted`].
    pub async fn fetch_next_batch(&self, cursor: UpdateCursor) -> PollOutcome {
        let mut attempt = 0u32;
        loop {
            match self
                .platform
                .fetch_updates(cursor.offset(), self.poll_timeout)
                .await
            {
                Ok(fetched) => return self.outcome(cursor, fetched),
                Err(e) if e.is_retryable() && attempt < self.policy.max_retries => {
                    let delay = self.policy.delay_for(attempt);
                    attempt += 1;
                    warn!(
                        attempt,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "fetching updates failed, retrying"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = self.cancel.cancelled() => {
                            debug!("shutdown during fetch backoff");
                            metrics::record_poll("exhausted");
                            return PollOutcome::Exhausted;
                        }
                    }
                }
                Err(e) => {
                    error!(
                        attempts = attempt + 1,
                        category = %e.category(),
                        error = %e,
                        "giving up on fetching updates"
                    );
                    metrics::record_poll("exhausted");
                    return PollOutcome::Exhausted;
                }
            }
        }
    }

    fn outcome(&self, cursor: UpdateCursor, fetched: FetchedUpdates) -> PollOutcome {
        let Some(last_update_id) = fetched.last_update_id else {
            metrics::record_poll("empty");
            return PollOutcome::Empty;
        };

        let mut next_cursor = cursor;
        next_cursor.advance(UpdateCursor::after(last_update_id));

        let received = fetched.events.len();
        let events: Vec<InboundEvent> = fetched
            .events
            .into_iter()
            .filter(|event| cursor.admits(event.update_id))
            .collect();
        if events.len() < received {
            warn!(
                dropped = received - events.len(),
                cursor = %cursor,
                "platform returned already consumed updates"
            );
        }

        debug!(events = events.len(), next_cursor = %next_cursor, "fetched updates");
        metrics::record_poll("batch");
        PollOutcome::Batch {
            events,
            next_cursor,
        }
    }
}
