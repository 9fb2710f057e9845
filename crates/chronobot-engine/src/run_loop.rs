// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The top-level polling loop.
//!
//! One iteration polls, dispatches each event in arrival order, then ticks
//! the scheduler. Failed iterations (dispatch errors, exhausted polls,
//! panics) pause for a cool-down before the next poll. The loop only ends
//! when its [`CancellationToken`] fires.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use chronobot_config::model::RunLoopConfig;
use chronobot_core::{ChatId, ChatPlatform, ChronobotError, StorageAdapter, UpdateCursor};
use futures::FutureExt;
use strum::Display;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dispatcher::Dispatcher;
use crate::metrics;
use crate::poller::{PollOutcome, Poller};
use crate::scheduler::{Scheduler, TickReport};

/// Lifecycle of the run loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum RunState {
    /// Between iterations.
    Idle,
    Polling,
    Dispatching,
    /// Too many consecutive failed iterations; cooling down.
    Degraded,
    Stopped,
}

/// Timing knobs for the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLoopSettings {
    pub tick_interval: Duration,
    pub cooldown: Duration,
    pub degraded_after: u32,
}

impl From<&RunLoopConfig> for RunLoopSettings {
    fn from(config: &RunLoopConfig) -> Self {
        Self {
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            cooldown: Duration::from_secs(config.cooldown_secs),
            degraded_after: config.degraded_after,
        }
    }
}

/// Source of the local wall-clock time handed to the scheduler.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// The system clock in local time.
pub fn local_clock() -> Clock {
    Arc::new(|| Local::now().naive_local())
}

/// What happened during one iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationReport {
    pub events: usize,
    pub dispatch_errors: usize,
    /// The poller gave up.
    pub exhausted: bool,
    pub tick: TickReport,
}

impl IterationReport {
    pub fn failed(&self) -> bool {
        self.exhausted || self.dispatch_errors > 0
    }
}

pub struct RunLoop {
    platform: Arc<dyn ChatPlatform>,
    storage: Arc<dyn StorageAdapter>,
    poller: Poller,
    dispatcher: Dispatcher,
    scheduler: Scheduler,
    settings: RunLoopSettings,
    clock: Clock,
    cursor: UpdateCursor,
    last_active: Option<ChatId>,
    consecutive_failures: u32,
    state: watch::Sender<RunState>,
}

impl RunLoop {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        storage: Arc<dyn StorageAdapter>,
        poller: Poller,
        dispatcher: Dispatcher,
        scheduler: Scheduler,
        settings: RunLoopSettings,
    ) -> Self {
        let (state, _) = watch::channel(RunState::Idle);
        Self {
            platform,
            storage,
            poller,
            dispatcher,
            scheduler,
            settings,
            clock: local_clock(),
            cursor: UpdateCursor::unset(),
            last_active: None,
            consecutive_failures: 0,
            state,
        }
    }

    /// Replaces the clock used for scheduler ticks.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Watch state transitions from another task.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    pub fn cursor(&self) -> UpdateCursor {
        self.cursor
    }

    pub fn last_active(&self) -> Option<ChatId> {
        self.last_active
    }

    /// Runs until `cancel` fires, then acknowledges the cursor and releases
    /// storage and the platform.
    ///
    /// Returns the storage close error, if any.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), ChronobotError> {
        info!(
            tick_interval_ms = self.settings.tick_interval.as_millis() as u64,
            cooldown_secs = self.settings.cooldown.as_secs(),
            jobs = self.scheduler.len(),
            "run loop started"
        );

        while !cancel.is_cancelled() {
            let failed = match AssertUnwindSafe(self.run_iteration()).catch_unwind().await {
                Ok(report) => report.failed(),
                Err(panic) => {
                    error!(
                        panic = %panic_message(panic.as_ref()),
                        cursor = %self.cursor,
                        "run loop iteration panicked"
                    );
                    true
                }
            };

            let pause = self.settle(failed);
            let slept = tokio::select! {
                _ = tokio::time::sleep(pause) => true,
                _ = cancel.cancelled() => false,
            };
            if !slept {
                break;
            }
        }

        self.stop().await
    }

    /// Polls once, dispatches what arrived and ticks the scheduler.
    ///
    /// The cursor moves past each event before it is dispatched, so an event
    /// that fails or panics is not fetched again.
    pub async fn run_iteration(&mut self) -> IterationReport {
        let mut report = IterationReport::default();

        self.set_state(RunState::Polling);
        match self.poller.fetch_next_batch(self.cursor).await {
            PollOutcome::Batch {
                events,
                next_cursor,
            } => {
                self.set_state(RunState::Dispatching);
                report.events = events.len();
                for event in &events {
                    self.cursor.advance(UpdateCursor::after(event.update_id));
                    self.last_active = Some(event.chat.id);
                    if let Err(e) = self.dispatcher.dispatch(event).await {
                        report.dispatch_errors += 1;
                        error!(
                            update_id = event.update_id,
                            chat_id = %event.chat.id,
                            category = %e.category(),
                            error = %e,
                            "failed to dispatch event"
                        );
                    }
                }
                self.cursor.advance(next_cursor);
            }
            PollOutcome::Empty => {}
            PollOutcome::Exhausted => report.exhausted = true,
        }

        let now = (self.clock)();
        report.tick = self.scheduler.tick(now, self.last_active).await;
        if !report.tick.is_idle() {
            debug!(
                fired = report.tick.fired,
                skipped = report.tick.skipped,
                failed = report.tick.failed,
                "scheduler tick"
            );
        }
        report
    }

    /// Updates the failure streak and returns how long to pause.
    fn settle(&mut self, failed: bool) -> Duration {
        if !failed {
            if self.consecutive_failures > 0 {
                info!(
                    failures = self.consecutive_failures,
                    "run loop recovered"
                );
            }
            self.consecutive_failures = 0;
            metrics::record_iteration(false, 0);
            self.set_state(RunState::Idle);
            return self.settings.tick_interval;
        }

        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        metrics::record_iteration(true, self.consecutive_failures);
        if self.consecutive_failures >= self.settings.degraded_after {
            if self.consecutive_failures == self.settings.degraded_after {
                warn!(
                    failures = self.consecutive_failures,
                    "run loop degraded"
                );
            }
            self.set_state(RunState::Degraded);
        } else {
            self.set_state(RunState::Idle);
        }
        warn!(
            failures = self.consecutive_failures,
            cooldown_secs = self.settings.cooldown.as_secs(),
            "iteration failed, cooling down"
        );
        self.settings.cooldown
    }

    async fn stop(&mut self) -> Result<(), ChronobotError> {
        info!(cursor = %self.cursor, "run loop stopping");

        if let Some(offset) = self.cursor.offset()
            && let Err(e) = self.platform.acknowledge_offset(offset).await
        {
            warn!(offset, error = %e, "failed to acknowledge update offset");
        }

        let closed = self.storage.close().await;
        if let Err(e) = &closed {
            error!(error = %e, "failed to close storage");
        }

        if let Err(e) = self.platform.shutdown().await {
            warn!(error = %e, "platform shutdown failed");
        }

        self.set_state(RunState::Stopped);
        info!("run loop stopped");
        closed
    }

    fn set_state(&self, state: RunState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "run state changed");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
