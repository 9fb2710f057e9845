// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end run loop tests against the mock platform and in-memory storage.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use chronobot_core::{ChatId, ChronobotError, PlatformErrorKind, StorageAdapter};
use chronobot_engine::{
    Dispatcher, JobAction, JobSpec, JobTarget, OutboundSender, Poller, RetryPolicy, RunLoop, RunLoopSettings,
    RunState, ScheduledJob, Scheduler, Trigger,
};
use chronobot_test_utils::{MemoryStorage, MockPlatform, ScriptedFetch, fixtures};
use tokio_util::sync::CancellationToken;

struct Fixture {
    platform: Arc<MockPlatform>,
    storage: Arc<MemoryStorage>,
    sender: Arc<OutboundSender>,
    cancel: CancellationToken,
}

impl Fixture {
    fn new(admin: Option<i64>) -> Self {
        let platform = Arc::new(MockPlatform::new());
        let sender = Arc::new(OutboundSender::new(platform.clone(), admin.map(ChatId)));
        Self {
            platform,
            storage: Arc::new(MemoryStorage::new()),
            sender,
            cancel: CancellationToken::new(),
        }
    }

    fn run_loop(&self, scheduler: Scheduler) -> RunLoop {
        let poller = Poller::new(
            self.platform.clone(),
            RetryPolicy {
                max_retries: 1,
                base_delay: Duration::from_secs(1),
            },
            Duration::from_secs(10),
        )
        .with_cancellation(self.cancel.clone());

        RunLoop::new(
            self.platform.clone(),
            self.storage.clone(),
            poller,
            Dispatcher::new(self.storage.clone(), self.sender.clone(), "chronobot"),
            scheduler,
            RunLoopSettings {
                tick_interval: Duration::from_secs(1),
                cooldown: Duration::from_secs(5),
                degraded_after: 2,
            },
        )
    }
}

fn march(day: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, day)
        .and_then(|d| d.and_hms_opt(h, m, 0))
        .expect("valid test time")
}

#[tokio::test(start_paused = true)]
async fn runs_until_cancelled_then_releases_everything() {
    let fx = Fixture::new(None);
    fx.platform
        .push_updates(fixtures::batch(vec![
            fixtures::private_text(100, 1, "/start"),
            fixtures::group_text(101, -5, "hello"),
        ]))
        .await;
    fx.platform
        .push_updates(fixtures::batch(vec![fixtures::private_text(102, 1, "again")]))
        .await;

    let run_loop = fx.run_loop(Scheduler::new());
    let state = run_loop.subscribe();
    let handle = tokio::spawn(run_loop.run(fx.cancel.clone()));

    fx.platform.wait_until_drained().await;
    fx.cancel.cancel();
    handle.await.expect("run loop task").expect("clean stop");

    assert_eq!(*state.borrow(), RunState::Stopped);
    assert_eq!(fx.platform.sent_to(ChatId(1)).await.len(), 2);
    assert_eq!(fx.platform.sent_to(ChatId(-5)).await.len(), 1);

    let offsets = fx.platform.fetch_offsets().await;
    assert_eq!(&offsets[..3], &[None, Some(102), Some(103)]);
    assert_eq!(fx.platform.acknowledged().await, vec![103]);
    assert!(fx.storage.is_closed());
    assert!(fx.platform.is_shut_down());
}

#[tokio::test(start_paused = true)]
async fn every_fetched_event_is_dispatched_exactly_once() {
    let fx = Fixture::new(None);
    for chunk in [1..4, 4..6, 6..10] {
        let events = chunk
            .map(|id| fixtures::private_text(id, 7, &format!("m{id}")))
            .collect();
        fx.platform.push_updates(fixtures::batch(events)).await;
    }

    let handle = tokio::spawn(fx.run_loop(Scheduler::new()).run(fx.cancel.clone()));
    fx.platform.wait_until_drained().await;
    fx.cancel.cancel();
    handle.await.expect("run loop task").expect("clean stop");

    let logged: Vec<String> = fx
        .storage
        .message_log()
        .await
        .into_iter()
        .map(|entry| entry.text)
        .collect();
    let expected: Vec<String> = (1..10).map(|id| format!("m{id}")).collect();
    assert_eq!(logged, expected);
}

#[tokio::test(start_paused = true)]
async fn panicking_iteration_is_survived() {
    let fx = Fixture::new(None);
    fx.platform
        .push_fetch(ScriptedFetch::Panic("adapter bug".into()))
        .await;
    fx.platform
        .push_updates(fixtures::batch(vec![fixtures::private_text(1, 3, "still here")]))
        .await;

    let handle = tokio::spawn(fx.run_loop(Scheduler::new()).run(fx.cancel.clone()));
    fx.platform.wait_until_drained().await;
    fx.cancel.cancel();
    handle.await.expect("run loop task").expect("clean stop");

    assert_eq!(
        fx.platform.sent_to(ChatId(3)).await,
        vec!["Hello, user! This is a response to your message: 'still here'."]
    );
}

#[tokio::test(start_paused = true)]
async fn panic_mid_batch_skips_only_the_panicking_event() {
    let fx = Fixture::new(None);
    fx.platform.panic_on_send_to(ChatId(22)).await;
    fx.platform
        .push_updates(fixtures::batch(vec![
            fixtures::private_text(1, 11, "first"),
            fixtures::private_text(2, 22, "second"),
            fixtures::private_text(3, 33, "third"),
        ]))
        .await;
    // Telegram hands back whatever lies at or after the new offset.
    fx.platform
        .push_updates(fixtures::batch(vec![fixtures::private_text(3, 33, "third")]))
        .await;

    let handle = tokio::spawn(fx.run_loop(Scheduler::new()).run(fx.cancel.clone()));
    fx.platform.wait_until_drained().await;
    fx.cancel.cancel();
    handle.await.expect("run loop task").expect("clean stop");

    let offsets = fx.platform.fetch_offsets().await;
    assert_eq!(&offsets[..3], &[None, Some(3), Some(4)]);
    assert_eq!(
        fx.platform.sent_to(ChatId(11)).await,
        vec!["Hello, user! This is a response to your message: 'first'."]
    );
    assert!(fx.platform.sent_to(ChatId(22)).await.is_empty());
    assert_eq!(
        fx.platform.sent_to(ChatId(33)).await,
        vec!["Hello, user! This is a response to your message: 'third'."]
    );

    let logged: Vec<String> = fx
        .storage
        .message_log()
        .await
        .into_iter()
        .map(|entry| entry.text)
        .collect();
    assert_eq!(logged, vec!["first", "second", "third"]);
}

#[tokio::test(start_paused = true)]
async fn repeated_failures_degrade_then_recover() {
    let fx = Fixture::new(None);
    for _ in 0..2 {
        fx.platform
            .push_failure(PlatformErrorKind::Permanent, "unauthorized")
            .await;
    }

    let run_loop = fx.run_loop(Scheduler::new());
    let mut state = run_loop.subscribe();
    let started = tokio::time::Instant::now();
    let handle = tokio::spawn(run_loop.run(fx.cancel.clone()));

    state
        .wait_for(|s| *s == RunState::Degraded)
        .await
        .expect("state channel open");
    // First failure cooled down before the second poll.
    assert!(started.elapsed() >= Duration::from_secs(5));

    fx.platform.wait_until_drained().await;
    fx.cancel.cancel();
    handle.await.expect("run loop task").expect("clean stop");
    assert!(fx.platform.fetch_offsets().await.len() >= 3);
}

#[tokio::test(start_paused = true)]
async fn daily_job_fires_once_with_a_fixed_clock() {
    let fx = Fixture::new(None);
    let mut scheduler = Scheduler::new();
    scheduler.register(ScheduledJob::new(
        JobSpec {
            trigger: Trigger::Daily {
                at: NaiveTime::from_hms_opt(10, 0, 0).expect("valid time"),
            },
            target: JobTarget::Chat(ChatId(-100)),
            payload: "Hello! How are you doing today?".into(),
        },
        fx.sender.clone(),
    ));
    for _ in 0..3 {
        fx.platform.push_updates(Default::default()).await;
    }

    let run_loop = fx
        .run_loop(scheduler)
        .with_clock(Arc::new(|| march(1, 10, 0)));
    let handle = tokio::spawn(run_loop.run(fx.cancel.clone()));
    fx.platform.wait_until_drained().await;
    fx.cancel.cancel();
    handle.await.expect("run loop task").expect("clean stop");

    assert_eq!(
        fx.platform.sent_to(ChatId(-100)).await,
        vec!["Hello! How are you doing today?"]
    );
}

struct PanickingAction {
    calls: AtomicUsize,
}

#[async_trait]
impl JobAction for PanickingAction {
    async fn run(&self, _chat_id: ChatId, _payload: &str) -> Result<(), ChronobotError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        panic!("job action panicked");
    }
}

#[tokio::test(start_paused = true)]
async fn panicking_daily_job_fires_once_per_day() {
    let fx = Fixture::new(None);
    let action = Arc::new(PanickingAction {
        calls: AtomicUsize::new(0),
    });
    let mut scheduler = Scheduler::new();
    scheduler.register(ScheduledJob::new(
        JobSpec {
            trigger: Trigger::Daily {
                at: NaiveTime::from_hms_opt(10, 0, 0).expect("valid time"),
            },
            target: JobTarget::Chat(ChatId(-100)),
            payload: "Hello! How are you doing today?".into(),
        },
        action.clone(),
    ));

    let run_loop = fx
        .run_loop(scheduler)
        .with_clock(Arc::new(|| march(1, 10, 0)));
    let handle = tokio::spawn(run_loop.run(fx.cancel.clone()));
    // Several cool-downs pass at the same wall-clock minute.
    tokio::time::sleep(Duration::from_secs(60)).await;
    fx.cancel.cancel();
    handle.await.expect("run loop task").expect("clean stop");

    assert_eq!(action.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn last_active_job_goes_to_latest_chat() {
    let fx = Fixture::new(None);
    let mut scheduler = Scheduler::new();
    scheduler.register(ScheduledJob::new(
        JobSpec {
            trigger: Trigger::Once {
                at: march(1, 9, 0),
            },
            target: JobTarget::LastActive,
            payload: "reminder".into(),
        },
        fx.sender.clone(),
    ));
    fx.platform
        .push_updates(fixtures::batch(vec![
            fixtures::private_text(1, 11, "hi"),
            fixtures::group_text(2, -22, "hey"),
        ]))
        .await;

    let run_loop = fx
        .run_loop(scheduler)
        .with_clock(Arc::new(|| march(1, 9, 30)));
    let handle = tokio::spawn(run_loop.run(fx.cancel.clone()));
    fx.platform.wait_until_drained().await;
    fx.cancel.cancel();
    handle.await.expect("run loop task").expect("clean stop");

    let group = fx.platform.sent_to(ChatId(-22)).await;
    assert_eq!(group.last().map(String::as_str), Some("reminder"));
    assert!(!fx.platform.sent_to(ChatId(11)).await.contains(&"reminder".to_string()));
}

#[tokio::test(start_paused = true)]
async fn failed_scheduled_send_alerts_admin() {
    let fx = Fixture::new(Some(1));
    fx.platform
        .fail_sends_to(ChatId(-9), PlatformErrorKind::Permanent)
        .await;
    let mut scheduler = Scheduler::new();
    scheduler.register(ScheduledJob::new(
        JobSpec {
            trigger: Trigger::Once {
                at: march(1, 8, 0),
            },
            target: JobTarget::Chat(ChatId(-9)),
            payload: "ping".into(),
        },
        fx.sender.clone(),
    ));

    let run_loop = fx.run_loop(scheduler).with_clock(Arc::new(|| march(1, 8, 0)));
    let handle = tokio::spawn(run_loop.run(fx.cancel.clone()));
    fx.platform.wait_until_drained().await;
    fx.cancel.cancel();
    handle.await.expect("run loop task").expect("clean stop");

    let admin = fx.platform.sent_to(ChatId(1)).await;
    assert_eq!(admin.len(), 1);
    assert!(admin[0].starts_with("Failed to send message to -9."));
}

#[tokio::test(start_paused = true)]
async fn storage_outage_does_not_stop_the_loop() {
    let fx = Fixture::new(None);
    fx.storage.set_failing(true);
    fx.platform
        .push_updates(fixtures::batch(vec![fixtures::private_text(1, 4, "lost")]))
        .await;

    let handle = tokio::spawn(fx.run_loop(Scheduler::new()).run(fx.cancel.clone()));
    fx.platform.wait_until_drained().await;
    fx.storage.set_failing(false);
    fx.cancel.cancel();
    handle.await.expect("run loop task").expect("clean stop");

    assert!(fx.platform.sent_messages().await.is_empty());
    assert_eq!(fx.platform.acknowledged().await, vec![2]);
    assert!(fx.storage.list_chats().await.expect("storage").is_empty());
}
