// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Time-triggered jobs evaluated once per run loop iteration.
//!
//! The scheduler holds no timers of its own. Each [`Scheduler::tick`] looks
//! at the wall clock it is given, fires whatever is due, and re-arms daily
//! jobs for the next calendar day.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime, NaiveTime};
use chronobot_config::model::{
    JobRepeat, ScheduleConfig, parse_local_datetime, parse_time_of_day,
};
use chronobot_core::{ChatId, ChronobotError};
use tracing::{debug, info, warn};

use crate::metrics;

/// Identifier handed out by [`Scheduler::register`].
pub type JobId = u64;

/// When a job fires. Times are local wall-clock times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Daily { at: NaiveTime },
    Once { at: NaiveDateTime },
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily { at } => write!(f, "daily at {}", at.format("%H:%M:%S")),
            Self::Once { at } => write!(f, "once at {}", at.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Where a job's payload goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobTarget {
    Chat(ChatId),
    /// The chat of the most recently dispatched event, resolved at fire time.
    LastActive,
}

impl fmt::Display for JobTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chat(id) => write!(f, "chat {id}"),
            Self::LastActive => f.write_str("last active chat"),
        }
    }
}

/// Work performed when a job fires.
#[async_trait]
pub trait JobAction: Send + Sync {
    async fn run(&self, chat_id: ChatId, payload: &str) -> Result<(), ChronobotError>;
}

/// Trigger, target and payload of a job, without an action attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub trigger: Trigger,
    pub target: JobTarget,
    pub payload: String,
}

pub struct ScheduledJob {
    spec: JobSpec,
    action: Arc<dyn JobAction>,
    next_due: Option<NaiveDateTime>,
}

impl ScheduledJob {
    pub fn new(spec: JobSpec, action: Arc<dyn JobAction>) -> Self {
        Self {
            spec,
            action,
            next_due: None,
        }
    }

    pub fn spec(&self) -> &JobSpec {
        &self.spec
    }

    /// Next firing time, once the job has been armed by a tick.
    pub fn next_due(&self) -> Option<NaiveDateTime> {
        match self.spec.trigger {
            Trigger::Daily { .. } => self.next_due,
            Trigger::Once { at } => Some(at),
        }
    }

    /// Arms a daily job on first sight and reports whether the job is due.
    fn is_due(&mut self, now: NaiveDateTime) -> bool {
        match self.spec.trigger {
            Trigger::Daily { at } => {
                let due = *self.next_due.get_or_insert_with(|| occurrence_at_or_after(at, now));
                now >= due
            }
            Trigger::Once { at } => now >= at,
        }
    }
}

/// Counts from one [`Scheduler::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Due jobs whose action succeeded.
    pub fired: usize,
    /// Due jobs with no chat to send to. They are consumed like fired jobs.
    pub skipped: usize,
    /// Due jobs whose action returned an error.
    pub failed: usize,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.fired == 0 && self.skipped == 0 && self.failed == 0
    }
}

#[derive(Default)]
pub struct Scheduler {
    jobs: BTreeMap<JobId, ScheduledJob>,
    next_id: JobId,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a scheduler holding every job configured in `config`.
    pub fn from_config(
        config: &ScheduleConfig,
        action: Arc<dyn JobAction>,
    ) -> Result<Self, ChronobotError> {
        let mut scheduler = Self::new();
        for spec in jobs_from_config(config)? {
            scheduler.register(ScheduledJob::new(spec, action.clone()));
        }
        Ok(scheduler)
    }

    pub fn register(&mut self, job: ScheduledJob) -> JobId {
        let id = self.next_id;
        self.next_id += 1;
        debug!(
            job_id = id,
            trigger = %job.spec.trigger,
            target = %job.spec.target,
            "registered job"
        );
        self.jobs.insert(id, job);
        id
    }

    /// Removes a job. Returns `false` if it was unknown or already consumed.
    pub fn cancel(&mut self, id: JobId) -> bool {
        self.jobs.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn jobs(&self) -> impl Iterator<Item = (JobId, &ScheduledJob)> {
        self.jobs.iter().map(|(id, job)| (*id, job))
    }

    /// Fires every job due at `now`, in registration order.
    ///
    /// `LastActive` targets resolve to `last_active`. A due job is re-armed
    /// or removed before its action runs, so an action that panics cannot
    /// fire again for the same occurrence. Once jobs are removed; daily jobs
    /// move to the first occurrence after `now`.
    pub async fn tick(&mut self, now: NaiveDateTime, last_active: Option<ChatId>) -> TickReport {
        let mut report = TickReport::default();
        let due: Vec<JobId> = self
            .jobs
            .iter_mut()
            .filter_map(|(&id, job)| job.is_due(now).then_some(id))
            .collect();

        for id in due {
            let Some(job) = self.jobs.get_mut(&id) else {
                continue;
            };
            let action = job.action.clone();
            let payload = job.spec.payload.clone();
            let target = match job.spec.target {
                JobTarget::Chat(chat_id) => Some(chat_id),
                JobTarget::LastActive => last_active,
            };
            let trigger = job.spec.trigger;
            match trigger {
                Trigger::Daily { at } => job.next_due = Some(occurrence_after(at, now)),
                Trigger::Once { .. } => {
                    self.jobs.remove(&id);
                }
            }

            let Some(chat_id) = target else {
                warn!(job_id = id, "no active chat yet, skipping scheduled message");
                metrics::record_job("skipped");
                report.skipped += 1;
                continue;
            };

            match action.run(chat_id, &payload).await {
                Ok(()) => {
                    info!(job_id = id, chat_id = %chat_id, "scheduled message sent");
                    metrics::record_job("fired");
                    report.fired += 1;
                }
                Err(e) => {
                    warn!(job_id = id, chat_id = %chat_id, error = %e, "scheduled job failed");
                    metrics::record_job("failed");
                    report.failed += 1;
                }
            }
        }

        report
    }
}

/// Builds job specs from the `[schedule]` section.
///
/// The daily greeting, when enabled, comes first, followed by
/// `[[schedule.jobs]]` in file order. Jobs without a chat target the last
/// active chat.
pub fn jobs_from_config(config: &ScheduleConfig) -> Result<Vec<JobSpec>, ChronobotError> {
    let mut specs = Vec::with_capacity(config.jobs.len() + 1);

    if config.daily_enabled {
        let at = parse_time_of_day(&config.daily_at).ok_or_else(|| {
            ChronobotError::Config(format!("invalid schedule.daily_at `{}`", config.daily_at))
        })?;
        specs.push(JobSpec {
            trigger: Trigger::Daily { at },
            target: target_for(config.daily_chat_id),
            payload: config.daily_message.clone(),
        });
    }

    for (i, job) in config.jobs.iter().enumerate() {
        let trigger = match job.repeat {
            JobRepeat::Daily => parse_time_of_day(&job.at).map(|at| Trigger::Daily { at }),
            JobRepeat::Once => parse_local_datetime(&job.at).map(|at| Trigger::Once { at }),
        }
        .ok_or_else(|| {
            ChronobotError::Config(format!("invalid schedule.jobs[{i}].at `{}`", job.at))
        })?;
        specs.push(JobSpec {
            trigger,
            target: target_for(job.chat_id),
            payload: job.message.clone(),
        });
    }

    Ok(specs)
}

fn target_for(chat_id: Option<i64>) -> JobTarget {
    chat_id.map_or(JobTarget::LastActive, |id| JobTarget::Chat(ChatId(id)))
}

fn occurrence_at_or_after(at: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today >= now {
        today
    } else {
        today + Duration::days(1)
    }
}

fn occurrence_after(at: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronobot_config::model::JobConfig;
    use chronobot_core::PlatformErrorKind;
    use chrono::NaiveDate;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(ChatId, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl JobAction for Recorder {
        async fn run(&self, chat_id: ChatId, payload: &str) -> Result<(), ChronobotError> {
            self.calls.lock().await.push((chat_id, payload.to_string()));
            if self.fail {
                Err(ChronobotError::platform(PlatformErrorKind::Permanent, "blocked"))
            } else {
                Ok(())
            }
        }
    }

    fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .and_then(|d| d.and_hms_opt(h, m, s))
            .unwrap()
    }

    fn ten() -> NaiveTime {
        NaiveTime::from_hms_opt(10, 0, 0).unwrap()
    }

    fn daily(target: JobTarget, action: Arc<Recorder>) -> ScheduledJob {
        ScheduledJob::new(
            JobSpec {
                trigger: Trigger::Daily { at: ten() },
                target,
                payload: "good morning".into(),
            },
            action,
        )
    }

    #[tokio::test]
    async fn daily_job_fires_once_per_day() {
        let recorder = Arc::new(Recorder::default());
        let mut scheduler = Scheduler::new();
        scheduler.register(daily(JobTarget::Chat(ChatId(1)), recorder.clone()));

        assert!(scheduler.tick(at(1, 9, 59, 59), None).await.is_idle());
        assert_eq!(scheduler.tick(at(1, 10, 0, 0), None).await.fired, 1);
        // Repeated ticks in the same second and later that day do nothing.
        assert!(scheduler.tick(at(1, 10, 0, 0), None).await.is_idle());
        assert!(scheduler.tick(at(1, 10, 0, 1), None).await.is_idle());
        assert!(scheduler.tick(at(1, 23, 59, 59), None).await.is_idle());

        assert_eq!(scheduler.tick(at(2, 10, 0, 0), None).await.fired, 1);
        assert_eq!(recorder.calls.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn daily_job_armed_after_its_time_waits_for_tomorrow() {
        let recorder = Arc::new(Recorder::default());
        let mut scheduler = Scheduler::new();
        scheduler.register(daily(JobTarget::Chat(ChatId(1)), recorder.clone()));

        assert!(scheduler.tick(at(1, 10, 30, 0), None).await.is_idle());
        let (_, job) = scheduler.jobs().next().unwrap();
        assert_eq!(job.next_due(), Some(at(2, 10, 0, 0)));

        assert_eq!(scheduler.tick(at(2, 10, 0, 5), None).await.fired, 1);
    }

    #[tokio::test]
    async fn missed_day_fires_once_then_rearms() {
        let recorder = Arc::new(Recorder::default());
        let mut scheduler = Scheduler::new();
        scheduler.register(daily(JobTarget::Chat(ChatId(1)), recorder.clone()));

        scheduler.tick(at(1, 9, 0, 0), None).await;
        // Process was stalled for two days.
        assert_eq!(scheduler.tick(at(3, 11, 0, 0), None).await.fired, 1);
        let (_, job) = scheduler.jobs().next().unwrap();
        assert_eq!(job.next_due(), Some(at(4, 10, 0, 0)));
    }

    #[tokio::test]
    async fn once_job_fires_and_is_removed() {
        let recorder = Arc::new(Recorder::default());
        let mut scheduler = Scheduler::new();
        scheduler.register(ScheduledJob::new(
            JobSpec {
                trigger: Trigger::Once { at: at(5, 12, 0, 0) },
                target: JobTarget::Chat(ChatId(9)),
                payload: "reminder".into(),
            },
            recorder.clone(),
        ));

        assert!(scheduler.tick(at(5, 11, 59, 59), None).await.is_idle());
        assert_eq!(scheduler.tick(at(5, 12, 0, 0), None).await.fired, 1);
        assert!(scheduler.is_empty());
        assert!(scheduler.tick(at(5, 12, 0, 1), None).await.is_idle());
        assert_eq!(
            *recorder.calls.lock().await,
            vec![(ChatId(9), "reminder".to_string())]
        );
    }

    #[tokio::test]
    async fn last_active_target_resolves_at_fire_time() {
        let recorder = Arc::new(Recorder::default());
        let mut scheduler = Scheduler::new();
        scheduler.register(daily(JobTarget::LastActive, recorder.clone()));

        scheduler.tick(at(1, 9, 0, 0), Some(ChatId(3))).await;
        scheduler.tick(at(1, 10, 0, 0), Some(ChatId(4))).await;
        assert_eq!(recorder.calls.lock().await[0].0, ChatId(4));
    }

    #[tokio::test]
    async fn last_active_without_chat_is_skipped_and_consumed() {
        let recorder = Arc::new(Recorder::default());
        let mut scheduler = Scheduler::new();
        scheduler.register(daily(JobTarget::LastActive, recorder.clone()));

        scheduler.tick(at(1, 9, 0, 0), None).await;
        let report = scheduler.tick(at(1, 10, 0, 0), None).await;
        assert_eq!(report.skipped, 1);
        assert_eq!(report.fired, 0);
        // A chat showing up later the same day does not trigger a late send.
        assert!(scheduler.tick(at(1, 10, 5, 0), Some(ChatId(2))).await.is_idle());
        assert!(recorder.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn failed_action_is_counted_and_rearmed() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Recorder::default()
        });
        let mut scheduler = Scheduler::new();
        scheduler.register(daily(JobTarget::Chat(ChatId(1)), recorder.clone()));

        scheduler.tick(at(1, 9, 0, 0), None).await;
        assert_eq!(scheduler.tick(at(1, 10, 0, 0), None).await.failed, 1);
        assert!(scheduler.tick(at(1, 10, 0, 1), None).await.is_idle());
        assert_eq!(scheduler.tick(at(2, 10, 0, 0), None).await.failed, 1);
    }

    struct Exploding {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl JobAction for Exploding {
        async fn run(&self, _chat_id: ChatId, _payload: &str) -> Result<(), ChronobotError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            panic!("action blew up after sending");
        }
    }

    #[tokio::test]
    async fn panicking_action_does_not_refire_the_same_occurrence() {
        use futures::FutureExt;
        use std::panic::AssertUnwindSafe;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let action = Arc::new(Exploding {
            calls: AtomicUsize::new(0),
        });
        let mut scheduler = Scheduler::new();
        scheduler.register(ScheduledJob::new(
            JobSpec {
                trigger: Trigger::Daily { at: ten() },
                target: JobTarget::Chat(ChatId(1)),
                payload: "good morning".into(),
            },
            action.clone(),
        ));
        scheduler.register(ScheduledJob::new(
            JobSpec {
                trigger: Trigger::Once { at: at(1, 10, 0, 0) },
                target: JobTarget::Chat(ChatId(2)),
                payload: "reminder".into(),
            },
            action.clone(),
        ));

        scheduler.tick(at(1, 9, 0, 0), None).await;
        for _ in 0..5 {
            let _ = AssertUnwindSafe(scheduler.tick(at(1, 10, 0, 0), None))
                .catch_unwind()
                .await;
        }

        // The daily job panics once, then the once job panics once.
        assert_eq!(action.calls.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.len(), 1);
        let (_, job) = scheduler.jobs().next().unwrap();
        assert_eq!(job.next_due(), Some(at(2, 10, 0, 0)));
    }

    #[tokio::test]
    async fn cancel_removes_a_job() {
        let recorder = Arc::new(Recorder::default());
        let mut scheduler = Scheduler::new();
        let id = scheduler.register(daily(JobTarget::Chat(ChatId(1)), recorder.clone()));

        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        assert!(scheduler.tick(at(1, 10, 0, 0), None).await.is_idle());
    }

    #[test]
    fn config_jobs_follow_the_daily_greeting() {
        let config = ScheduleConfig {
            daily_chat_id: Some(-100),
            jobs: vec![
                JobConfig {
                    chat_id: None,
                    message: "stand-up".into(),
                    at: "09:30".into(),
                    repeat: JobRepeat::Daily,
                },
                JobConfig {
                    chat_id: Some(5),
                    message: "launch".into(),
                    at: "2026-12-31 23:59".into(),
                    repeat: JobRepeat::Once,
                },
            ],
            ..ScheduleConfig::default()
        };

        let specs = jobs_from_config(&config).unwrap();
        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].trigger, Trigger::Daily { at: ten() });
        assert_eq!(specs[0].target, JobTarget::Chat(ChatId(-100)));
        assert_eq!(specs[1].target, JobTarget::LastActive);
        assert_eq!(specs[2].trigger.to_string(), "once at 2026-12-31 23:59:00");
    }

    #[test]
    fn disabled_greeting_is_not_scheduled() {
        let config = ScheduleConfig {
            daily_enabled: false,
            daily_at: "not a time".into(),
            ..ScheduleConfig::default()
        };
        assert!(jobs_from_config(&config).unwrap().is_empty());
    }

    #[test]
    fn bad_job_time_is_a_config_error() {
        let config = ScheduleConfig {
            jobs: vec![JobConfig {
                chat_id: None,
                message: "x".into(),
                at: "25:00".into(),
                repeat: JobRepeat::Daily,
            }],
            ..ScheduleConfig::default()
        };
        let err = jobs_from_config(&config).unwrap_err();
        assert!(err.to_string().contains("schedule.jobs[0].at"));
    }
}
