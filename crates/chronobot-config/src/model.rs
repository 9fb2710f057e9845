// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Chronobot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Top-level Chronobot configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values, but validation requires `telegram.bot_token`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChronobotConfig {
    /// Bot identity and logging.
    #[serde(default)]
    pub bot: BotConfig,

    /// Telegram Bot API settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Update fetch retry policy.
    #[serde(default)]
    pub poller: PollerConfig,

    /// Main loop cadence and failure policy.
    #[serde(default)]
    pub run_loop: RunLoopConfig,

    /// Time-triggered outbound messages.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Prometheus metrics endpoint.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Bot identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Display name used in logs and the `/info` reply.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_bot_name() -> String {
    "chronobot".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram Bot API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot API token. Required; the process refuses to start without it.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Chat that receives delivery failure diagnostics.
    #[serde(default)]
    pub admin_chat_id: Option<i64>,

    /// Long-poll timeout passed to `getUpdates`, in seconds.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u32,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            admin_chat_id: None,
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

fn default_poll_timeout_secs() -> u32 {
    10
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "chronobot.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Retry policy for fetching updates.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PollerConfig {
    /// Additional attempts after the first failed fetch.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each subsequent retry.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

/// Main loop cadence and failure handling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RunLoopConfig {
    /// Pause between iterations.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Pause after a failed iteration.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Consecutive failed iterations before the loop reports itself degraded.
    #[serde(default = "default_degraded_after")]
    pub degraded_after: u32,
}

impl Default for RunLoopConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            cooldown_secs: default_cooldown_secs(),
            degraded_after: default_degraded_after(),
        }
    }
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_cooldown_secs() -> u64 {
    5
}

fn default_degraded_after() -> u32 {
    3
}

/// Prometheus exporter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Serve `/metrics` over HTTP.
    #[serde(default)]
    pub enabled: bool,

    /// Socket address the exporter listens on.
    #[serde(default = "default_metrics_listen_addr")]
    pub listen_addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: default_metrics_listen_addr(),
        }
    }
}

fn default_metrics_listen_addr() -> String {
    "127.0.0.1:9464".to_string()
}

/// Scheduled message configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Register the daily greeting job.
    #[serde(default = "default_daily_enabled")]
    pub daily_enabled: bool,

    /// Local time of day for the daily greeting, `HH:MM` or `HH:MM:SS`.
    #[serde(default = "default_daily_at")]
    pub daily_at: String,

    /// Text of the daily greeting.
    #[serde(default = "default_daily_message")]
    pub daily_message: String,

    /// Chat that receives the daily greeting. When unset the greeting goes to
    /// the most recently active chat.
    #[serde(default)]
    pub daily_chat_id: Option<i64>,

    /// Additional jobs.
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            daily_enabled: default_daily_enabled(),
            daily_at: default_daily_at(),
            daily_message: default_daily_message(),
            daily_chat_id: None,
            jobs: Vec::new(),
        }
    }
}

fn default_daily_enabled() -> bool {
    true
}

fn default_daily_at() -> String {
    "10:00".to_string()
}

fn default_daily_message() -> String {
    "Hello! How are you doing today? How may I assist you?".to_string()
}

/// How often a configured job fires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobRepeat {
    /// Every day at `at` (`HH:MM[:SS]`).
    #[default]
    Daily,
    /// Once at `at` (`YYYY-MM-DD HH:MM[:SS]`).
    Once,
}

/// A `[[schedule.jobs]]` entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// Target chat. When unset the job targets the most recently active chat.
    #[serde(default)]
    pub chat_id: Option<i64>,

    /// Text to send.
    pub message: String,

    /// When to fire. Format depends on `repeat`.
    pub at: String,

    #[serde(default)]
    pub repeat: JobRepeat,
}

/// Parses a local time of day in `HH:MM` or `HH:MM:SS` form.
pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

/// Parses a local date-time in `YYYY-MM-DD HH:MM[:SS]` form. A `T` separator
/// is accepted as well.
pub fn parse_local_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}
