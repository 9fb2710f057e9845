// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes: the required credential, schedule time formats, and
//! non-zero intervals.

use std::net::SocketAddr;

use crate::diagnostic::ConfigError;
use crate::model::{ChronobotConfig, JobRepeat, parse_local_datetime, parse_time_of_day};

const TIME_OF_DAY_FORMAT: &str = "HH:MM or HH:MM:SS";
const DATETIME_FORMAT: &str = "YYYY-MM-DD HH:MM or YYYY-MM-DD HH:MM:SS";
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ChronobotConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    match config.telegram.bot_token.as_deref().map(str::trim) {
        None | Some("") => errors.push(ConfigError::missing("telegram.bot_token")),
        Some(_) => {}
    }

    if !LOG_LEVELS.contains(&config.bot.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "bot.log_level must be one of {}, got `{}`",
                LOG_LEVELS.join(", "),
                config.bot.log_level
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    for (key, value) in [
        ("poller.base_delay_ms", config.poller.base_delay_ms),
        ("run_loop.tick_interval_ms", config.run_loop.tick_interval_ms),
        ("run_loop.cooldown_secs", config.run_loop.cooldown_secs),
        ("run_loop.degraded_after", u64::from(config.run_loop.degraded_after)),
    ] {
        if value == 0 {
            errors.push(ConfigError::Validation {
                message: format!("{key} must be greater than zero"),
            });
        }
    }

    if config.metrics.enabled && config.metrics.listen_addr.parse::<SocketAddr>().is_err() {
        errors.push(ConfigError::Validation {
            message: format!(
                "metrics.listen_addr must be a socket address such as 127.0.0.1:9464, got `{}`",
                config.metrics.listen_addr
            ),
        });
    }

    if config.schedule.daily_enabled && parse_time_of_day(&config.schedule.daily_at).is_none() {
        errors.push(ConfigError::InvalidTime {
            key: "schedule.daily_at".to_string(),
            value: config.schedule.daily_at.clone(),
            expected: TIME_OF_DAY_FORMAT,
        });
    }

    for (i, job) in config.schedule.jobs.iter().enumerate() {
        let valid = match job.repeat {
            JobRepeat::Daily => parse_time_of_day(&job.at).is_some(),
            JobRepeat::Once => parse_local_datetime(&job.at).is_some(),
        };
        if !valid {
            errors.push(ConfigError::InvalidTime {
                key: format!("schedule.jobs[{i}].at"),
                value: job.at.clone(),
                expected: match job.repeat {
                    JobRepeat::Daily => TIME_OF_DAY_FORMAT,
                    JobRepeat::Once => DATETIME_FORMAT,
                },
            });
        }
        if job.message.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("schedule.jobs[{i}].message must not be empty"),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
