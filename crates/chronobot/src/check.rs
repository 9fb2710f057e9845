// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chronobot check` command implementation.
//!
//! Reports the effective configuration and schedule. Touches neither the
//! network nor the database.

use chronobot_config::ChronobotConfig;
use chronobot_core::ChronobotError;
use chronobot_engine::jobs_from_config;

/// Runs the `chronobot check` command.
pub fn run_check(config: &ChronobotConfig) -> Result<(), ChronobotError> {
    print!("{}", render_check(config)?);
    Ok(())
}

/// Builds the report printed by `chronobot check`.
pub fn render_check(config: &ChronobotConfig) -> Result<String, ChronobotError> {
    let jobs = jobs_from_config(&config.schedule)?;

    let admin = config
        .telegram
        .admin_chat_id
        .map_or_else(|| "none".to_string(), |id| id.to_string());
    let journal = if config.storage.wal_mode { "WAL" } else { "rollback journal" };
    let metrics = if config.metrics.enabled {
        format!("http://{}/metrics", config.metrics.listen_addr)
    } else {
        "disabled".to_string()
    };

    let mut lines = vec![
        "configuration OK".to_string(),
        format!("  bot.name            {}", config.bot.name),
        format!("  bot.log_level       {}", config.bot.log_level),
        "  telegram.bot_token  set".to_string(),
        format!("  admin chat          {admin}"),
        format!(
            "  long poll           {}s, {} retries from {}ms",
            config.telegram.poll_timeout_secs, config.poller.max_retries, config.poller.base_delay_ms
        ),
        format!(
            "  database            {} ({journal})",
            config.storage.database_path
        ),
        format!("  metrics             {metrics}"),
    ];

    if jobs.is_empty() {
        lines.push("schedule: no jobs".to_string());
    } else {
        lines.push(format!("schedule: {} job(s)", jobs.len()));
        lines.extend(jobs.iter().enumerate().map(|(i, job)| {
            format!("  [{i}] {} -> {}: {:?}", job.trigger, job.target, job.payload)
        }));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    Ok(out)
}
