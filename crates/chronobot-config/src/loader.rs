// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./chronobot.toml` > `~/.config/chronobot/chronobot.toml`
//! > `/etc/chronobot/chronobot.toml` with environment variable overrides via the
//! `CHRONOBOT_` prefix and the legacy `BOT_TOKEN` variable.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ChronobotConfig;

/// Config sections addressable through `CHRONOBOT_<SECTION>_<KEY>`.
///
/// `run_loop` must come before any section that is a prefix of it.
const ENV_SECTIONS: &[&str] = &[
    "run_loop", "telegram", "storage", "schedule", "metrics", "poller", "bot",
];

/// Legacy variable holding the bot credential.
pub const LEGACY_TOKEN_VAR: &str = "BOT_TOKEN";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/chronobot/chronobot.toml` (system-wide)
/// 3. `~/.config/chronobot/chronobot.toml` (user XDG config)
/// 4. `./chronobot.toml` (local directory)
/// 5. `BOT_TOKEN` (legacy credential variable)
/// 6. `CHRONOBOT_*` environment variables
pub fn load_config() -> Result<ChronobotConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<ChronobotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChronobotConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ChronobotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChronobotConfig::default()))
        .merge(Toml::file(path))
        .merge(legacy_token_provider())
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ChronobotConfig::default()))
        .merge(Toml::file("/etc/chronobot/chronobot.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("chronobot/chronobot.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("chronobot.toml"))
        .merge(legacy_token_provider())
        .merge(env_provider())
}

/// Maps a lowercased, prefix-stripped env var name to a dotted config key.
///
/// Uses explicit section matching instead of `Env::split("_")` because key
/// names contain underscores: `telegram_bot_token` must become
/// `telegram.bot_token`, not `telegram.bot.token`.
pub fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
            .filter(|rest| !rest.is_empty())
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

fn env_provider() -> Env {
    Env::prefixed("CHRONOBOT_").map(|key| map_env_key(key.as_str()).into())
}

fn legacy_token_provider() -> Env {
    Env::raw()
        .only(&[LEGACY_TOKEN_VAR])
        .map(|_| "telegram.bot_token".into())
}
