// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chronobot serve` command implementation.
//!
//! Wires the Telegram platform, SQLite storage and the engine together and
//! runs the loop until SIGINT or SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use chronobot_config::ChronobotConfig;
use chronobot_core::{ChatId, ChronobotError, HealthStatus, PluginAdapter, StorageAdapter};
use chronobot_engine::{
    Dispatcher, OutboundSender, Poller, RunLoop, RunLoopSettings, Scheduler, metrics, shutdown,
};
use chronobot_storage::SqliteStorage;
use chronobot_telegram::TelegramPlatform;
use tracing::{debug, info, warn};

/// Runs the `chronobot serve` command.
pub async fn run_serve(config: ChronobotConfig) -> Result<(), ChronobotError> {
    init_tracing(&config.bot.log_level);
    info!(name = %config.bot.name, "starting chronobot serve");
    init_metrics(&config);

    // Built before storage so a bad credential fails without touching the database.
    let platform = Arc::new(TelegramPlatform::new(&config.telegram)?);

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;

    match platform.health_check().await {
        Ok(HealthStatus::Healthy) => info!("telegram connection verified"),
        Ok(HealthStatus::Degraded(reason) | HealthStatus::Unhealthy(reason)) => {
            warn!(reason = %reason, "telegram not reachable yet, polling anyway");
        }
        Err(e) => warn!(error = %e, "telegram health check failed"),
    }

    let cancel = shutdown::install_signal_handler();

    let admin_chat = config.telegram.admin_chat_id.map(ChatId);
    if admin_chat.is_none() {
        info!("no admin chat configured, delivery failures will only be logged");
    }
    let sender = Arc::new(OutboundSender::new(platform.clone(), admin_chat));

    let scheduler = Scheduler::from_config(&config.schedule, sender.clone())?;
    for (id, job) in scheduler.jobs() {
        let spec = job.spec();
        info!(job_id = id, trigger = %spec.trigger, target = %spec.target, "scheduled job");
    }

    let poller = Poller::from_config(platform.clone(), &config.poller, &config.telegram)
        .with_cancellation(cancel.clone());
    let dispatcher = Dispatcher::new(storage.clone(), sender, config.bot.name.clone());

    let run_loop = RunLoop::new(
        platform,
        storage,
        poller,
        dispatcher,
        scheduler,
        RunLoopSettings::from(&config.run_loop),
    );
    run_loop.run(cancel).await?;

    info!("chronobot serve shut down cleanly");
    Ok(())
}

/// Installs the Prometheus exporter when enabled. A failure is logged and
/// the bot runs without metrics.
fn init_metrics(config: &ChronobotConfig) {
    if !config.metrics.enabled {
        debug!("prometheus metrics disabled by configuration");
        metrics::register_metrics();
        return;
    }

    let installed = config
        .metrics
        .listen_addr
        .parse::<SocketAddr>()
        .map_err(|e| ChronobotError::Config(format!("invalid metrics.listen_addr: {e}")))
        .and_then(metrics::install_prometheus);
    if let Err(e) = installed {
        warn!(error = %e, "prometheus initialization failed, continuing without metrics");
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` wins over `bot.log_level`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("chronobot={},warn", log_level.to_ascii_lowercase()))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
