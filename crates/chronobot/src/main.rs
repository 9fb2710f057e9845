// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chronobot - a Telegram bot that answers, records chats and sends
//! scheduled messages.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod check;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Chronobot - a Telegram bot with scheduled messages.
#[derive(Parser, Debug)]
#[command(name = "chronobot", version, about, long_about = None)]
struct Cli {
    /// Configuration file to load instead of the standard locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Run the bot (default).
    Serve,
    /// Validate the configuration and print the effective schedule.
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => chronobot_config::load_and_validate_path(path),
        None => chronobot_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            chronobot_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Check => check::run_check(&config),
    };

    if let Err(e) = result {
        eprintln!("chronobot: {e}");
        std::process::exit(1);
    }
}
