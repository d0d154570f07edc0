// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Strongbox CLI
//!
//! The `strongbox` binary provisions and runs a storage gateway, and carries
//! a small client for the certificate bootstrap.
//!
//! ## Commands
//!
//! - `strongbox setup` - Write the config, create storage, schema and certificates
//! - `strongbox serve` - Run the gateway listeners
//! - `strongbox config show|validate` - Configuration management
//! - `strongbox client pin-cert|info` - Trust-on-first-use client flow

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use strongbox_cli::commands::{self, ClientCommand, ConfigCommand, SetupCommand};
use strongbox_cli::daemon;
use strongbox_core::domain::gateway_config::GatewayConfigManifest;

/// Strongbox - multi-tenant storage gateway for backup clients
#[derive(Parser)]
#[command(name = "strongbox")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "STRONGBOX_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); defaults to the configured level
    #[arg(long, global = true, env = "STRONGBOX_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision a new gateway
    #[command(name = "setup")]
    Setup(SetupCommand),

    /// Run the gateway
    #[command(name = "serve")]
    Serve,

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Client-side operations against a running gateway
    #[command(name = "client")]
    Client {
        #[command(subcommand)]
        command: ClientCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging = GatewayConfigManifest::load_or_default(cli.config.clone())
        .map(|config| config.spec.observability.logging)
        .unwrap_or_default();
    let level = cli.log_level.as_deref().unwrap_or(&logging.level);
    init_logging(level, &logging.format)?;

    match cli.command {
        Some(Commands::Setup(command)) => commands::setup::execute(command, cli.config).await,
        Some(Commands::Serve) => daemon::serve(cli.config).await,
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        Some(Commands::Client { command }) => commands::client::handle_command(command).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    if format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .init();
    }

    Ok(())
}
