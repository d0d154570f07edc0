// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use strongbox_core::domain::gateway_config::GatewayConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = GatewayConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. STRONGBOX_CONFIG_PATH: {}",
            std::env::var("STRONGBOX_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./strongbox-config.yaml");
        println!("  4. ~/.strongbox/config.yaml");
        println!("  5. /etc/strongbox/config.yaml");
        println!();
    }

    let spec = &config.spec;
    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Gateway:".bold());
    println!("  Name: {}", config.metadata.name);
    println!("  Admin: {}", spec.admin.username);
    println!();

    println!("{}", "Storage:".bold());
    println!("  Root: {}", spec.storage.path.display());
    println!("  Registry: {}", spec.database.url);
    println!();

    let network = &spec.network;
    println!("{}", "Network:".bold());
    if network.tls.enabled {
        println!(
            "  HTTPS: {}:{} (certs in {})",
            network.bind_address,
            network.tls.port,
            network.tls.certs_path.display()
        );
        println!(
            "  Bootstrap HTTP: {}:{}",
            network.bind_address, network.port
        );
        if let Some(hostname) = &network.tls.hostname {
            println!("  Certificate hostname: {}", hostname);
        }
    } else {
        println!("  HTTP: {}:{} {}", network.bind_address, network.port, "(TLS disabled)".yellow());
    }
    println!();

    let observability = &spec.observability;
    println!("{}", "Observability:".bold());
    println!(
        "  Logging: {} ({})",
        observability.logging.level, observability.logging.format
    );
    match observability.metrics.as_ref().filter(|m| m.enabled) {
        Some(metrics) => println!("  Metrics: port {}", metrics.port),
        None => println!("  Metrics: {}", "disabled".dimmed()),
    }

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = GatewayConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}
