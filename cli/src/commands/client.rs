// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Client-side commands
//!
//! `pin-cert` fetches the gateway certificate over plain HTTP and stores it;
//! `info` then talks HTTPS trusting only that stored certificate.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use strongbox_sdk::{CertificatePin, StrongboxClient};

#[derive(Subcommand)]
pub enum ClientCommand {
    /// Fetch and pin the gateway certificate
    #[command(name = "pin-cert")]
    PinCert {
        /// Plain HTTP base URL, e.g. http://backup.lan:42024
        #[arg(long)]
        server: String,

        /// Client auth code
        #[arg(long, env = "STRONGBOX_TOKEN", hide_env_values = true)]
        token: String,

        /// Where to store the pinned certificate
        #[arg(long, value_name = "FILE")]
        pin: PathBuf,
    },

    /// Show this client's record
    Info {
        /// Base URL; https:// requires --pin
        #[arg(long)]
        server: String,

        /// Client auth code
        #[arg(long, env = "STRONGBOX_TOKEN", hide_env_values = true)]
        token: String,

        /// Previously pinned certificate
        #[arg(long, value_name = "FILE")]
        pin: Option<PathBuf>,
    },
}

pub async fn handle_command(command: ClientCommand) -> Result<()> {
    match command {
        ClientCommand::PinCert { server, token, pin } => pin_cert(&server, &token, pin).await,
        ClientCommand::Info { server, token, pin } => info(&server, &token, pin).await,
    }
}

async fn pin_cert(server: &str, token: &str, pin_path: PathBuf) -> Result<()> {
    let pin = CertificatePin::fetch(server, token)
        .await
        .with_context(|| format!("Failed to fetch certificate from {}", server))?;
    pin.persist(&pin_path)
        .with_context(|| format!("Failed to store certificate at {}", pin_path.display()))?;

    println!(
        "{}",
        format!("✓ Certificate pinned: {}", pin_path.display()).green()
    );
    println!(
        "{}",
        "  The first fetch is trusted as-is; verify it out of band if the network is hostile."
            .dimmed()
    );

    Ok(())
}

async fn info(server: &str, token: &str, pin_path: Option<PathBuf>) -> Result<()> {
    let client = match pin_path {
        Some(path) => {
            let pin = CertificatePin::load(&path)
                .with_context(|| format!("Failed to load pinned certificate {}", path.display()))?;
            StrongboxClient::with_pin(server, token, &pin)?
        }
        None if server.starts_with("https://") => {
            anyhow::bail!("HTTPS requires a pinned certificate; run `strongbox client pin-cert` first")
        }
        None => StrongboxClient::plaintext(server, token),
    };

    let record = client
        .client_info()
        .await
        .context("Failed to fetch client record")?;

    println!("{}", record.name.bold());
    println!("  ID: {}", record.id);
    println!("  Quota: {} bytes", record.quota);
    println!("  Used: {} bytes", record.used_space);
    println!("  Remaining: {} bytes", record.remaining());
    println!("  Created: {}", record.created_at);

    Ok(())
}
