// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Gateway provisioning
//!
//! Writes the configuration manifest, creates the storage root, initialises
//! the client registry schema and issues the TLS certificates.

use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use strongbox_core::application::auth::hash_password;
use strongbox_core::domain::gateway_config::{local_hostname, GatewayConfigManifest};
use strongbox_core::domain::repository::StorageBackend;
use strongbox_core::infrastructure::certs::provision_certificates;
use strongbox_core::infrastructure::repositories::build_client_repository;

#[derive(Args, Debug, Clone)]
pub struct SetupCommand {
    /// Admin username for the Basic credential
    #[arg(long)]
    pub username: String,

    /// Admin secret; only its argon2 hash is stored
    #[arg(long, env = "STRONGBOX_ADMIN_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Directory holding one subdirectory per client
    #[arg(long, value_name = "DIR")]
    pub storage_path: PathBuf,

    /// SQLite connection string, or "memory"
    #[arg(long, default_value = "sqlite://strongbox.db")]
    pub database: String,

    /// Address the listeners bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Plaintext HTTP port
    #[arg(long, default_value_t = 42024)]
    pub port: u16,

    /// HTTPS port
    #[arg(long, default_value_t = 42025)]
    pub tls_port: u16,

    /// Hostname placed in the server certificate (default: this machine's)
    #[arg(long)]
    pub hostname: Option<String>,

    /// Directory for the CA and server key pairs
    #[arg(long, default_value = "certs", value_name = "DIR")]
    pub certs_path: PathBuf,

    /// Serve everything over plain HTTP
    #[arg(long)]
    pub no_tls: bool,

    /// Where to write the manifest (default: --config or ./strongbox-config.yaml)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl SetupCommand {
    /// Manifest described by the flags, with the admin secret already hashed.
    pub fn to_manifest(&self, password_hash: String) -> GatewayConfigManifest {
        let mut config = GatewayConfigManifest::default();
        let spec = &mut config.spec;

        spec.admin.username = self.username.clone();
        spec.admin.password_hash = password_hash;
        spec.storage.path = self.storage_path.clone();
        spec.database.url = self.database.clone();
        spec.network.bind_address = self.bind_address.clone();
        spec.network.port = self.port;
        spec.network.tls.enabled = !self.no_tls;
        spec.network.tls.port = self.tls_port;
        spec.network.tls.certs_path = self.certs_path.clone();
        spec.network.tls.hostname = self.hostname.clone().or_else(local_hostname);

        config
    }
}

pub async fn execute(command: SetupCommand, config_override: Option<PathBuf>) -> Result<()> {
    let output = command
        .output
        .clone()
        .or(config_override)
        .unwrap_or_else(|| PathBuf::from("./strongbox-config.yaml"));

    let password_hash = hash_password(&command.password)
        .map_err(|e| anyhow!("Failed to hash admin password: {e}"))?;
    let config = command.to_manifest(password_hash);
    config
        .validate()
        .context("Configuration validation failed")?;

    let spec = &config.spec;
    std::fs::create_dir_all(&spec.storage.path).with_context(|| {
        format!(
            "Failed to create storage root {}",
            spec.storage.path.display()
        )
    })?;
    println!("{} storage root {}", "✓".green(), spec.storage.path.display());

    build_client_repository(&StorageBackend::from_url(&spec.database.url))
        .await
        .context("Failed to initialise client registry")?;
    println!("{} client registry {}", "✓".green(), spec.database.url);

    let tls = &spec.network.tls;
    if tls.enabled {
        let paths = provision_certificates(&tls.certs_path, tls.hostname.as_deref())
            .context("Failed to provision certificates")?;
        println!(
            "{} server certificate {}",
            "✓".green(),
            paths.server_cert.display()
        );
    } else {
        println!("{}", "! TLS disabled, serving plain HTTP only".yellow());
    }

    config
        .to_yaml_file(&output)
        .with_context(|| format!("Failed to write config to {}", output.display()))?;
    println!(
        "{}",
        format!("✓ Configuration written: {}", output.display()).green()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        setup: SetupCommand,
    }

    #[test]
    fn test_flags_become_a_valid_manifest() {
        let harness = Harness::parse_from([
            "strongbox",
            "--username",
            "admin",
            "--password",
            "s3cret",
            "--storage-path",
            "/srv/strongbox",
            "--no-tls",
            "--hostname",
            "backup.lan",
        ]);
        let hash = hash_password("s3cret").unwrap();
        let config = harness.setup.to_manifest(hash);

        assert_eq!(config.spec.admin.username, "admin");
        assert_eq!(config.spec.storage.path, PathBuf::from("/srv/strongbox"));
        assert_eq!(config.spec.network.port, 42024);
        assert!(!config.spec.network.tls.enabled);
        assert_eq!(config.spec.network.tls.hostname.as_deref(), Some("backup.lan"));
        config.validate().unwrap();
    }

    #[tokio::test]
    async fn test_setup_writes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("strongbox-config.yaml");
        let command = SetupCommand {
            username: "admin".to_string(),
            password: "s3cret".to_string(),
            storage_path: dir.path().join("storage"),
            database: format!("sqlite://{}", dir.path().join("strongbox.db").display()),
            bind_address: "127.0.0.1".to_string(),
            port: 42024,
            tls_port: 42025,
            hostname: Some("localhost".to_string()),
            certs_path: dir.path().join("certs"),
            no_tls: false,
            output: Some(output.clone()),
        };

        execute(command, None).await.unwrap();

        assert!(dir.path().join("storage").is_dir());
        assert!(dir.path().join("strongbox.db").is_file());
        assert!(dir.path().join("certs").join("strongbox-cert.pem").is_file());
        let written = GatewayConfigManifest::from_yaml_file(&output).unwrap();
        written.validate().unwrap();
    }
}
