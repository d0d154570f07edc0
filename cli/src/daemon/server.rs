// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Gateway HTTP server

use anyhow::{Context, Result};
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use strongbox_core::{
    application::{
        AuthenticationGate, ClientService, FileGateway, QuotaLedger, StandardClientService,
        StandardFileGateway, TenantLocks,
    },
    domain::{gateway_config::GatewayConfigManifest, repository::StorageBackend, space_probe::SpaceProbe},
    infrastructure::{
        certs::{provision_certificates, server_tls_config, CertificatePaths},
        repositories::build_client_repository,
        space_probe::PlatformSpaceProbe,
    },
    presentation::api::{app, bootstrap_app, AppState, SharedState},
};

use super::shutdown_signal;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Wire the registry, ledger, locks and services described by `config`.
pub async fn build_state(config: &GatewayConfigManifest) -> Result<SharedState> {
    let spec = &config.spec;

    let repository = build_client_repository(&StorageBackend::from_url(&spec.database.url))
        .await
        .context("Failed to open client registry")?;

    std::fs::create_dir_all(&spec.storage.path).with_context(|| {
        format!(
            "Failed to create storage root {}",
            spec.storage.path.display()
        )
    })?;

    let probe: Arc<dyn SpaceProbe> = Arc::new(PlatformSpaceProbe::new());
    let ledger = Arc::new(QuotaLedger::new(
        probe,
        repository.clone(),
        spec.storage.path.clone(),
    ));
    let locks = Arc::new(TenantLocks::new());

    let clients: Arc<dyn ClientService> = Arc::new(StandardClientService::new(
        repository.clone(),
        ledger,
        locks.clone(),
    ));
    let files: Arc<dyn FileGateway> = Arc::new(StandardFileGateway::new(
        repository.clone(),
        locks,
        spec.storage.path.clone(),
    ));
    let auth = Arc::new(AuthenticationGate::new(
        spec.admin.username.clone(),
        spec.admin.password_hash.clone(),
        repository,
    ));

    let tls = &spec.network.tls;
    let certs_dir = tls.enabled.then(|| tls.certs_path.clone());

    Ok(Arc::new(AppState::new(auth, clients, files, certs_dir)))
}

fn socket_addr(bind_address: &str, port: u16) -> Result<SocketAddr> {
    let ip: IpAddr = bind_address
        .parse()
        .with_context(|| format!("Invalid bind address '{}'", bind_address))?;
    Ok(SocketAddr::new(ip, port))
}

/// Load the configuration and run the listeners until shutdown.
pub async fn serve(config_path: Option<PathBuf>) -> Result<()> {
    let config = GatewayConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;

    info!(
        gateway = %config.metadata.name,
        storage = %config.spec.storage.path.display(),
        "Strongbox starting"
    );

    if let Some(metrics) = config
        .spec
        .observability
        .metrics
        .as_ref()
        .filter(|m| m.enabled)
    {
        let addr = socket_addr(&config.spec.network.bind_address, metrics.port)?;
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to start metrics exporter")?;
        info!(%addr, "Metrics exporter listening");
    }

    let state = build_state(&config).await?;

    let handle = Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    let network = &config.spec.network;
    let http_addr = socket_addr(&network.bind_address, network.port)?;

    if network.tls.enabled {
        let certs_dir = &network.tls.certs_path;
        if !CertificatePaths::in_dir(certs_dir).all_exist() {
            warn!(dir = %certs_dir.display(), "Certificates missing, provisioning new ones");
            provision_certificates(certs_dir, network.tls.hostname.as_deref())
                .context("Failed to provision certificates")?;
        }
        let tls_config = server_tls_config(certs_dir).context("Failed to load TLS material")?;
        let https_addr = socket_addr(&network.bind_address, network.tls.port)?;

        info!(%https_addr, "HTTPS API listening");
        info!(%http_addr, "Certificate bootstrap listening");

        let https = axum_server::bind_rustls(https_addr, RustlsConfig::from_config(tls_config))
            .handle(handle.clone())
            .serve(app(state.clone()).into_make_service());
        let bootstrap = axum_server::bind(http_addr)
            .handle(handle)
            .serve(bootstrap_app(state).into_make_service());

        tokio::try_join!(https, bootstrap).context("HTTP server failed")?;
    } else {
        warn!(%http_addr, "TLS disabled, serving the full API over plain HTTP");
        axum_server::bind(http_addr)
            .handle(handle)
            .serve(app(state).into_make_service())
            .await
            .context("HTTP server failed")?;
    }

    info!("Strongbox shutting down");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr_accepts_v4_and_v6() {
        assert_eq!(
            socket_addr("127.0.0.1", 42024).unwrap().to_string(),
            "127.0.0.1:42024"
        );
        assert_eq!(socket_addr("::", 42025).unwrap().to_string(), "[::]:42025");
        assert!(socket_addr("backup.lan", 1).is_err());
    }

    #[tokio::test]
    async fn test_build_state_with_in_memory_registry() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = GatewayConfigManifest::default();
        config.spec.database.url = "memory".to_string();
        config.spec.storage.path = dir.path().join("storage");
        config.spec.network.tls.enabled = false;

        let state = build_state(&config).await.unwrap();

        assert!(dir.path().join("storage").is_dir());
        assert!(state.certs_dir.is_none());
        assert!(state.clients.list_clients().await.unwrap().is_empty());
    }
}
