// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Gateway Configuration Types
//
// Defines the configuration schema for a Strongbox gateway, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Administrative credential (username + argon2 hash)
// - Storage root and registry location
// - Plaintext / TLS listeners and the certificate directory
// - Logging and metrics settings
//
// The manifest is loaded once at startup and handed to every component by
// reference; nothing reads configuration from process globals afterwards.

use argon2::password_hash::PasswordHash;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const API_VERSION: &str = "strongbox/v1";
pub const KIND: &str = "GatewayConfig";

/// Top-level Kubernetes-style gateway configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfigManifest {
    /// API version (must be "strongbox/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "GatewayConfig")
    pub kind: String,

    /// Gateway metadata (name, labels)
    pub metadata: ManifestMetadata,

    /// Gateway configuration specification
    pub spec: GatewayConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable gateway name
    pub name: String,

    /// Optional: Labels for categorization and discovery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Gateway configuration specification (content under spec:)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfigSpec {
    /// Administrative credential
    pub admin: AdminConfig,

    /// Client storage root
    pub storage: StorageConfig,

    /// Client registry
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Listeners and TLS
    #[serde(default)]
    pub network: NetworkConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Username expected in the Basic credential
    pub username: String,

    /// Argon2 PHC string of the admin secret
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one subdirectory per client
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection string, or "memory" for the in-memory registry
    #[serde(default = "default_database_url")]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network bind address (e.g. "0.0.0.0" or "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Plaintext HTTP port. With TLS enabled only the certificate bootstrap
    /// endpoint is served here.
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// TLS listener configuration
    #[serde(default)]
    pub tls: TlsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Serve the API over HTTPS
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// HTTPS port
    #[serde(default = "default_tls_port")]
    pub port: u16,

    /// Directory holding the CA and server key pairs
    #[serde(default = "default_certs_path")]
    pub certs_path: PathBuf,

    /// Hostname placed in the server certificate next to localhost
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics exposition
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Prometheus listener port
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_database_url() -> String {
    "sqlite://strongbox.db".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    42024
}

fn default_tls_port() -> u16 {
    42025
}

fn default_certs_path() -> PathBuf {
    PathBuf::from("certs")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_tls_port(),
            certs_path: default_certs_path(),
            hostname: None,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_api_port(),
            tls: TlsConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for GatewayConfigSpec {
    fn default() -> Self {
        Self {
            admin: AdminConfig {
                username: "admin".to_string(),
                password_hash: String::new(),
            },
            storage: StorageConfig {
                path: PathBuf::from("storages"),
            },
            database: DatabaseConfig::default(),
            network: NetworkConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Default for GatewayConfigManifest {
    fn default() -> Self {
        let hostname = local_hostname().unwrap_or_else(|| "strongbox".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                labels: None,
            },
            spec: GatewayConfigSpec::default(),
        }
    }
}

/// Hostname of this machine, if it is valid UTF-8
pub fn local_hostname() -> Option<String> {
    hostname::get().ok().and_then(|h| h.into_string().ok())
}

impl GatewayConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file (owner-only on unix, it carries the
    /// admin hash)
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. STRONGBOX_CONFIG_PATH environment variable
    /// 2. ./strongbox-config.yaml (working directory)
    /// 3. ~/.strongbox/config.yaml (user home)
    /// 4. /etc/strongbox/config.yaml (system, Unix) or C:\ProgramData\Strongbox\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("STRONGBOX_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./strongbox-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".strongbox").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/strongbox/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Strongbox\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // 1. Explicit CLI path (Fail if missing/invalid)
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        // 2. Discovery (Env -> Cwd -> Home -> System)
        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    /// This allows container deployments to override config via env vars
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("STRONGBOX_STORAGE_PATH") {
            tracing::info!("Environment override: STRONGBOX_STORAGE_PATH={}", val);
            self.spec.storage.path = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("STRONGBOX_DATABASE_URL") {
            tracing::info!("Environment override: STRONGBOX_DATABASE_URL");
            self.spec.database.url = val;
        }

        if let Ok(val) = std::env::var("STRONGBOX_BIND_ADDRESS") {
            tracing::info!("Environment override: STRONGBOX_BIND_ADDRESS={}", val);
            self.spec.network.bind_address = val;
        }

        if let Ok(val) = std::env::var("STRONGBOX_PORT") {
            match val.parse::<u16>() {
                Ok(port) => {
                    tracing::info!("Environment override: STRONGBOX_PORT={}", port);
                    self.spec.network.port = port;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for STRONGBOX_PORT: '{}'. Expected a port number. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.admin.username.is_empty() {
            anyhow::bail!("spec.admin.username cannot be empty");
        }

        if let Err(e) = PasswordHash::new(&self.spec.admin.password_hash) {
            anyhow::bail!("spec.admin.password_hash is not a valid PHC string: {}", e);
        }

        if self.spec.storage.path.as_os_str().is_empty() {
            anyhow::bail!("spec.storage.path cannot be empty");
        }

        if self.spec.database.url.is_empty() {
            anyhow::bail!("spec.database.url cannot be empty");
        }

        let network = &self.spec.network;
        if network.tls.enabled {
            if network.tls.port == network.port {
                anyhow::bail!(
                    "spec.network.tls.port ({}) must differ from spec.network.port",
                    network.tls.port
                );
            }
            if network.tls.certs_path.as_os_str().is_empty() {
                anyhow::bail!("spec.network.tls.certs_path cannot be empty when TLS is enabled");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // argon2id hash of "secret" with a fixed salt
    const HASH: &str =
        "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$5oXH7Ghy9iBMLBS4S8fTeEHbsnfKRRxXYWS2GU6H1fc";

    fn valid_manifest() -> GatewayConfigManifest {
        let mut manifest = GatewayConfigManifest::default();
        manifest.spec.admin.password_hash = HASH.to_string();
        manifest
    }

    #[test]
    fn test_default_manifest() {
        let manifest = GatewayConfigManifest::default();
        assert_eq!(manifest.api_version, API_VERSION);
        assert_eq!(manifest.kind, KIND);
        assert!(!manifest.metadata.name.is_empty());
        assert_eq!(manifest.spec.network.port, 42024);
        assert!(manifest.spec.network.tls.enabled);
    }

    #[test]
    fn test_yaml_parse_with_defaults() {
        let yaml = r#"
apiVersion: strongbox/v1
kind: GatewayConfig
metadata:
  name: backup-01
spec:
  admin:
    username: root
    password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$5oXH7Ghy9iBMLBS4S8fTeEHbsnfKRRxXYWS2GU6H1fc"
  storage:
    path: /srv/strongbox/storages
  network:
    port: 8080
    tls:
      enabled: false
"#;
        let manifest = GatewayConfigManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.metadata.name, "backup-01");
        assert_eq!(manifest.spec.admin.username, "root");
        assert_eq!(manifest.spec.storage.path, PathBuf::from("/srv/strongbox/storages"));
        assert_eq!(manifest.spec.network.port, 8080);
        assert!(!manifest.spec.network.tls.enabled);
        assert_eq!(manifest.spec.network.tls.port, 42025);
        assert_eq!(manifest.spec.database.url, "sqlite://strongbox.db");
        assert_eq!(manifest.spec.observability.logging.level, "info");
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_yaml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let manifest = valid_manifest();
        manifest.to_yaml_file(&path).unwrap();

        let parsed = GatewayConfigManifest::from_yaml_file(&path).unwrap();
        assert_eq!(parsed.spec.admin.password_hash, HASH);
        assert_eq!(parsed.metadata.name, manifest.metadata.name);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_validation() {
        let mut manifest = valid_manifest();
        assert!(manifest.validate().is_ok());

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.kind = "WrongKind".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = KIND.to_string();

        manifest.spec.admin.username = "".to_string();
        assert!(manifest.validate().is_err());
        manifest.spec.admin.username = "admin".to_string();

        manifest.spec.admin.password_hash = "plaintext".to_string();
        assert!(manifest.validate().is_err());
        manifest.spec.admin.password_hash = HASH.to_string();

        manifest.spec.network.tls.port = manifest.spec.network.port;
        assert!(manifest.validate().is_err());
        manifest.spec.network.tls.enabled = false;
        assert!(manifest.validate().is_ok());
    }
}
