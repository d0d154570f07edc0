// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Certificate Provisioning
//!
//! Issues the gateway's private CA and the server certificate it signs, and
//! loads them back into a `rustls::ServerConfig` at serve time.
//!
//! Layout of the certificate directory:
//!
//! | File | Content |
//! |------|---------|
//! | `strongbox-ca-cert.pem` | self-signed CA certificate |
//! | `strongbox-ca-key.pem` | CA private key (0600) |
//! | `strongbox-cert.pem` | server certificate signed by the CA |
//! | `strongbox-key.pem` | server private key (0600) |
//!
//! Only `strongbox-cert.pem` ever leaves the host, through the certificate
//! bootstrap endpoint.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose,
    IsCa, KeyPair, KeyUsagePurpose,
};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use thiserror::Error;
use time::{Duration, OffsetDateTime};

pub const CA_CERT_FILE: &str = "strongbox-ca-cert.pem";
pub const CA_KEY_FILE: &str = "strongbox-ca-key.pem";
pub const SERVER_CERT_FILE: &str = "strongbox-cert.pem";
pub const SERVER_KEY_FILE: &str = "strongbox-key.pem";

const VALIDITY_DAYS: i64 = 3650;

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("Certificate I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Certificate generation failed: {0}")]
    Generation(#[from] rcgen::Error),

    #[error("Invalid PEM in {path}: {reason}")]
    Pem { path: PathBuf, reason: String },

    #[error("TLS configuration rejected: {0}")]
    Tls(#[from] rustls::Error),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> CertificateError + '_ {
    move |source| CertificateError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Paths of the four PEM files inside a certificate directory
#[derive(Debug, Clone)]
pub struct CertificatePaths {
    pub ca_cert: PathBuf,
    pub ca_key: PathBuf,
    pub server_cert: PathBuf,
    pub server_key: PathBuf,
}

impl CertificatePaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            ca_cert: dir.join(CA_CERT_FILE),
            ca_key: dir.join(CA_KEY_FILE),
            server_cert: dir.join(SERVER_CERT_FILE),
            server_key: dir.join(SERVER_KEY_FILE),
        }
    }

    pub fn all_exist(&self) -> bool {
        [&self.ca_cert, &self.ca_key, &self.server_cert, &self.server_key]
            .iter()
            .all(|p| p.is_file())
    }
}

/// Names the server certificate is valid for: loopback names plus the
/// configured hostname, if any.
pub fn subject_alt_names(hostname: Option<&str>) -> Vec<String> {
    let mut names = vec![
        "localhost".to_string(),
        "127.0.0.1".to_string(),
        "::1".to_string(),
    ];
    if let Some(host) = hostname.map(str::trim).filter(|h| !h.is_empty()) {
        if !names.iter().any(|n| n == host) {
            names.push(host.to_string());
        }
    }
    names
}

/// Generate the CA and server key pairs and write them to `dir`.
///
/// Existing files are overwritten. The directory is created owner-only and
/// key files are written 0600 on unix.
pub fn provision_certificates(
    dir: &Path,
    hostname: Option<&str>,
) -> Result<CertificatePaths, CertificateError> {
    create_private_dir(dir)?;
    let paths = CertificatePaths::in_dir(dir);

    let not_before = OffsetDateTime::now_utc() - Duration::minutes(5);
    let not_after = not_before + Duration::days(VALIDITY_DAYS);

    // CA
    let ca_key = KeyPair::generate()?;
    let mut ca_params = CertificateParams::new(Vec::<String>::new())?;
    let mut ca_dn = DistinguishedName::new();
    ca_dn.push(DnType::CommonName, "Strongbox Gateway CA");
    ca_dn.push(DnType::OrganizationName, "Strongbox");
    ca_params.distinguished_name = ca_dn;
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    ca_params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    ca_params.not_before = not_before;
    ca_params.not_after = not_after;
    let ca_cert = ca_params.self_signed(&ca_key)?;

    // Server
    let names = subject_alt_names(hostname);
    let server_key = KeyPair::generate()?;
    let mut server_params = CertificateParams::new(names.clone())?;
    let mut server_dn = DistinguishedName::new();
    server_dn.push(
        DnType::CommonName,
        names.last().cloned().unwrap_or_else(|| "localhost".to_string()),
    );
    server_dn.push(DnType::OrganizationName, "Strongbox");
    server_params.distinguished_name = server_dn;
    server_params.is_ca = IsCa::NoCa;
    server_params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    server_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
    server_params.not_before = not_before;
    server_params.not_after = not_after;
    let server_cert = server_params.signed_by(&server_key, &ca_cert, &ca_key)?;

    write_public(&paths.ca_cert, &ca_cert.pem())?;
    write_private(&paths.ca_key, &ca_key.serialize_pem())?;
    write_public(&paths.server_cert, &server_cert.pem())?;
    write_private(&paths.server_key, &server_key.serialize_pem())?;

    tracing::info!(
        dir = %dir.display(),
        names = ?names,
        "Provisioned gateway CA and server certificate"
    );
    Ok(paths)
}

/// PEM of the server certificate, as served by the bootstrap endpoint.
pub fn read_server_certificate_pem(dir: &Path) -> Result<String, CertificateError> {
    let path = dir.join(SERVER_CERT_FILE);
    let pem = fs::read_to_string(&path).map_err(io_err(&path))?;
    // Refuse to serve anything that is not a certificate.
    if CertificateDer::pem_slice_iter(pem.as_bytes()).next().is_none()
        || pem.contains("PRIVATE KEY")
    {
        return Err(CertificateError::Pem {
            path,
            reason: "expected a certificate and nothing else".to_string(),
        });
    }
    Ok(pem)
}

/// Build the HTTPS listener's TLS configuration from the certificate
/// directory. The chain served is the server certificate followed by the CA.
pub fn server_tls_config(dir: &Path) -> Result<Arc<ServerConfig>, CertificateError> {
    let paths = CertificatePaths::in_dir(dir);

    let mut chain = load_certs(&paths.server_cert)?;
    chain.extend(load_certs(&paths.ca_cert)?);

    let key = PrivateKeyDer::from_pem_file(&paths.server_key).map_err(|e| {
        CertificateError::Pem {
            path: paths.server_key.clone(),
            reason: e.to_string(),
        }
    })?;

    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let mut config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(chain, key)?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, CertificateError> {
    let certs = CertificateDer::pem_file_iter(path)
        .and_then(|iter| iter.collect::<Result<Vec<_>, _>>())
        .map_err(|e| CertificateError::Pem {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    if certs.is_empty() {
        return Err(CertificateError::Pem {
            path: path.to_path_buf(),
            reason: "no certificate found".to_string(),
        });
    }
    Ok(certs)
}

fn create_private_dir(dir: &Path) -> Result<(), CertificateError> {
    fs::create_dir_all(dir).map_err(io_err(dir))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700)).map_err(io_err(dir))?;
    }
    Ok(())
}

fn write_public(path: &Path, contents: &str) -> Result<(), CertificateError> {
    fs::write(path, contents).map_err(io_err(path))
}

fn write_private(path: &Path, contents: &str) -> Result<(), CertificateError> {
    fs::write(path, contents).map_err(io_err(path))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(io_err(path))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_alt_names() {
        assert_eq!(subject_alt_names(None), vec!["localhost", "127.0.0.1", "::1"]);
        assert_eq!(subject_alt_names(Some("localhost")).len(), 3);
        assert_eq!(subject_alt_names(Some("backup.lan")).last().unwrap(), "backup.lan");
        assert_eq!(subject_alt_names(Some("  ")).len(), 3);
    }

    #[test]
    fn test_provision_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("certs");
        let paths = provision_certificates(&dir, Some("backup.lan")).unwrap();
        assert!(paths.all_exist());

        let pem = read_server_certificate_pem(&dir).unwrap();
        assert!(pem.starts_with("-----BEGIN CERTIFICATE-----"));
        assert!(!pem.contains("PRIVATE KEY"));

        let config = server_tls_config(&dir).unwrap();
        assert!(config.alpn_protocols.contains(&b"http/1.1".to_vec()));
    }

    #[cfg(unix)]
    #[test]
    fn test_private_material_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("certs");
        let paths = provision_certificates(&dir, None).unwrap();

        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&dir), 0o700);
        assert_eq!(mode(&paths.ca_key), 0o600);
        assert_eq!(mode(&paths.server_key), 0o600);
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = read_server_certificate_pem(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, CertificateError::Io { .. }));
    }
}
