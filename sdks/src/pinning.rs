// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Trust-on-first-use certificate pinning
//!
//! A gateway issues its own certificate, so no public trust store can vouch
//! for it. Instead the client:
//!
//! 1. fetches the server certificate once over plaintext HTTP from
//!    `/download_cert`, authenticated with its bearer token;
//! 2. persists it locally;
//! 3. from then on talks HTTPS through a verifier that accepts exactly that
//!    certificate and nothing from the system trust store.
//!
//! The first fetch is not protected against an active man-in-the-middle.
//! Every later connection is: a swapped certificate fails the handshake.

use std::path::Path;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};

use crate::error::{Result, SdkError};
use crate::types::ErrorBody;

/// Verifier that accepts only one end-entity certificate, byte for byte.
///
/// Handshake signatures are still checked with the provider's algorithms,
/// so possession of the pinned certificate alone is not enough.
#[derive(Debug)]
pub struct PinnedCertVerifier {
    pinned: CertificateDer<'static>,
    provider: Arc<CryptoProvider>,
}

impl PinnedCertVerifier {
    pub fn new(pinned: CertificateDer<'static>, provider: Arc<CryptoProvider>) -> Self {
        Self { pinned, provider }
    }
}

impl ServerCertVerifier for PinnedCertVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        if end_entity.as_ref() == self.pinned.as_ref() {
            Ok(ServerCertVerified::assertion())
        } else {
            Err(rustls::Error::InvalidCertificate(
                rustls::CertificateError::ApplicationVerificationFailure,
            ))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// A server certificate pinned by a client.
#[derive(Debug, Clone)]
pub struct CertificatePin {
    pem: String,
    der: CertificateDer<'static>,
}

impl CertificatePin {
    /// Parse the first certificate of a PEM document.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let der = CertificateDer::pem_slice_iter(pem.as_bytes())
            .next()
            .ok_or_else(|| SdkError::InvalidCertificate("no certificate in PEM".to_string()))?
            .map_err(|e| SdkError::InvalidCertificate(e.to_string()))?;
        Ok(Self {
            pem: pem.to_string(),
            der,
        })
    }

    /// Fetch the gateway certificate over the plaintext bootstrap listener.
    ///
    /// `bootstrap_url` is the `http://` base URL of the gateway.
    pub async fn fetch(bootstrap_url: &str, token: &str) -> Result<Self> {
        let url = format!("{}/download_cert", bootstrap_url.trim_end_matches('/'));
        let response = reqwest::Client::new()
            .get(&url)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => status.canonical_reason().unwrap_or("error").to_string(),
            };
            return Err(SdkError::Status { status, message });
        }

        let pem = response.text().await?;
        Self::from_pem(&pem)
    }

    /// Load a previously persisted pin.
    pub fn load(path: &Path) -> Result<Self> {
        let pem = std::fs::read_to_string(path).map_err(|source| SdkError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_pem(&pem)
    }

    /// Write the pinned certificate as PEM.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let io = |source| SdkError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
        std::fs::write(path, &self.pem).map_err(io)
    }

    pub fn pem(&self) -> &str {
        &self.pem
    }

    pub fn der(&self) -> &CertificateDer<'static> {
        &self.der
    }

    /// rustls configuration that trusts only this certificate.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
        let verifier = PinnedCertVerifier::new(self.der.clone(), provider.clone());
        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(verifier))
            .with_no_client_auth();
        Ok(config)
    }

    /// HTTP client whose TLS trusts only this certificate.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .use_preconfigured_tls(self.client_config()?)
            .build()?)
    }
}
