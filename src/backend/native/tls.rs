//! Certificate and public key pinning
//!
//! Three policies, picked per request:
//! - trust anything (`disableAllSecurity`),
//! - certificate pinning: the named `.cer` assets are the only trust anchors,
//! - public key pinning: normal WebPKI validation, then at least one
//!   certificate in the chain must have a pinned SPKI SHA-256.

use crate::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;

/// SHA-256 of a certificate's SubjectPublicKeyInfo
pub type SpkiHash = [u8; 32];

/// How server certificates are checked
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TlsPolicy {
    /// Accept any certificate
    TrustAll,
    /// Only the named certificate assets are trusted
    Certificates(Vec<String>),
    /// WebPKI validation plus SPKI pins
    PublicKeys(Vec<String>),
}

impl TlsPolicy {
    /// Pick the policy for a request
    pub fn from_options(options: &crate::Options) -> Result<Self> {
        if options.disable_all_security {
            return Ok(TlsPolicy::TrustAll);
        }
        let certs = &options.ssl_pinning.certs;
        if certs.is_empty() {
            return Err(Error::PinningNotConfigured);
        }
        if options.pk_pinning {
            Ok(TlsPolicy::PublicKeys(certs.clone()))
        } else {
            Ok(TlsPolicy::Certificates(certs.clone()))
        }
    }

    /// Apply the policy to a reqwest client builder
    pub fn apply(
        &self,
        builder: reqwest::ClientBuilder,
        assets_dir: &Path,
    ) -> Result<reqwest::ClientBuilder> {
        match self {
            TlsPolicy::TrustAll => {
                tracing::warn!("Certificate validation disabled for this client");
                Ok(builder.danger_accept_invalid_certs(true))
            }
            TlsPolicy::Certificates(names) => {
                let mut builder = builder.tls_built_in_root_certs(false);
                for name in names {
                    builder = builder.add_root_certificate(load_certificate(assets_dir, name)?);
                }
                Ok(builder)
            }
            TlsPolicy::PublicKeys(pins) => {
                let pins = pins
                    .iter()
                    .map(|pin| parse_pin(pin))
                    .collect::<Result<Vec<_>>>()?;
                Ok(builder.use_preconfigured_tls(pinned_client_config(pins)?))
            }
        }
    }
}

/// Load `<assets_dir>/<name>.cer`, PEM or DER
fn load_certificate(assets_dir: &Path, name: &str) -> Result<reqwest::Certificate> {
    let path = assets_dir.join(format!("{}.cer", name));
    let bytes = std::fs::read(&path).map_err(|e| Error::Certificate {
        name: name.to_string(),
        message: format!("{}: {}", path.display(), e),
    })?;

    let certificate = if bytes.starts_with(b"-----BEGIN") {
        reqwest::Certificate::from_pem(&bytes)
    } else {
        reqwest::Certificate::from_der(&bytes)
    };
    certificate.map_err(|e| Error::Certificate {
        name: name.to_string(),
        message: e.to_string(),
    })
}

/// Parse a `sha256/<base64>` or bare base64 pin
pub fn parse_pin(pin: &str) -> Result<SpkiHash> {
    let encoded = pin.strip_prefix("sha256/").unwrap_or(pin);
    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| Error::InvalidPin(pin.to_string()))?;
    decoded
        .try_into()
        .map_err(|_| Error::InvalidPin(pin.to_string()))
}

fn pinned_client_config(pins: Vec<SpkiHash>) -> Result<rustls::ClientConfig> {
    let roots = rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    pinned_client_config_with_roots(roots, pins)
}

fn pinned_client_config_with_roots(
    roots: rustls::RootCertStore,
    pins: Vec<SpkiHash>,
) -> Result<rustls::ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let inner = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider.clone())
        .build()
        .map_err(|e| Error::Tls {
            message: e.to_string(),
        })?;

    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Tls {
            message: e.to_string(),
        })?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(PublicKeyPinVerifier { inner, pins }))
        .with_no_client_auth();
    Ok(config)
}

#[derive(Debug)]
struct PublicKeyPinVerifier {
    inner: Arc<WebPkiServerVerifier>,
    pins: Vec<SpkiHash>,
}

impl ServerCertVerifier for PublicKeyPinVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        let verified = self.inner.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        )?;

        let pinned = std::iter::once(end_entity)
            .chain(intermediates)
            .filter_map(|cert| spki_hash(cert))
            .any(|hash| self.pins.contains(&hash));
        if pinned {
            Ok(verified)
        } else {
            tracing::error!("No certificate in the chain for {:?} matches a pin", server_name);
            Err(rustls::Error::General(
                "Certificate pinning failure".to_string(),
            ))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// SHA-256 of the SubjectPublicKeyInfo of a DER certificate
pub fn spki_hash(cert_der: &[u8]) -> Option<SpkiHash> {
    match x509_parser::parse_x509_certificate(cert_der) {
        Ok((_, cert)) => Some(Sha256::digest(cert.public_key().raw).into()),
        Err(e) => {
            tracing::warn!("Skipping unparsable certificate while checking pins: {}", e);
            None
        }
    }
}
