// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
//! Mutual-TLS material.
//!
//! [`TlsMaterial`] is built from a certificate secret carrying `tls.crt`,
//! `tls.key` and `ca.crt`. The same CA bundle is used both as the client's
//! trust roots and as the authority behind the presented client identity;
//! there is no separate issuer lookup.
//!
//! All parsing happens up front so a broken secret surfaces as
//! [`ProbeError::CertificateInvalid`] at build time, not on first handshake.

use std::sync::{Arc, Once};

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::WebPkiSupportedAlgorithms;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::server::ParsedCertificate;
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tracing::{debug, error};

use crate::config::TlsVersionCap;
use crate::consts::SecretField;
use crate::error::{ProbeError, Result};
use crate::secret::{Secret, SecretRef, SecretStore};

static CRYPTO_PROVIDER: Once = Once::new();

/// Install the ring crypto provider as the process default, once.
///
/// HTTP transports are built without a bundled provider, so this must run
/// before the first TLS-capable client is constructed.
pub fn install_crypto_provider() {
    CRYPTO_PROVIDER.call_once(|| {
        // Another component may already have installed a provider; keep it.
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Whether the server certificate must also name the dialled host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ServerNameCheck {
    /// Chain to the CA and match the host name.
    #[default]
    Verify,
    /// Chain to the CA only.
    Skip,
}

/// Parsed client certificate chain, private key and trust roots.
pub struct TlsMaterial {
    source: String,
    cert_pem: Vec<u8>,
    key_pem: Vec<u8>,
    ca_pem: Vec<u8>,
    cert_chain: Vec<CertificateDer<'static>>,
    private_key: PrivateKeyDer<'static>,
    roots: RootCertStore,
}

impl Clone for TlsMaterial {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            cert_pem: self.cert_pem.clone(),
            key_pem: self.key_pem.clone(),
            ca_pem: self.ca_pem.clone(),
            cert_chain: self.cert_chain.clone(),
            private_key: self.private_key.clone_key(),
            roots: self.roots.clone(),
        }
    }
}

impl std::fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("source", &self.source)
            .field("certificates", &self.cert_chain.len())
            .field("roots", &self.roots.len())
            .finish_non_exhaustive()
    }
}

impl TlsMaterial {
    /// Parse material from a fetched certificate secret.
    pub fn from_secret(secret: &Secret) -> Result<Self> {
        let source = secret.reference().to_string();
        let field = |f: SecretField| -> Result<Vec<u8>> {
            match secret.field(f) {
                Some(bytes) if !bytes.is_empty() => Ok(bytes.to_vec()),
                _ => Err(invalid(&source, format!("{f} is missing"))),
            }
        };
        let cert_pem = field(SecretField::TlsCert)?;
        let key_pem = field(SecretField::TlsKey)?;
        let ca_pem = field(SecretField::CaCert)?;
        Self::from_pem(source, cert_pem, key_pem, ca_pem)
    }

    /// Parse material from PEM buffers. `source` names the origin in errors.
    pub fn from_pem(
        source: impl Into<String>,
        cert_pem: Vec<u8>,
        key_pem: Vec<u8>,
        ca_pem: Vec<u8>,
    ) -> Result<Self> {
        let source = source.into();

        let cert_chain = parse_certificates(&cert_pem)
            .map_err(|reason| invalid(&source, format!("client certificate: {reason}")))?;

        let private_key = PrivateKeyDer::from_pem_slice(&key_pem)
            .map_err(|e| invalid(&source, format!("private key: {e}")))?;
        rustls::crypto::ring::sign::any_supported_type(&private_key)
            .map_err(|e| invalid(&source, format!("private key: {e}")))?;

        let ca_certs = parse_certificates(&ca_pem)
            .map_err(|reason| invalid(&source, format!("CA bundle: {reason}")))?;
        let mut roots = RootCertStore::empty();
        for cert in ca_certs {
            roots
                .add(cert)
                .map_err(|e| invalid(&source, format!("CA bundle: {e}")))?;
        }

        debug!(
            source = %source,
            certificates = cert_chain.len(),
            roots = roots.len(),
            "loaded TLS material"
        );

        Ok(Self {
            source,
            cert_pem,
            key_pem,
            ca_pem,
            cert_chain,
            private_key,
            roots,
        })
    }

    /// Where the material came from (`namespace/name` for secrets).
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Private key followed by the certificate chain, both PEM.
    ///
    /// This is the layout HTTP client identities expect.
    pub fn identity_pem(&self) -> Vec<u8> {
        let mut pem = Vec::with_capacity(self.key_pem.len() + self.cert_pem.len() + 1);
        pem.extend_from_slice(&self.key_pem);
        if !pem.ends_with(b"\n") {
            pem.push(b'\n');
        }
        pem.extend_from_slice(&self.cert_pem);
        pem
    }

    /// The CA bundle, PEM.
    pub fn ca_pem(&self) -> &[u8] {
        &self.ca_pem
    }

    pub fn certificate_chain(&self) -> &[CertificateDer<'static>] {
        &self.cert_chain
    }

    pub fn root_store(&self) -> &RootCertStore {
        &self.roots
    }

    /// Build a rustls client configuration trusting the CA bundle.
    ///
    /// With `present_client_cert`, the certificate chain and key are offered
    /// for client authentication.
    pub fn client_config(
        &self,
        present_client_cert: bool,
        max_version: TlsVersionCap,
    ) -> Result<ClientConfig> {
        self.client_config_with(present_client_cert, max_version, ServerNameCheck::Verify)
    }

    /// Like [`client_config`](Self::client_config), choosing whether the
    /// server certificate's names are checked.
    pub fn client_config_with(
        &self,
        present_client_cert: bool,
        max_version: TlsVersionCap,
        name_check: ServerNameCheck,
    ) -> Result<ClientConfig> {
        install_crypto_provider();
        let versions: &[&'static rustls::SupportedProtocolVersion] = match max_version {
            TlsVersionCap::Tls12 => &[&rustls::version::TLS12],
            TlsVersionCap::Tls13 => &[&rustls::version::TLS13, &rustls::version::TLS12],
        };
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let algorithms = provider.signature_verification_algorithms;
        let builder = ClientConfig::builder_with_provider(provider)
            .with_protocol_versions(versions)
            .map_err(|e| invalid(&self.source, format!("protocol versions: {e}")))?;
        let builder = match name_check {
            ServerNameCheck::Verify => builder.with_root_certificates(self.roots.clone()),
            ServerNameCheck::Skip => builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(ChainOnlyVerifier {
                    roots: self.roots.clone(),
                    algorithms,
                })),
        };

        if present_client_cert {
            builder
                .with_client_auth_cert(self.cert_chain.clone(), self.private_key.clone_key())
                .map_err(|e| invalid(&self.source, format!("client auth: {e}")))
        } else {
            Ok(builder.with_no_client_auth())
        }
    }
}

/// Accepts any server certificate that chains to `roots`, whatever names
/// it carries. Handshake signatures are still verified.
#[derive(Debug)]
struct ChainOnlyVerifier {
    roots: RootCertStore,
    algorithms: WebPkiSupportedAlgorithms,
}

impl ServerCertVerifier for ChainOnlyVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        let cert = ParsedCertificate::try_from(end_entity)?;
        rustls::client::verify_server_cert_signed_by_trust_anchor(
            &cert,
            &self.roots,
            intermediates,
            now,
            self.algorithms.all,
        )?;
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}

/// Fetch and parse the certificate secret named by `reference`.
pub async fn resolve_tls_material(
    store: &dyn SecretStore,
    reference: &SecretRef,
) -> Result<TlsMaterial> {
    let secret = store.get(reference).await?.ok_or_else(|| {
        error!(secret = %reference, "certificate secret does not exist");
        invalid(&reference.to_string(), "secret does not exist".to_string())
    })?;
    TlsMaterial::from_secret(&secret)
}

fn parse_certificates(pem: &[u8]) -> std::result::Result<Vec<CertificateDer<'static>>, String> {
    let certs = CertificateDer::pem_slice_iter(pem)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;
    if certs.is_empty() {
        return Err("no PEM certificates found".to_string());
    }
    Ok(certs)
}

fn invalid(source: &str, reason: String) -> ProbeError {
    ProbeError::CertificateInvalid {
        secret: source.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::InMemorySecretStore;

    const CA: &str = include_str!("../tests/fixtures/ca.crt");
    const CERT: &str = include_str!("../tests/fixtures/client.crt");
    const KEY: &str = include_str!("../tests/fixtures/client.key");

    fn cert_secret() -> Secret {
        Secret::new("demo", "es-client-cert")
            .with_field(SecretField::TlsCert, CERT)
            .with_field(SecretField::TlsKey, KEY)
            .with_field(SecretField::CaCert, CA)
    }

    #[test]
    fn test_parses_complete_secret() {
        let material = TlsMaterial::from_secret(&cert_secret()).unwrap();
        assert_eq!(material.source(), "demo/es-client-cert");
        assert_eq!(material.certificate_chain().len(), 1);
        assert_eq!(material.root_store().len(), 1);
    }

    #[test]
    fn test_identity_pem_has_key_then_cert() {
        let material = TlsMaterial::from_secret(&cert_secret()).unwrap();
        let pem = String::from_utf8(material.identity_pem()).unwrap();
        let key_at = pem.find("PRIVATE KEY").unwrap();
        let cert_at = pem.find("BEGIN CERTIFICATE").unwrap();
        assert!(key_at < cert_at);
    }

    #[test]
    fn test_missing_ca_is_invalid() {
        let mut secret = cert_secret();
        secret.data.remove(SecretField::CaCert.key());
        let err = TlsMaterial::from_secret(&secret).unwrap_err();
        match err {
            ProbeError::CertificateInvalid { reason, .. } => assert!(reason.contains("ca.crt")),
            other => panic!("expected CertificateInvalid, got {other:?}"),
        }
    }

    #[test]
    fn test_garbage_key_is_invalid() {
        let secret = cert_secret().with_field(SecretField::TlsKey, "not a key");
        let err = TlsMaterial::from_secret(&secret).unwrap_err();
        assert!(matches!(err, ProbeError::CertificateInvalid { .. }));
    }

    #[test]
    fn test_ca_without_certificates_is_invalid() {
        let secret = cert_secret().with_field(SecretField::CaCert, "-- nothing here --");
        let err = TlsMaterial::from_secret(&secret).unwrap_err();
        assert!(err.to_string().contains("CA bundle"));
    }

    #[test]
    fn test_client_config_with_and_without_client_auth() {
        let material = TlsMaterial::from_secret(&cert_secret()).unwrap();
        let mutual = material.client_config(true, TlsVersionCap::Tls13).unwrap();
        assert!(mutual.client_auth_cert_resolver.has_certs());
        let server_only = material.client_config(false, TlsVersionCap::Tls12).unwrap();
        assert!(!server_only.client_auth_cert_resolver.has_certs());
    }

    fn chain_only(roots: RootCertStore) -> ChainOnlyVerifier {
        ChainOnlyVerifier {
            roots,
            algorithms: rustls::crypto::ring::default_provider().signature_verification_algorithms,
        }
    }

    #[test]
    fn test_chain_only_ignores_server_name() {
        let material = TlsMaterial::from_secret(&cert_secret()).unwrap();
        let leaf = &material.certificate_chain()[0];
        let host = ServerName::try_from("pg-0.pg-pods.demo.svc").unwrap();

        chain_only(material.root_store().clone())
            .verify_server_cert(leaf, &[], &host, &[], UnixTime::now())
            .unwrap();

        // The fixture carries no subject alternative names.
        let full = rustls::client::WebPkiServerVerifier::builder_with_provider(
            Arc::new(material.root_store().clone()),
            Arc::new(rustls::crypto::ring::default_provider()),
        )
        .build()
        .unwrap();
        assert!(full
            .verify_server_cert(leaf, &[], &host, &[], UnixTime::now())
            .is_err());
    }

    #[test]
    fn test_chain_only_still_requires_trusted_issuer() {
        let material = TlsMaterial::from_secret(&cert_secret()).unwrap();
        let host = ServerName::try_from("pg-0.pg-pods.demo.svc").unwrap();
        let result = chain_only(RootCertStore::empty()).verify_server_cert(
            &material.certificate_chain()[0],
            &[],
            &host,
            &[],
            UnixTime::now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_client_config_with_skipped_name_check() {
        let material = TlsMaterial::from_secret(&cert_secret()).unwrap();
        let config = material
            .client_config_with(true, TlsVersionCap::Tls13, ServerNameCheck::Skip)
            .unwrap();
        assert!(config.client_auth_cert_resolver.has_certs());
    }

    #[tokio::test]
    async fn test_resolve_absent_secret() {
        let store = InMemorySecretStore::new();
        let err = resolve_tls_material(&store, &SecretRef::new("demo", "missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::CertificateInvalid { .. }));
    }
}
