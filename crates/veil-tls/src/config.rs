// config.rs — TLS material and rustls configuration.
//
// Material is loaded from three PEM files named in the service config:
// our certificate chain, our private key, and the trust bundle used to
// verify peers. Both server and client configurations use the ring crypto
// provider explicitly rather than a process-wide default.

use std::fmt;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_rustls::rustls::crypto::{ring, CryptoProvider};
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::rustls::server::WebPkiClientVerifier;
use tokio_rustls::rustls::{ClientConfig, RootCertStore, ServerConfig};
use veil_policy::Identity;

use crate::authorizer::Authorizer;
use crate::error::TlsError;
use crate::identity::identity_from_certificate;
use crate::verifier::{AuthorizingClientVerifier, AuthorizingServerVerifier};

/// Paths to the PEM files a service presents and trusts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Our certificate chain, end-entity first.
    pub certificate: PathBuf,
    /// Private key matching the end-entity certificate (PKCS#8, PKCS#1 or SEC1).
    pub private_key: PathBuf,
    /// CA certificates peers must chain to.
    pub trust_bundle: PathBuf,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            certificate: PathBuf::from("svid.pem"),
            private_key: PathBuf::from("svid_key.pem"),
            trust_bundle: PathBuf::from("bundle.pem"),
        }
    }
}

/// Parsed certificates, key and trust roots.
pub struct TlsMaterial {
    pub certs: Vec<CertificateDer<'static>>,
    pub key: PrivateKeyDer<'static>,
    pub roots: Arc<RootCertStore>,
}

impl Clone for TlsMaterial {
    fn clone(&self) -> Self {
        Self {
            certs: self.certs.clone(),
            key: self.key.clone_key(),
            roots: Arc::clone(&self.roots),
        }
    }
}

impl fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("certs", &self.certs.len())
            .field("roots", &self.roots.len())
            .finish_non_exhaustive()
    }
}

impl TlsMaterial {
    /// Read and parse the files named in `config`.
    pub fn load(config: &TlsConfig) -> Result<Self, TlsError> {
        let certs = read_file(&config.certificate)?;
        let key = read_file(&config.private_key)?;
        let bundle = read_file(&config.trust_bundle)?;
        let material = Self {
            certs: parse_certs(&certs, &config.certificate)?,
            key: parse_key(&key, &config.private_key)?,
            roots: Arc::new(parse_roots(&bundle, &config.trust_bundle)?),
        };
        tracing::debug!(
            certificate = %config.certificate.display(),
            roots = material.roots.len(),
            "loaded TLS material"
        );
        Ok(material)
    }

    /// Build material from in-memory PEM text.
    pub fn from_pem(certificate: &str, private_key: &str, trust_bundle: &str) -> Result<Self, TlsError> {
        let inline = Path::new("<inline>");
        Ok(Self {
            certs: parse_certs(certificate.as_bytes(), inline)?,
            key: parse_key(private_key.as_bytes(), inline)?,
            roots: Arc::new(parse_roots(trust_bundle.as_bytes(), inline)?),
        })
    }

    /// Our own SPIFFE identity, from the end-entity certificate.
    pub fn local_identity(&self) -> Result<Identity, TlsError> {
        match self.certs.first() {
            Some(cert) => identity_from_certificate(cert),
            None => Err(TlsError::NoPeerIdentity),
        }
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, TlsError> {
    std::fs::read(path).map_err(|e| TlsError::Material {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn parse_certs(pem: &[u8], path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let certs = rustls_pemfile::certs(&mut BufReader::new(pem))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TlsError::Material {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    if certs.is_empty() {
        return Err(TlsError::Material {
            path: path.to_path_buf(),
            reason: "no certificates found".to_string(),
        });
    }
    Ok(certs)
}

fn parse_key(pem: &[u8], path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    rustls_pemfile::private_key(&mut BufReader::new(pem))
        .map_err(|e| TlsError::Material {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?
        .ok_or_else(|| TlsError::Material {
            path: path.to_path_buf(),
            reason: "no private key found".to_string(),
        })
}

fn parse_roots(pem: &[u8], path: &Path) -> Result<RootCertStore, TlsError> {
    let mut roots = RootCertStore::empty();
    for cert in parse_certs(pem, path)? {
        roots.add(cert).map_err(|e| TlsError::Material {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    }
    Ok(roots)
}

fn provider() -> Arc<CryptoProvider> {
    Arc::new(ring::default_provider())
}

/// Server-side configuration: client certificates are mandatory, verified
/// against the trust bundle, and then handed to `authorizer`.
pub fn server_config(
    material: &TlsMaterial,
    authorizer: Arc<dyn Authorizer>,
) -> Result<Arc<ServerConfig>, TlsError> {
    let provider = provider();
    let webpki = WebPkiClientVerifier::builder_with_provider(Arc::clone(&material.roots), Arc::clone(&provider))
        .build()
        .map_err(|e| TlsError::Config(e.to_string()))?;
    let verifier = Arc::new(AuthorizingClientVerifier::new(webpki, authorizer));

    let config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| TlsError::Config(e.to_string()))?
        .with_client_cert_verifier(verifier)
        .with_single_cert(material.certs.clone(), material.key.clone_key())
        .map_err(|e| TlsError::Config(e.to_string()))?;
    Ok(Arc::new(config))
}

/// Client-side configuration: presents our certificate and authorizes the
/// server by SPIFFE identity.
pub fn client_config(
    material: &TlsMaterial,
    authorizer: Arc<dyn Authorizer>,
) -> Result<Arc<ClientConfig>, TlsError> {
    let provider = provider();
    let verifier = Arc::new(AuthorizingServerVerifier::new(
        Arc::clone(&material.roots),
        Arc::clone(&provider),
        authorizer,
    ));

    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| TlsError::Config(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_client_auth_cert(material.certs.clone(), material.key.clone_key())
        .map_err(|e| TlsError::Config(e.to_string()))?;
    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorizer::AuthorizeAny;
    use rcgen::{BasicConstraints, CertificateParams, IsCa, KeyPair, SanType};

    struct Pems {
        cert: String,
        key: String,
        bundle: String,
    }

    fn pems(id: &str) -> Pems {
        let ca_key = KeyPair::generate().unwrap();
        let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let ca = ca_params.self_signed(&ca_key).unwrap();

        let key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        params
            .subject_alt_names
            .push(SanType::URI(id.try_into().unwrap()));
        let cert = params.signed_by(&key, &ca, &ca_key).unwrap();

        Pems {
            cert: cert.pem(),
            key: key.serialize_pem(),
            bundle: ca.pem(),
        }
    }

    #[test]
    fn from_pem_reports_local_identity() {
        let p = pems("spiffe://domain.test/gateway");
        let material = TlsMaterial::from_pem(&p.cert, &p.key, &p.bundle).unwrap();
        assert_eq!(material.roots.len(), 1);
        assert_eq!(
            material.local_identity().unwrap().as_str(),
            "spiffe://domain.test/gateway"
        );
    }

    #[test]
    fn load_reads_files_and_builds_configs() {
        let p = pems("spiffe://domain.test/db-server");
        let dir = tempfile::tempdir().unwrap();
        let config = TlsConfig {
            certificate: dir.path().join("svid.pem"),
            private_key: dir.path().join("svid_key.pem"),
            trust_bundle: dir.path().join("bundle.pem"),
        };
        std::fs::write(&config.certificate, &p.cert).unwrap();
        std::fs::write(&config.private_key, &p.key).unwrap();
        std::fs::write(&config.trust_bundle, &p.bundle).unwrap();

        let material = TlsMaterial::load(&config).unwrap();
        assert!(server_config(&material, Arc::new(AuthorizeAny)).is_ok());
        assert!(client_config(&material, Arc::new(AuthorizeAny)).is_ok());
    }

    #[test]
    fn missing_or_empty_material_is_reported_with_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = TlsConfig {
            certificate: dir.path().join("missing.pem"),
            private_key: dir.path().join("missing_key.pem"),
            trust_bundle: dir.path().join("missing_bundle.pem"),
        };
        match TlsMaterial::load(&config) {
            Err(TlsError::Material { path, .. }) => assert_eq!(path, config.certificate),
            other => panic!("expected Material error, got {other:?}"),
        }

        let p = pems("spiffe://domain.test/x");
        assert!(matches!(
            TlsMaterial::from_pem(&p.cert, "", &p.bundle),
            Err(TlsError::Material { .. })
        ));
        assert!(matches!(
            TlsMaterial::from_pem(&p.cert, &p.key, "not pem"),
            Err(TlsError::Material { .. })
        ));
    }
}
