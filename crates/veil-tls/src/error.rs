// error.rs — Error types for the TLS transport.
//
// Handshake failures are classified by inspecting the typed rustls error
// wrapped inside the io::Error, never by comparing message strings:
//
// - our own Authorizer rejected the peer → Denied / PolicyFailure
// - the peer sent a certificate rejection alert → RejectedByPeer

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio_rustls::rustls::{self, AlertDescription, CertificateError};
use veil_policy::Identity;

use crate::authorizer::AuthorizeError;

#[derive(Debug, Error)]
pub enum TlsError {
    /// A certificate, key or bundle file could not be loaded.
    #[error("failed to load TLS material from {path}: {reason}")]
    Material { path: PathBuf, reason: String },

    /// rustls rejected the configuration (key mismatch, empty bundle, ...).
    #[error("invalid TLS configuration: {0}")]
    Config(String),

    /// The configured server name is not a valid DNS name or IP address.
    #[error("invalid server name '{0}'")]
    InvalidServerName(String),

    /// The certificate has no SPIFFE URI SAN.
    #[error("certificate carries no SPIFFE identity")]
    NoPeerIdentity,

    /// The certificate could not be parsed.
    #[error("malformed certificate: {reason}")]
    MalformedCertificate { reason: String },

    /// Our authorizer rejected the peer.
    #[error("authorization denied: unexpected peer ID {identity}")]
    Denied { identity: Identity },

    /// Our authorizer could not reach a decision, so the peer was rejected.
    #[error("authorization failed for peer ID {identity}: {reason}")]
    PolicyFailure { identity: Identity, reason: String },

    /// The peer aborted the handshake because it rejected our certificate.
    #[error("peer rejected our certificate")]
    RejectedByPeer,

    /// Any other handshake failure reported by rustls.
    #[error("TLS handshake failed: {0}")]
    Handshake(String),

    /// The handshake (or dial) didn't finish in time.
    #[error("TLS handshake timed out after {after:?}")]
    HandshakeTimeout { after: Duration },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TlsError {
    /// Classify an io::Error returned by tokio-rustls (handshake or I/O on an
    /// established stream).
    pub fn from_io(err: io::Error) -> Self {
        let Some(tls) = err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<rustls::Error>())
        else {
            return TlsError::Io(err);
        };
        Self::from_rustls(tls)
    }

    fn from_rustls(err: &rustls::Error) -> Self {
        match err {
            rustls::Error::InvalidCertificate(CertificateError::Other(other)) => {
                match other.0.downcast_ref::<AuthorizeError>() {
                    Some(AuthorizeError::Denied { identity }) => TlsError::Denied {
                        identity: identity.clone(),
                    },
                    Some(AuthorizeError::Policy { identity, source }) => TlsError::PolicyFailure {
                        identity: identity.clone(),
                        reason: source.to_string(),
                    },
                    None => TlsError::Handshake(err.to_string()),
                }
            }
            rustls::Error::AlertReceived(
                AlertDescription::BadCertificate
                | AlertDescription::CertificateUnknown
                | AlertDescription::AccessDenied,
            ) => TlsError::RejectedByPeer,
            other => TlsError::Handshake(other.to_string()),
        }
    }

    /// True when the connection failed because someone said no: us, or the peer.
    pub fn is_authorization_failure(&self) -> bool {
        matches!(
            self,
            TlsError::Denied { .. } | TlsError::PolicyFailure { .. } | TlsError::RejectedByPeer
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio_rustls::rustls::OtherError;

    fn wrap(err: rustls::Error) -> io::Error {
        io::Error::new(io::ErrorKind::InvalidData, err)
    }

    #[test]
    fn certificate_alerts_mean_rejected_by_peer() {
        for alert in [
            AlertDescription::BadCertificate,
            AlertDescription::CertificateUnknown,
            AlertDescription::AccessDenied,
        ] {
            let err = TlsError::from_io(wrap(rustls::Error::AlertReceived(alert)));
            assert!(matches!(err, TlsError::RejectedByPeer));
            assert!(err.is_authorization_failure());
        }

        let err = TlsError::from_io(wrap(rustls::Error::AlertReceived(
            AlertDescription::UnknownCA,
        )));
        assert!(matches!(err, TlsError::Handshake(_)));
    }

    #[test]
    fn authorizer_denial_is_recovered_from_the_rustls_error() {
        let denial = AuthorizeError::Denied {
            identity: Identity::new("spiffe://domain.test/external"),
        };
        let err = TlsError::from_io(wrap(rustls::Error::InvalidCertificate(
            CertificateError::Other(OtherError(Arc::new(denial))),
        )));
        match err {
            TlsError::Denied { identity } => {
                assert_eq!(identity.as_str(), "spiffe://domain.test/external")
            }
            other => panic!("expected Denied, got {other:?}"),
        }
    }

    #[test]
    fn other_rustls_errors_are_generic_handshake_failures() {
        let err = TlsError::from_io(wrap(rustls::Error::InvalidCertificate(
            CertificateError::UnknownIssuer,
        )));
        assert!(matches!(err, TlsError::Handshake(_)));
        assert!(!err.is_authorization_failure());
    }

    #[test]
    fn plain_io_errors_stay_io() {
        let err = TlsError::from_io(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert!(matches!(err, TlsError::Io(_)));
    }
}
