// identity.rs — Workload identity from X.509 certificates.
//
// A peer's identity is the first `spiffe://` URI in the subjectAltName
// extension of its end-entity certificate. Certificates that carry no such
// URI have no identity and are rejected before any authorizer runs.

use tokio_rustls::rustls::pki_types::CertificateDer;
use veil_policy::Identity;
use x509_parser::extensions::GeneralName;

use crate::error::TlsError;

pub const SPIFFE_SCHEME: &str = "spiffe://";

/// Extract the SPIFFE identity from a DER-encoded certificate.
pub fn identity_from_certificate(cert: &CertificateDer<'_>) -> Result<Identity, TlsError> {
    let (_, parsed) = x509_parser::parse_x509_certificate(cert.as_ref()).map_err(|e| {
        TlsError::MalformedCertificate {
            reason: e.to_string(),
        }
    })?;

    let san = parsed
        .subject_alternative_name()
        .map_err(|e| TlsError::MalformedCertificate {
            reason: e.to_string(),
        })?
        .ok_or(TlsError::NoPeerIdentity)?;

    san.value
        .general_names
        .iter()
        .find_map(|name| match name {
            GeneralName::URI(uri) if uri.starts_with(SPIFFE_SCHEME) => Some(Identity::new(*uri)),
            _ => None,
        })
        .ok_or(TlsError::NoPeerIdentity)
}

/// Identity of the peer on an established session, from its presented chain.
pub fn peer_identity(chain: Option<&[CertificateDer<'_>]>) -> Result<Identity, TlsError> {
    match chain.and_then(|c| c.first()) {
        Some(end_entity) => identity_from_certificate(end_entity),
        None => Err(TlsError::NoPeerIdentity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, KeyPair, SanType};

    fn cert_with_sans(sans: Vec<SanType>) -> CertificateDer<'static> {
        let key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        params.subject_alt_names = sans;
        params.self_signed(&key).unwrap().der().clone()
    }

    #[test]
    fn extracts_spiffe_uri() {
        let cert = cert_with_sans(vec![
            SanType::DnsName("localhost".try_into().unwrap()),
            SanType::URI("spiffe://domain.test/restricted".try_into().unwrap()),
        ]);
        assert_eq!(
            identity_from_certificate(&cert).unwrap().as_str(),
            "spiffe://domain.test/restricted"
        );
    }

    #[test]
    fn non_spiffe_uris_are_ignored() {
        let cert = cert_with_sans(vec![SanType::URI("https://example.org/x".try_into().unwrap())]);
        assert!(matches!(
            identity_from_certificate(&cert),
            Err(TlsError::NoPeerIdentity)
        ));
    }

    #[test]
    fn missing_san_has_no_identity() {
        let cert = cert_with_sans(Vec::new());
        assert!(matches!(
            identity_from_certificate(&cert),
            Err(TlsError::NoPeerIdentity)
        ));
        assert!(matches!(peer_identity(None), Err(TlsError::NoPeerIdentity)));
        assert!(matches!(peer_identity(Some(&[])), Err(TlsError::NoPeerIdentity)));
    }

    #[test]
    fn garbage_is_malformed() {
        let junk = CertificateDer::from(vec![0x30, 0x03, 0x01, 0x02]);
        assert!(matches!(
            identity_from_certificate(&junk),
            Err(TlsError::MalformedCertificate { .. })
        ));
    }
}
