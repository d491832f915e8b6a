// common/mod.rs — Throwaway PKI for handshake tests.
//
// One CA per TestPki; every issued leaf carries a DNS SAN "localhost" plus
// the requested spiffe:// URI SAN and is valid for both client and server
// authentication.

use rcgen::{
    BasicConstraints, Certificate, CertificateParams, ExtendedKeyUsagePurpose, IsCa, KeyPair,
    KeyUsagePurpose, SanType,
};
use veil_tls::TlsMaterial;

pub struct TestPki {
    ca: Certificate,
    ca_key: KeyPair,
}

impl TestPki {
    pub fn new() -> Self {
        let ca_key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        let ca = params.self_signed(&ca_key).unwrap();
        Self { ca, ca_key }
    }

    /// Issue a leaf for `spiffe_id` and return it as TLS material trusting
    /// this CA.
    pub fn issue(&self, spiffe_id: &str) -> TlsMaterial {
        let key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        params
            .subject_alt_names
            .push(SanType::URI(spiffe_id.try_into().unwrap()));
        params.extended_key_usages = vec![
            ExtendedKeyUsagePurpose::ServerAuth,
            ExtendedKeyUsagePurpose::ClientAuth,
        ];
        let cert = params.signed_by(&key, &self.ca, &self.ca_key).unwrap();
        TlsMaterial::from_pem(&cert.pem(), &key.serialize_pem(), &self.ca.pem()).unwrap()
    }
}
