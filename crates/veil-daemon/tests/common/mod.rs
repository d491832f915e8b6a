// common/mod.rs — Throwaway PKI and on-disk deployments for daemon tests.
//
// One CA per TestPki. Every leaf carries a DNS SAN "localhost" plus the
// requested spiffe:// URI SAN and is valid for client and server auth.

use std::path::Path;

use rcgen::{
    BasicConstraints, Certificate, CertificateParams, ExtendedKeyUsagePurpose, IsCa, KeyPair,
    KeyUsagePurpose, SanType,
};
use veil_tls::TlsConfig;

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

    /// Issue a leaf for `spiffe_id` and write `<name>.pem`, `<name>_key.pem`
    /// and `bundle.pem` into `dir`.
    pub fn write_identity(&self, dir: &Path, name: &str, spiffe_id: &str) -> TlsConfig {
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

        let config = TlsConfig {
            certificate: dir.join(format!("{name}.pem")),
            private_key: dir.join(format!("{name}_key.pem")),
            trust_bundle: dir.join("bundle.pem"),
        };
        std::fs::write(&config.certificate, cert.pem()).unwrap();
        std::fs::write(&config.private_key, key.serialize_pem()).unwrap();
        std::fs::write(&config.trust_bundle, self.ca.pem()).unwrap();
        config
    }
}
