// verifier.rs — rustls certificate verifiers that authorize the peer.
//
// Both verifiers do the same thing after chain validation: extract the
// peer's SPIFFE identity and ask the Authorizer. A rejection is returned as
// `CertificateError::Other` wrapping the AuthorizeError, which makes rustls
// send a certificate_unknown alert and lets our own side recover the typed
// reason (see TlsError::from_io).
//
// The server verifier checks the chain only. Server names are not compared
// against DNS SANs; the SPIFFE ID is what gets authorized.

use std::fmt;
use std::sync::Arc;

use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::client::verify_server_cert_signed_by_trust_anchor;
use tokio_rustls::rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::server::danger::{ClientCertVerified, ClientCertVerifier};
use tokio_rustls::rustls::server::ParsedCertificate;
use tokio_rustls::rustls::{
    CertificateError, DigitallySignedStruct, DistinguishedName, Error, OtherError, RootCertStore,
    SignatureScheme,
};
use veil_policy::Identity;

use crate::authorizer::Authorizer;
use crate::error::TlsError;
use crate::identity::identity_from_certificate;

fn authorize(
    authorizer: &dyn Authorizer,
    end_entity: &CertificateDer<'_>,
    intermediates: &[CertificateDer<'_>],
) -> Result<Identity, Error> {
    let peer = identity_from_certificate(end_entity).map_err(|e| match e {
        TlsError::MalformedCertificate { .. } => Error::InvalidCertificate(CertificateError::BadEncoding),
        other => Error::InvalidCertificate(CertificateError::Other(OtherError(Arc::new(other)))),
    })?;

    let mut chain = Vec::with_capacity(intermediates.len() + 1);
    chain.push(end_entity.clone());
    chain.extend(intermediates.iter().cloned());

    authorizer
        .authorize(&peer, &chain)
        .map_err(|e| Error::InvalidCertificate(CertificateError::Other(OtherError(Arc::new(e)))))?;
    Ok(peer)
}

/// Server-side verifier for client certificates.
pub struct AuthorizingClientVerifier {
    inner: Arc<dyn ClientCertVerifier>,
    authorizer: Arc<dyn Authorizer>,
}

impl AuthorizingClientVerifier {
    pub fn new(inner: Arc<dyn ClientCertVerifier>, authorizer: Arc<dyn Authorizer>) -> Self {
        Self { inner, authorizer }
    }
}

impl fmt::Debug for AuthorizingClientVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizingClientVerifier")
            .field("authorizer", &self.authorizer)
            .finish_non_exhaustive()
    }
}

impl ClientCertVerifier for AuthorizingClientVerifier {
    fn client_auth_mandatory(&self) -> bool {
        true
    }

    fn root_hint_subjects(&self) -> &[DistinguishedName] {
        self.inner.root_hint_subjects()
    }

    fn verify_client_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        now: UnixTime,
    ) -> Result<ClientCertVerified, Error> {
        self.inner.verify_client_cert(end_entity, intermediates, now)?;
        let peer = authorize(self.authorizer.as_ref(), end_entity, intermediates)?;
        tracing::debug!(%peer, "client certificate authorized");
        Ok(ClientCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// Client-side verifier for the server's certificate.
pub struct AuthorizingServerVerifier {
    roots: Arc<RootCertStore>,
    provider: Arc<CryptoProvider>,
    authorizer: Arc<dyn Authorizer>,
}

impl AuthorizingServerVerifier {
    pub fn new(
        roots: Arc<RootCertStore>,
        provider: Arc<CryptoProvider>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            roots,
            provider,
            authorizer,
        }
    }
}

impl fmt::Debug for AuthorizingServerVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizingServerVerifier")
            .field("roots", &self.roots.len())
            .field("authorizer", &self.authorizer)
            .finish_non_exhaustive()
    }
}

impl ServerCertVerifier for AuthorizingServerVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, Error> {
        let parsed = ParsedCertificate::try_from(end_entity)?;
        verify_server_cert_signed_by_trust_anchor(
            &parsed,
            &self.roots,
            intermediates,
            now,
            self.provider.signature_verification_algorithms.all,
        )?;
        let peer = authorize(self.authorizer.as_ref(), end_entity, intermediates)?;
        tracing::debug!(%peer, "server certificate authorized");
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}
