// authorizer.rs — Handshake-time peer authorization.
//
// An Authorizer is consulted synchronously from inside the rustls certificate
// verifier, after the chain has been verified against the trust bundle and
// the peer's identity has been extracted. Returning an error aborts the
// handshake; the peer only ever sees a generic certificate alert.
//
// The policy-driven authorizer fails closed: a policy that cannot be read,
// parsed or evaluated rejects the peer exactly like an explicit "false".

use std::fmt;

use thiserror::Error;
use tokio_rustls::rustls::pki_types::CertificateDer;
use veil_policy::{peer_input, Identity, PolicyClient, PolicyError};

/// Why a peer was rejected.
#[derive(Debug, Error)]
pub enum AuthorizeError {
    /// The authorizer decided the peer is not allowed.
    #[error("denied request: unexpected peer ID {identity}")]
    Denied { identity: Identity },

    /// The policy could not produce a decision.
    #[error("policy evaluation failed for peer ID {identity}: {source}")]
    Policy {
        identity: Identity,
        source: PolicyError,
    },
}

/// Decides whether a verified peer may complete the handshake.
///
/// `chain` is the peer's certificate chain, end-entity first.
pub trait Authorizer: fmt::Debug + Send + Sync {
    fn authorize(&self, peer: &Identity, chain: &[CertificateDer<'_>]) -> Result<(), AuthorizeError>;
}

/// Accepts every peer whose chain verified.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizeAny;

impl Authorizer for AuthorizeAny {
    fn authorize(&self, peer: &Identity, _chain: &[CertificateDer<'_>]) -> Result<(), AuthorizeError> {
        tracing::debug!(%peer, "accepting any verified peer");
        Ok(())
    }
}

/// Accepts exactly one identity.
#[derive(Debug, Clone)]
pub struct AuthorizeId {
    expected: Identity,
}

impl AuthorizeId {
    pub fn new(expected: impl Into<Identity>) -> Self {
        Self {
            expected: expected.into(),
        }
    }
}

impl Authorizer for AuthorizeId {
    fn authorize(&self, peer: &Identity, _chain: &[CertificateDer<'_>]) -> Result<(), AuthorizeError> {
        if *peer == self.expected {
            Ok(())
        } else {
            tracing::warn!(%peer, expected = %self.expected, "denied request: unexpected peer ID");
            Err(AuthorizeError::Denied {
                identity: peer.clone(),
            })
        }
    }
}

/// Evaluates the allow query with `{peerID: identity}`.
#[derive(Clone)]
pub struct PolicyAuthorizer {
    client: PolicyClient,
    query: String,
}

impl PolicyAuthorizer {
    /// `query` names the boolean rule to consult (e.g., "data.example.allow").
    pub fn new(client: PolicyClient, query: impl Into<String>) -> Self {
        Self {
            client,
            query: query.into(),
        }
    }
}

impl fmt::Debug for PolicyAuthorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyAuthorizer")
            .field("query", &self.query)
            .field("source", &self.client.source_name())
            .finish()
    }
}

impl Authorizer for PolicyAuthorizer {
    fn authorize(&self, peer: &Identity, _chain: &[CertificateDer<'_>]) -> Result<(), AuthorizeError> {
        // Blocking: reads the policy source on the handshake's thread.
        match self.client.evaluate_bool(&self.query, peer_input(peer)) {
            Ok(true) => {
                tracing::info!(%peer, "policy allowed request");
                Ok(())
            }
            Ok(false) => {
                tracing::warn!(%peer, "policy denied request: unexpected peer ID");
                Err(AuthorizeError::Denied {
                    identity: peer.clone(),
                })
            }
            Err(source) => {
                tracing::warn!(%peer, error = %source, "policy evaluation failed; rejecting peer");
                Err(AuthorizeError::Policy {
                    identity: peer.clone(),
                    source,
                })
            }
        }
    }
}
