//! # veil-tls
//!
//! Mutual TLS between Veil services, with the peer authorization decision
//! made inside the handshake.
//!
//! ```text
//! TCP connection
//!   → TLS handshake (rustls verifies the peer chain against the trust bundle)
//!   → Identity extracted from the peer certificate's URI SAN
//!   → Authorizer::authorize(identity, chain)
//!   → accept, or abort the handshake with a certificate alert
//! ```
//!
//! The same [`Authorizer`] capability backs all three strategies: accept any
//! verified peer ([`AuthorizeAny`]), accept one identity ([`AuthorizeId`]),
//! or ask the policy ([`PolicyAuthorizer`]).
//!
//! TLS material is an explicit [`TlsConfig`] value handed to
//! [`TlsListener::bind`] and [`TlsDialer::new`]; nothing is read from the
//! process environment.

pub mod authorizer;
pub mod config;
pub mod dialer;
pub mod error;
pub mod identity;
pub mod listener;
pub mod verifier;

pub use authorizer::{AuthorizeAny, AuthorizeError, AuthorizeId, Authorizer, PolicyAuthorizer};
pub use config::{client_config, server_config, TlsConfig, TlsMaterial};
pub use dialer::{RetryPolicy, TlsDialer};
pub use error::TlsError;
pub use identity::{identity_from_certificate, peer_identity, SPIFFE_SCHEME};
pub use listener::{PendingHandshake, TlsListener};

/// Re-exported so callers name the same rustls version this crate uses.
pub use tokio_rustls::rustls;
