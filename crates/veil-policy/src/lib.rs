//! # veil-policy
//!
//! Policy evaluation for Veil.
//!
//! Every access decision in the system is delegated to a policy: whether a
//! peer may complete a TLS handshake (the "allow" query) and which record
//! fields must be masked for that peer (the "pii" query). This crate defines
//! the contract between callers and the policy engine:
//!
//! - [`PolicySource`] loads the current policy bytes (re-read on every call).
//! - [`PolicyEngine`] evaluates a [`PolicyQuery`] into a result set. The
//!   engine is a black box; [`RuleEngine`] is the bundled YAML implementation.
//! - [`PolicyClient`] ties the two together and enforces that an evaluation
//!   yields exactly one, correctly typed decision.
//!
//! ## Key invariants
//!
//! - **No caching**: each evaluation reloads the policy through its source.
//! - **Exactly one result**: zero results is [`PolicyError::UndefinedDecision`],
//!   more than one is [`PolicyError::AmbiguousDecision`].

pub mod client;
pub mod document;
pub mod engine;
pub mod error;
pub mod identity;
pub mod source;

pub use client::{peer_input, PolicyClient, PolicyQueries, PEER_ID_KEY};
pub use document::{Clause, PolicyDocument, RuleDefinition};
pub use engine::{PolicyEngine, PolicyInput, PolicyQuery, ResultSet, RuleEngine};
pub use error::PolicyError;
pub use identity::Identity;
pub use source::{FilePolicySource, PolicySource, StaticPolicySource};
