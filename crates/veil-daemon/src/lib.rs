//! # veil-daemon
//!
//! The three Veil roles, all driven by one `veil.toml`:
//!
//! - **db-server** ([`RecordServer`]): mutual-TLS line service that hands out
//!   patient records, redacted per caller identity.
//! - **gateway** ([`gateway::router`]): HTTP front end exposing `/connect` and
//!   `/getdata`, reaching the db-server over mutual TLS with its own identity.
//! - **probe** ([`run_probe`]): reconnecting client that greets the db-server
//!   and logs what it says.
//!
//! ## Key invariants
//!
//! - Peers are authorized inside the TLS handshake; no request line is read
//!   from a peer the authorizer rejected.
//! - A redaction failure of any kind (policy error, timeout, unreadable record
//!   source) answers with an empty record set, never an unredacted one.
//! - A failed gateway request answers 403 without a `patients` field.

pub mod config;
pub mod db_server;
pub mod error;
pub mod gateway;
pub mod probe;
pub mod upstream;

pub use config::{AuthorizationMode, DaemonConfig};
pub use db_server::{RecordServer, RecordService};
pub use error::{DaemonError, UpstreamError};
pub use gateway::GatewayState;
pub use probe::run_probe;
pub use upstream::UpstreamClient;
