//! # veil-records
//!
//! The data Veil protects and the formats it travels in.
//!
//! - [`Patient`]: the record schema, redactable by field name.
//! - [`RecordSource`]: where a request's records come from.
//! - [`protocol`]: the newline-delimited command protocol spoken between the
//!   gateway and the db-server.
//! - [`Envelope`]: the JSON document returned to HTTP callers.

pub mod envelope;
pub mod error;
pub mod patient;
pub mod protocol;
pub mod source;

pub use envelope::{ConnectionStatus, Envelope};
pub use error::RecordError;
pub use patient::{sample_patients, Patient};
pub use protocol::Command;
pub use source::{JsonFileRecordSource, RecordSource, SampleRecordSource};
