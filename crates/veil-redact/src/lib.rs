//! # veil-redact
//!
//! Per-identity field masking for homogeneous record collections.
//!
//! A record type opts in by implementing [`Redactable`], which declares its
//! schema as an ordered list of [`FieldSpec`]s (name + getter + setter). The
//! [`Redactor`] asks the policy which field names to mask for a caller and
//! applies the resulting [`FieldMask`] to every record.
//!
//! ## Key invariants
//!
//! - **Fail closed**: if the policy cannot be evaluated, no records are
//!   returned at all.
//! - **Originals untouched**: redaction always produces a new collection.
//! - **Exact names**: field names match case-sensitively; names the schema
//!   doesn't declare are ignored.

pub mod mask;
pub mod redactor;
pub mod schema;

pub use mask::{FieldMask, MASK_TOKEN};
pub use redactor::Redactor;
pub use schema::{FieldSpec, Redactable};
