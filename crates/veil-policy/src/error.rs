// error.rs — Error types for the policy subsystem.
//
// Each variant is a distinct failure mode of a single evaluation. Callers
// decide what a failure means: the handshake path rejects the peer, the
// redaction path returns no records.

use thiserror::Error;

/// Errors that can occur while loading or evaluating a policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The policy source could not be read.
    #[error("failed to read policy from {source_name}: {error}")]
    SourceUnreadable {
        source_name: String,
        #[source]
        error: std::io::Error,
    },

    /// The policy source was read but is not a valid policy document.
    #[error("invalid policy: {reason}")]
    InvalidPolicy { reason: String },

    /// The query name is not of the form `data.<package>.<rule>`.
    #[error("invalid query '{query}': expected data.<package>.<rule>")]
    InvalidQuery { query: String },

    /// Evaluation produced no result (no matching clause and no default).
    #[error("undefined decision for query '{query}'")]
    UndefinedDecision { query: String },

    /// Evaluation produced more than one result.
    #[error("ambiguous decision for query '{query}': {count} results")]
    AmbiguousDecision { query: String, count: usize },

    /// The decision value has a different type than the caller expected.
    #[error("illegal value for query '{query}': expected {expected}, got {actual}")]
    UnexpectedType {
        query: String,
        expected: &'static str,
        actual: String,
    },
}
