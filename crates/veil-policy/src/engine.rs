// engine.rs — The policy engine seam.
//
// The engine is a black box: it receives a query name, an input document and
// the raw policy source, and returns the full result set. It does not decide
// whether the result set is a usable decision; that is the PolicyClient's
// job (exactly one result, correct type).
//
// Query names follow the `data.<package>.<rule>` convention, so
// "data.example.allow" addresses rule `allow` in package `example`.

use serde_json::{Map, Value};

use crate::document::PolicyDocument;
use crate::error::PolicyError;

/// The input document handed to the policy: string keys to JSON values.
pub type PolicyInput = Map<String, Value>;

/// All values produced by one evaluation. A usable decision has exactly one.
pub type ResultSet = Vec<Value>;

/// A single evaluation request, constructed fresh for every call.
#[derive(Debug, Clone)]
pub struct PolicyQuery {
    /// Which rule to evaluate (e.g., "data.example.allow").
    pub name: String,
    /// The facts the policy decides on; contains at least `peerID`.
    pub input: PolicyInput,
    /// The policy source as loaded for this evaluation.
    pub source: Vec<u8>,
}

/// Evaluates policy queries. Implementations must be stateless with respect
/// to the policy: everything they need arrives in the [`PolicyQuery`].
pub trait PolicyEngine: Send + Sync {
    fn evaluate(&self, query: &PolicyQuery) -> Result<ResultSet, PolicyError>;
}

/// The bundled engine for YAML [`PolicyDocument`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }
}

impl PolicyEngine for RuleEngine {
    fn evaluate(&self, query: &PolicyQuery) -> Result<ResultSet, PolicyError> {
        let (package, rule) = split_query(&query.name)?;
        let document = PolicyDocument::parse(&query.source)?;

        // Another package's rule is undefined here, not an error.
        if document.package != package {
            return Ok(Vec::new());
        }
        document.evaluate_rule(rule, &query.input)
    }
}

/// Split `data.<package>.<rule>` into its package path and rule name.
/// Packages may themselves be dotted (`data.acme.records.pii`).
fn split_query(name: &str) -> Result<(&str, &str), PolicyError> {
    let invalid = || PolicyError::InvalidQuery {
        query: name.to_string(),
    };
    let path = name.strip_prefix("data.").ok_or_else(invalid)?;
    let (package, rule) = path.rsplit_once('.').ok_or_else(invalid)?;
    if package.is_empty() || rule.is_empty() {
        return Err(invalid());
    }
    Ok((package, rule))
}
