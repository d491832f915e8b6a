// client.rs — Typed policy evaluation.
//
// PolicyClient is what the rest of the system talks to. For every call it:
//
// 1. Loads the current policy through its PolicySource (no caching)
// 2. Hands query + input + policy bytes to the PolicyEngine
// 3. Requires exactly one result (zero → undefined, more → ambiguous)
// 4. Checks the result has the type the caller asked for
//
// Both the handshake authorizer and the redaction engine go through here.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::{PolicyEngine, PolicyInput, PolicyQuery};
use crate::error::PolicyError;
use crate::identity::Identity;
use crate::source::PolicySource;

/// Input key under which the caller identity is passed to the policy.
pub const PEER_ID_KEY: &str = "peerID";

/// Build the standard input document `{peerID: identity}`.
pub fn peer_input(identity: &Identity) -> PolicyInput {
    let mut input = PolicyInput::new();
    input.insert(
        PEER_ID_KEY.to_string(),
        Value::String(identity.as_str().to_string()),
    );
    input
}

/// Names of the two queries the system evaluates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyQueries {
    /// Boolean rule consulted during the TLS handshake.
    #[serde(rename = "allow_query", default = "default_allow_query")]
    pub allow: String,
    /// Rule returning the set of record fields to mask.
    #[serde(rename = "pii_query", default = "default_pii_query")]
    pub pii_fields: String,
}

impl Default for PolicyQueries {
    fn default() -> Self {
        Self {
            allow: default_allow_query(),
            pii_fields: default_pii_query(),
        }
    }
}

fn default_allow_query() -> String {
    "data.example.allow".to_string()
}

fn default_pii_query() -> String {
    "data.example.pii".to_string()
}

/// Evaluates named queries against the current policy.
///
/// Cloning is cheap: both collaborators sit behind `Arc`, so every
/// connection task can hold its own handle.
#[derive(Clone)]
pub struct PolicyClient {
    engine: Arc<dyn PolicyEngine>,
    source: Arc<dyn PolicySource>,
}

impl PolicyClient {
    pub fn new(engine: Arc<dyn PolicyEngine>, source: Arc<dyn PolicySource>) -> Self {
        Self { engine, source }
    }

    /// Name of the underlying policy source, for logs.
    pub fn source_name(&self) -> String {
        self.source.name()
    }

    /// Evaluate a query and return its single decision value.
    pub fn evaluate(&self, query_name: &str, input: PolicyInput) -> Result<Value, PolicyError> {
        tracing::debug!(query = query_name, ?input, "policy input");

        let query = PolicyQuery {
            name: query_name.to_string(),
            input,
            source: self.source.load_current_policy()?,
        };
        let mut results = self.engine.evaluate(&query)?;

        match results.len() {
            0 => Err(PolicyError::UndefinedDecision {
                query: query.name,
            }),
            1 => Ok(results.remove(0)),
            count => Err(PolicyError::AmbiguousDecision {
                query: query.name,
                count,
            }),
        }
    }

    /// Evaluate a query whose decision must be a boolean.
    pub fn evaluate_bool(&self, query_name: &str, input: PolicyInput) -> Result<bool, PolicyError> {
        match self.evaluate(query_name, input)? {
            Value::Bool(decision) => Ok(decision),
            other => Err(unexpected(query_name, "boolean", &other)),
        }
    }

    /// Evaluate a query whose decision must be a collection of strings.
    ///
    /// Duplicates collapse; order is irrelevant to callers.
    pub fn evaluate_string_set(
        &self,
        query_name: &str,
        input: PolicyInput,
    ) -> Result<BTreeSet<String>, PolicyError> {
        let value = self.evaluate(query_name, input)?;
        let Value::Array(items) = &value else {
            return Err(unexpected(query_name, "set of strings", &value));
        };
        items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                _ => Err(unexpected(query_name, "set of strings", &value)),
            })
            .collect()
    }
}

fn unexpected(query: &str, expected: &'static str, actual: &Value) -> PolicyError {
    PolicyError::UnexpectedType {
        query: query.to_string(),
        expected,
        actual: type_name(actual).to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RuleEngine;
    use crate::source::{FilePolicySource, StaticPolicySource};
    use tempfile::tempdir;

    const POLICY: &str = r#"
package: example
rules:
  allow:
    default: false
    clauses:
      - when: { peerID: "spiffe://domain.test/privileged" }
        value: true
      - when: { peerID: "spiffe://domain.test/restricted" }
        value: true
  pii:
    default: []
    clauses:
      - when: { peerID: "spiffe://domain.test/restricted" }
        value: ["SSN", "SSN"]
  conflicting:
    clauses:
      - value: 1
      - value: 2
  label:
    default: "hello"
  mixed:
    default: ["SSN", 4]
"#;

    fn client(policy: &str) -> PolicyClient {
        PolicyClient::new(
            Arc::new(RuleEngine::new()),
            Arc::new(StaticPolicySource::new(policy)),
        )
    }

    fn peer(id: &str) -> PolicyInput {
        peer_input(&Identity::new(id))
    }

    #[test]
    fn peer_input_uses_peer_id_key() {
        let input = peer("spiffe://domain.test/x");
        assert_eq!(input.get("peerID"), Some(&Value::from("spiffe://domain.test/x")));
    }

    #[test]
    fn allow_decisions_are_booleans() {
        let client = client(POLICY);
        assert!(client
            .evaluate_bool("data.example.allow", peer("spiffe://domain.test/privileged"))
            .unwrap());
        assert!(!client
            .evaluate_bool("data.example.allow", peer("spiffe://domain.test/external"))
            .unwrap());
    }

    #[test]
    fn pii_decisions_are_string_sets() {
        let client = client(POLICY);
        let fields = client
            .evaluate_string_set("data.example.pii", peer("spiffe://domain.test/restricted"))
            .unwrap();
        assert_eq!(fields.into_iter().collect::<Vec<_>>(), vec!["SSN".to_string()]);

        let none = client
            .evaluate_string_set("data.example.pii", peer("spiffe://domain.test/db-server"))
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn undefined_rule_is_undefined_decision() {
        let err = client(POLICY)
            .evaluate("data.example.missing", peer("x"))
            .unwrap_err();
        assert!(matches!(err, PolicyError::UndefinedDecision { .. }));
    }

    #[test]
    fn several_results_are_ambiguous() {
        let err = client(POLICY)
            .evaluate("data.example.conflicting", peer("x"))
            .unwrap_err();
        assert!(matches!(err, PolicyError::AmbiguousDecision { count: 2, .. }));
    }

    #[test]
    fn wrong_types_are_rejected() {
        let client = client(POLICY);
        let err = client
            .evaluate_bool("data.example.label", peer("x"))
            .unwrap_err();
        assert!(matches!(
            err,
            PolicyError::UnexpectedType { expected: "boolean", .. }
        ));

        let err = client
            .evaluate_string_set("data.example.allow", peer("x"))
            .unwrap_err();
        assert!(matches!(err, PolicyError::UnexpectedType { .. }));

        let err = client
            .evaluate_string_set("data.example.mixed", peer("x"))
            .unwrap_err();
        assert!(matches!(err, PolicyError::UnexpectedType { .. }));
    }

    #[test]
    fn unparsable_policy_is_an_error() {
        let err = client("rules: [")
            .evaluate_bool("data.example.allow", peer("x"))
            .unwrap_err();
        assert!(matches!(err, PolicyError::InvalidPolicy { .. }));
    }

    #[test]
    fn policy_edits_take_effect_on_the_next_call() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("policy.yaml");
        std::fs::write(&path, POLICY).unwrap();

        let client = PolicyClient::new(
            Arc::new(RuleEngine::new()),
            Arc::new(FilePolicySource::new(&path)),
        );
        let external = || peer("spiffe://domain.test/external");
        assert!(!client.evaluate_bool("data.example.allow", external()).unwrap());

        std::fs::write(
            &path,
            "package: example\nrules:\n  allow:\n    default: true\n",
        )
        .unwrap();
        assert!(client.evaluate_bool("data.example.allow", external()).unwrap());

        std::fs::remove_file(&path).unwrap();
        let err = client
            .evaluate_bool("data.example.allow", external())
            .unwrap_err();
        assert!(matches!(err, PolicyError::SourceUnreadable { .. }));
    }

    #[test]
    fn default_query_names() {
        let queries = PolicyQueries::default();
        assert_eq!(queries.allow, "data.example.allow");
        assert_eq!(queries.pii_fields, "data.example.pii");
    }
}
