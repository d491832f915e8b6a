// document.rs — YAML policy documents understood by the bundled RuleEngine.
//
// A document declares one package and a set of named rules. Each rule is a
// list of clauses guarded by `when` conditions, plus an optional default:
//
//   package: example
//   rules:
//     allow:
//       default: false
//       clauses:
//         - when: { peerID: "spiffe://domain.test/privileged" }
//           value: true
//
// A clause matches when every `when` key exists in the input as a string and
// the string matches the glob pattern. Evaluating a rule yields the distinct
// values of all matching clauses in document order; the default applies only
// when no clause matched. A rule with neither is undefined for that input.

use std::collections::BTreeMap;

use glob::Pattern;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::PolicyInput;
use crate::error::PolicyError;

/// A parsed policy document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// Package name; queries address rules as `data.<package>.<rule>`.
    pub package: String,
    #[serde(default)]
    pub rules: BTreeMap<String, RuleDefinition>,
}

/// A named rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Value produced when no clause matches.
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub clauses: Vec<Clause>,
}

/// One guarded value of a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clause {
    /// Input key → glob pattern. An empty map always matches.
    #[serde(default)]
    pub when: BTreeMap<String, String>,
    pub value: Value,
}

impl PolicyDocument {
    /// Parse a document from raw policy bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, PolicyError> {
        let document: PolicyDocument =
            serde_yaml::from_slice(bytes).map_err(|e| PolicyError::InvalidPolicy {
                reason: e.to_string(),
            })?;
        document.validate()?;
        Ok(document)
    }

    /// Reject documents whose patterns would fail at evaluation time, so a
    /// broken clause is reported even when it is never reached.
    fn validate(&self) -> Result<(), PolicyError> {
        if self.package.trim().is_empty() {
            return Err(PolicyError::InvalidPolicy {
                reason: "package name is empty".to_string(),
            });
        }
        for (rule_name, rule) in &self.rules {
            for clause in &rule.clauses {
                for pattern in clause.when.values() {
                    compile(pattern).map_err(|reason| PolicyError::InvalidPolicy {
                        reason: format!("rule '{}': {}", rule_name, reason),
                    })?;
                }
            }
        }
        Ok(())
    }

    /// Evaluate a rule against the input, returning every result value.
    ///
    /// An unknown rule yields an empty result set, like an unknown package.
    pub fn evaluate_rule(&self, rule_name: &str, input: &PolicyInput) -> Result<Vec<Value>, PolicyError> {
        let Some(rule) = self.rules.get(rule_name) else {
            return Ok(Vec::new());
        };
        rule.evaluate(input)
    }
}

impl RuleDefinition {
    fn evaluate(&self, input: &PolicyInput) -> Result<Vec<Value>, PolicyError> {
        let mut results: Vec<Value> = Vec::new();
        for clause in &self.clauses {
            if clause.matches(input)? && !results.contains(&clause.value) {
                results.push(clause.value.clone());
            }
        }
        if results.is_empty() {
            if let Some(default) = &self.default {
                results.push(default.clone());
            }
        }
        Ok(results)
    }
}

impl Clause {
    fn matches(&self, input: &PolicyInput) -> Result<bool, PolicyError> {
        for (key, pattern) in &self.when {
            let Some(Value::String(actual)) = input.get(key) else {
                return Ok(false);
            };
            let pattern =
                compile(pattern).map_err(|reason| PolicyError::InvalidPolicy { reason })?;
            if !pattern.matches(actual) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn compile(pattern: &str) -> Result<Pattern, String> {
    Pattern::new(pattern).map_err(|e| format!("invalid pattern '{}': {}", pattern, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const POLICY: &str = r#"
package: example
rules:
  allow:
    default: false
    clauses:
      - when: { peerID: "spiffe://domain.test/privileged" }
        value: true
      - when: { peerID: "spiffe://domain.test/team-*" }
        value: true
  pii:
    clauses:
      - when: { peerID: "spiffe://domain.test/restricted" }
        value: ["SSN"]
      - when: { peerID: "spiffe://domain.test/restricted" }
        value: ["SSN", "Lastname"]
"#;

    fn input(peer: &str) -> PolicyInput {
        let mut input = PolicyInput::new();
        input.insert("peerID".to_string(), json!(peer));
        input
    }

    #[test]
    fn exact_match_wins_over_default() {
        let doc = PolicyDocument::parse(POLICY.as_bytes()).unwrap();
        let results = doc
            .evaluate_rule("allow", &input("spiffe://domain.test/privileged"))
            .unwrap();
        assert_eq!(results, vec![json!(true)]);
    }

    #[test]
    fn glob_patterns_match_identity_paths() {
        let doc = PolicyDocument::parse(POLICY.as_bytes()).unwrap();
        let results = doc
            .evaluate_rule("allow", &input("spiffe://domain.test/team-billing"))
            .unwrap();
        assert_eq!(results, vec![json!(true)]);
    }

    #[test]
    fn default_applies_when_nothing_matches() {
        let doc = PolicyDocument::parse(POLICY.as_bytes()).unwrap();
        let results = doc
            .evaluate_rule("allow", &input("spiffe://domain.test/external"))
            .unwrap();
        assert_eq!(results, vec![json!(false)]);
    }

    #[test]
    fn rule_without_default_is_undefined_for_unmatched_input() {
        let doc = PolicyDocument::parse(POLICY.as_bytes()).unwrap();
        let results = doc
            .evaluate_rule("pii", &input("spiffe://domain.test/privileged"))
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn conflicting_clauses_produce_several_results() {
        let doc = PolicyDocument::parse(POLICY.as_bytes()).unwrap();
        let results = doc
            .evaluate_rule("pii", &input("spiffe://domain.test/restricted"))
            .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn missing_input_key_never_matches() {
        let doc = PolicyDocument::parse(POLICY.as_bytes()).unwrap();
        let results = doc.evaluate_rule("allow", &PolicyInput::new()).unwrap();
        assert_eq!(results, vec![json!(false)]);
    }

    #[test]
    fn unknown_rule_is_empty() {
        let doc = PolicyDocument::parse(POLICY.as_bytes()).unwrap();
        assert!(doc.evaluate_rule("nope", &input("x")).unwrap().is_empty());
    }

    #[test]
    fn malformed_yaml_is_invalid_policy() {
        let err = PolicyDocument::parse(b"package: [unterminated").unwrap_err();
        assert!(matches!(err, PolicyError::InvalidPolicy { .. }));
    }

    #[test]
    fn bad_glob_is_rejected_at_parse_time() {
        let policy = r#"
package: example
rules:
  allow:
    clauses:
      - when: { peerID: "spiffe://[" }
        value: true
"#;
        let err = PolicyDocument::parse(policy.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("allow"));
    }
}
