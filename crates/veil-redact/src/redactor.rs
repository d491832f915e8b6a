// redactor.rs — The redaction engine.
//
// For each request the Redactor:
//
// 1. Builds {peerID: identity} and evaluates the pii query
// 2. Policy error → returns NO records (fail closed on data)
// 3. Empty field set → returns the records unchanged
// 4. Otherwise → returns masked copies of every record
//
// A policy error never produces unmasked records.

use veil_policy::{peer_input, Identity, PolicyClient, PolicyError};

use crate::mask::FieldMask;
use crate::schema::Redactable;

/// Applies the per-identity field mask dictated by policy.
#[derive(Clone)]
pub struct Redactor {
    client: PolicyClient,
    query: String,
}

impl Redactor {
    /// `query` names the rule returning the fields to mask
    /// (e.g., "data.example.pii").
    pub fn new(client: PolicyClient, query: impl Into<String>) -> Self {
        Self {
            client,
            query: query.into(),
        }
    }

    /// Ask the policy which fields to mask for `identity`.
    pub fn field_mask(&self, identity: &Identity) -> Result<FieldMask, PolicyError> {
        self.client
            .evaluate_string_set(&self.query, peer_input(identity))
            .map(FieldMask::from)
    }

    /// Redact `records` for `identity`. Never fails: a policy error yields an
    /// empty collection.
    pub fn redact<R: Redactable>(&self, identity: &Identity, records: &[R]) -> Vec<R> {
        let mask = match self.field_mask(identity) {
            Ok(mask) => mask,
            Err(e) => {
                tracing::warn!(
                    peer = %identity,
                    error = %e,
                    "unable to determine redaction policy; returning no records"
                );
                return Vec::new();
            }
        };

        if mask.is_empty() {
            tracing::debug!(peer = %identity, "no fields to redact");
            return records.to_vec();
        }

        let unknown = mask.unknown_fields::<R>();
        if !unknown.is_empty() {
            tracing::debug!(peer = %identity, ?unknown, "policy names fields the schema doesn't have");
        }

        tracing::info!(peer = %identity, ?mask, count = records.len(), "redacting records");
        mask.apply_all(records)
    }
}
