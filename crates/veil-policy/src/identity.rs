// identity.rs — Verified peer identity.
//
// An Identity is the string form of the peer's SPIFFE ID as extracted from a
// verified certificate. It carries no lifecycle of its own: it lives as long
// as the connection or request that produced it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A verified caller identity, e.g. `spiffe://domain.test/restricted`.
///
/// `#[serde(transparent)]` makes it serialize as a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_and_serializes_as_plain_string() {
        let id = Identity::new("spiffe://domain.test/restricted");
        assert_eq!(id.to_string(), "spiffe://domain.test/restricted");
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"spiffe://domain.test/restricted\""
        );
    }
}
