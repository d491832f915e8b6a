// envelope.rs — The JSON document returned by the gateway's HTTP endpoints.
//
// Every field is optional on the wire: `/connect` never carries patients, and
// a failed `/getdata` carries a reason instead of records.

use serde::{Deserialize, Serialize};
use veil_policy::Identity;

use crate::patient::Patient;

/// Whether the authorized connection to the db-server was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Created,
    #[serde(rename = "Not Created")]
    NotCreated,
}

/// Response body for `/connect` and `/getdata`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// The identity the gateway presented to the db-server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<Identity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_status: Option<ConnectionStatus>,
    /// Human-readable outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patients: Vec<Patient>,
}

impl Envelope {
    /// A successful connection with a message from the server.
    pub fn created(client: &Identity, reason: impl Into<String>) -> Self {
        Self {
            client: Some(client.clone()),
            connection_status: Some(ConnectionStatus::Created),
            reason: Some(reason.into()),
            patients: Vec::new(),
        }
    }

    /// A successful data fetch.
    pub fn with_patients(client: &Identity, patients: Vec<Patient>) -> Self {
        Self {
            client: Some(client.clone()),
            connection_status: Some(ConnectionStatus::Created),
            reason: None,
            patients,
        }
    }

    /// A failed request: no records, just the reason.
    pub fn failed(client: &Identity, reason: impl Into<String>) -> Self {
        Self {
            client: Some(client.clone()),
            connection_status: Some(ConnectionStatus::NotCreated),
            reason: Some(reason.into()),
            patients: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> Identity {
        Identity::new("spiffe://domain.test/restricted")
    }

    #[test]
    fn failure_envelope_has_no_patients_field() {
        let json = serde_json::to_value(Envelope::failed(&client(), "denied")).unwrap();
        assert_eq!(
            json,
            json!({
                "client": "spiffe://domain.test/restricted",
                "connection_status": "Not Created",
                "reason": "denied"
            })
        );
    }

    #[test]
    fn created_envelope() {
        let json = serde_json::to_value(Envelope::created(&client(), "ok")).unwrap();
        assert_eq!(json["connection_status"], "Created");
        assert!(json.get("patients").is_none());
    }

    #[test]
    fn patients_round_trip() {
        let envelope = Envelope::with_patients(&client(), crate::sample_patients());
        let text = serde_json::to_string(&envelope).unwrap();
        let back: Envelope = serde_json::from_str(&text).unwrap();
        assert_eq!(back, envelope);
    }
}
