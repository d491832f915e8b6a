// patient.rs — The patient record.
//
// Wire names are snake_case (`enrollee_type`) and empty fields are omitted.
// Policy-facing names are the ones in the schema below ("SSN", "EnrolleeType").

use serde::{Deserialize, Serialize};
use veil_redact::{FieldSpec, Redactable};

/// One patient, as stored by the back end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub firstname: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub lastname: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ssn: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub enrollee_type: String,
}

impl Patient {
    pub fn new(id: &str, firstname: &str, lastname: &str, ssn: &str, enrollee_type: &str) -> Self {
        Self {
            id: id.to_string(),
            firstname: firstname.to_string(),
            lastname: lastname.to_string(),
            ssn: ssn.to_string(),
            enrollee_type: enrollee_type.to_string(),
        }
    }
}

impl Redactable for Patient {
    fn schema() -> &'static [FieldSpec<Self>] {
        const SCHEMA: &[FieldSpec<Patient>] = &[
            FieldSpec {
                name: "ID",
                get: |p| p.id.as_str(),
                set: |p, v| p.id = v,
            },
            FieldSpec {
                name: "Firstname",
                get: |p| p.firstname.as_str(),
                set: |p, v| p.firstname = v,
            },
            FieldSpec {
                name: "Lastname",
                get: |p| p.lastname.as_str(),
                set: |p, v| p.lastname = v,
            },
            FieldSpec {
                name: "SSN",
                get: |p| p.ssn.as_str(),
                set: |p, v| p.ssn = v,
            },
            FieldSpec {
                name: "EnrolleeType",
                get: |p| p.enrollee_type.as_str(),
                set: |p, v| p.enrollee_type = v,
            },
        ];
        SCHEMA
    }
}

/// The fixed demo data set served by the db-server.
pub fn sample_patients() -> Vec<Patient> {
    vec![
        Patient::new("1", "Iron", "Man", "111-11-1111", "Primary"),
        Patient::new("2", "Thor", "Odinson", "222-22-2222", "Primary"),
        Patient::new("3", "Peter", "Parker", "333-33-3333", "Secondary"),
        Patient::new("4", "Nick", "Fury", "444-44-4444", "Secondary"),
    ]
}
