// mask.rs — A set of field names to replace with the mask token.

use std::collections::BTreeSet;

use crate::schema::Redactable;

/// The literal value substituted for every masked field: eleven asterisks.
pub const MASK_TOKEN: &str = "***********";

/// Field names a caller must not see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMask {
    fields: BTreeSet<String>,
}

impl FieldMask {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains(name)
    }

    /// Names in the mask that `R`'s schema doesn't declare. They match nothing.
    pub fn unknown_fields<R: Redactable>(&self) -> Vec<&str> {
        let known = R::field_names();
        self.fields
            .iter()
            .map(String::as_str)
            .filter(|name| !known.iter().any(|k| k == name))
            .collect()
    }

    /// Produce a masked copy of one record. The original is not modified.
    pub fn apply<R: Redactable>(&self, record: &R) -> R {
        let mut masked = record.clone();
        for field in R::schema() {
            if self.contains(field.name) && (field.get)(&masked) != MASK_TOKEN {
                (field.set)(&mut masked, MASK_TOKEN.to_string());
            }
        }
        masked
    }

    /// Produce masked copies of a whole collection.
    pub fn apply_all<R: Redactable>(&self, records: &[R]) -> Vec<R> {
        records.iter().map(|r| self.apply(r)).collect()
    }
}

impl From<BTreeSet<String>> for FieldMask {
    fn from(fields: BTreeSet<String>) -> Self {
        Self { fields }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::schema::FieldSpec;

    /// Minimal two-field record used by the crate's tests.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) struct Contact {
        pub name: String,
        pub phone: String,
    }

    impl Redactable for Contact {
        fn schema() -> &'static [FieldSpec<Self>] {
            const SCHEMA: &[FieldSpec<Contact>] = &[
                FieldSpec {
                    name: "Name",
                    get: |c| c.name.as_str(),
                    set: |c, v| c.name = v,
                },
                FieldSpec {
                    name: "Phone",
                    get: |c| c.phone.as_str(),
                    set: |c, v| c.phone = v,
                },
            ];
            SCHEMA
        }
    }

    pub(crate) fn contact(name: &str, phone: &str) -> Contact {
        Contact {
            name: name.to_string(),
            phone: phone.to_string(),
        }
    }

    #[test]
    fn masks_only_listed_fields() {
        let original = contact("Ada", "555-0100");
        let masked = FieldMask::new(["Phone"]).apply(&original);

        assert_eq!(masked.name, "Ada");
        assert_eq!(masked.phone, MASK_TOKEN);
        assert_eq!(original.phone, "555-0100");
    }

    #[test]
    fn mask_token_is_eleven_asterisks() {
        assert_eq!(MASK_TOKEN.len(), 11);
        assert!(MASK_TOKEN.chars().all(|c| c == '*'));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let masked = FieldMask::new(["phone", "NAME"]).apply(&contact("Ada", "555-0100"));
        assert_eq!(masked, contact("Ada", "555-0100"));
    }

    #[test]
    fn unknown_names_are_reported_and_ignored() {
        let mask = FieldMask::new(["Phone", "Email"]);
        assert_eq!(mask.unknown_fields::<Contact>(), vec!["Email"]);

        let masked = mask.apply(&contact("Ada", "555-0100"));
        assert_eq!(masked.name, "Ada");
    }

    #[test]
    fn empty_fields_are_still_masked() {
        let masked = FieldMask::new(["Phone"]).apply(&contact("Ada", ""));
        assert_eq!(masked.phone, MASK_TOKEN);
    }

    #[test]
    fn masking_a_masked_record_changes_nothing() {
        let mask = FieldMask::new(["Name", "Phone"]);
        let once = mask.apply(&contact("Ada", "555-0100"));
        assert!(mask.contains("Name"));
        assert_eq!(mask.apply(&once), once);
    }
}
