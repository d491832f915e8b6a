// schema.rs — Declared record schemas.
//
// Instead of a hand-written branch per field, a record type lists its fields
// once. Masking iterates that list, so a field added to the schema is
// automatically covered by redaction.

/// One named string field of a record, with plain function accessors.
pub struct FieldSpec<R> {
    /// The name policies use to refer to this field (e.g., "SSN").
    pub name: &'static str,
    pub get: fn(&R) -> &str,
    pub set: fn(&mut R, String),
}

/// A record type whose string fields can be masked by name.
///
/// ```
/// use veil_redact::{FieldSpec, Redactable};
///
/// #[derive(Clone)]
/// struct Account {
///     owner: String,
/// }
///
/// impl Redactable for Account {
///     fn schema() -> &'static [FieldSpec<Self>] {
///         const SCHEMA: &[FieldSpec<Account>] = &[FieldSpec {
///             name: "Owner",
///             get: |a| a.owner.as_str(),
///             set: |a, v| a.owner = v,
///         }];
///         SCHEMA
///     }
/// }
///
/// assert_eq!(Account::field_names(), vec!["Owner"]);
/// ```
pub trait Redactable: Clone + Sized + 'static {
    /// Ordered field declarations.
    fn schema() -> &'static [FieldSpec<Self>];

    /// Policy-facing names of every declared field, in schema order.
    fn field_names() -> Vec<&'static str> {
        Self::schema().iter().map(|f| f.name).collect()
    }
}
