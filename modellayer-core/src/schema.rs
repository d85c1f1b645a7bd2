//! Static field descriptors for model types.
//!
//! Each model declares its persisted fields as a compile-time list of
//! [`FieldDef`] entries instead of a runtime-reflected name list. The
//! descriptor doubles as the read/write allow-list: document keys outside it
//! are dropped on fetch and filtered on insert, and `hidden` entries form a
//! second visibility tier that only surfaces when a query asks for all
//! fields.

/// Name of the identifier field. Every schema must declare it.
pub const ID_FIELD: &str = "_id";

/// Name of the virtual, read-only string form of the identifier.
pub const ID_VIRTUAL_FIELD: &str = "id";

/// Semantic type of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Native store identifier.
    Id,
    Bool,
    Int,
    Float,
    String,
    /// Date/time, stored as the native timestamp type.
    Date,
    /// Ordered sequence.
    List,
    /// Nested object.
    Object,
    /// No declared shape; the value passes through as-is.
    Any,
}

/// Declaration of one persisted field.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Document key.
    pub name: &'static str,
    /// Declared semantic type.
    pub kind: FieldKind,
    /// Field must be present and non-null on insert.
    pub required: bool,
    /// Internal/administrative field, exposed only with `fetch_all_fields`.
    pub hidden: bool,
}

impl FieldDef {
    /// Declares a visible, optional field.
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        FieldDef { name, kind, required: false, hidden: false }
    }

    /// Marks the field required on write.
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the field as hidden from the default visibility tier.
    pub const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

/// Ordered set of field declarations for one model type.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    fields: &'static [FieldDef],
}

impl Schema {
    /// Wraps a static field list. The list must include [`ID_FIELD`].
    pub const fn new(fields: &'static [FieldDef]) -> Self {
        Schema { fields }
    }

    /// All declarations, in order.
    pub fn fields(&self) -> &'static [FieldDef] {
        self.fields
    }

    /// Looks up a declaration by name.
    pub fn get(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// The read/write allow-list for the given visibility tier.
    pub fn field_names(&self, fetch_all_fields: bool) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|field| fetch_all_fields || !field.hidden)
            .map(|field| field.name)
            .collect()
    }

    /// Whether a document key is allowed in the given visibility tier.
    pub fn contains(&self, name: &str, fetch_all_fields: bool) -> bool {
        self.fields
            .iter()
            .any(|field| field.name == name && (fetch_all_fields || !field.hidden))
    }

    /// Whether the identifier field is declared.
    pub fn declares_id(&self) -> bool {
        self.get(ID_FIELD).is_some()
    }

    /// Fields that must be present and non-null on insert.
    pub fn required_fields(&self) -> impl Iterator<Item = &'static FieldDef> {
        self.fields.iter().filter(|field| field.required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[FieldDef] = &[
        FieldDef::new(ID_FIELD, FieldKind::Id),
        FieldDef::new("title", FieldKind::String).required(),
        FieldDef::new("tags", FieldKind::List),
        FieldDef::new("internal_notes", FieldKind::String).hidden(),
    ];

    #[test]
    fn visibility_tiers() {
        let schema = Schema::new(FIELDS);
        assert_eq!(schema.field_names(false), vec![ID_FIELD, "title", "tags"]);
        assert_eq!(
            schema.field_names(true),
            vec![ID_FIELD, "title", "tags", "internal_notes"]
        );
        assert!(!schema.contains("internal_notes", false));
        assert!(schema.contains("internal_notes", true));
        assert!(!schema.contains("unknown", true));
    }

    #[test]
    fn required_and_id() {
        let schema = Schema::new(FIELDS);
        assert!(schema.declares_id());
        let required: Vec<_> = schema.required_fields().map(|f| f.name).collect();
        assert_eq!(required, vec!["title"]);
    }
}
