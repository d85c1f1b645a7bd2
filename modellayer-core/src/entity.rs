//! Entity base: dynamic property storage, dirty tracking, identifier
//! handling, and serialization.
//!
//! An [`Entity`] is the in-memory representation of one stored document.
//! Properties live in an ordered, heterogeneous bag; assignments through
//! [`Entity::set`] mark the field dirty, while the transformer loads fetched
//! data through a path that bypasses dirty tracking. The identifier is held
//! apart from the bag, is immutable once assigned, and is additionally
//! exposed through a read-only string accessor.

use std::marker::PhantomData;

use bson::oid::ObjectId;

use crate::error::{ModelError, ModelResult};
use crate::model::Model;
use crate::schema::{ID_FIELD, ID_VIRTUAL_FIELD};
use crate::transform::simplify_value;
use crate::value::{Value, ValueMap};

/// Conversion of caller-supplied identifiers into the native id type.
///
/// Accepts the native type directly or a string form; a string that is not a
/// structurally valid identifier fails with
/// [`ModelError::InvalidIdentifier`].
pub trait IntoObjectId {
    fn into_object_id(self) -> ModelResult<ObjectId>;
}

impl IntoObjectId for ObjectId {
    fn into_object_id(self) -> ModelResult<ObjectId> {
        Ok(self)
    }
}

impl IntoObjectId for &ObjectId {
    fn into_object_id(self) -> ModelResult<ObjectId> {
        Ok(*self)
    }
}

impl IntoObjectId for &str {
    fn into_object_id(self) -> ModelResult<ObjectId> {
        ObjectId::parse_str(self).map_err(|_| ModelError::InvalidIdentifier(self.to_string()))
    }
}

impl IntoObjectId for String {
    fn into_object_id(self) -> ModelResult<ObjectId> {
        self.as_str().into_object_id()
    }
}

impl IntoObjectId for &String {
    fn into_object_id(self) -> ModelResult<ObjectId> {
        self.as_str().into_object_id()
    }
}

/// Make sure the given value is a native identifier, converting a string
/// form when necessary.
pub fn ensure_object_id(id: impl IntoObjectId) -> ModelResult<ObjectId> {
    id.into_object_id()
}

/// Whether a string is a structurally valid identifier. Never fails.
pub fn is_valid_object_id(value: &str) -> bool {
    ObjectId::parse_str(value).is_ok()
}

/// In-memory representation of one document of the model `M`.
pub struct Entity<M: Model> {
    id: Option<ObjectId>,
    values: ValueMap,
    dirty: Vec<String>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Entity<M> {
    /// Creates an empty entity with no identifier.
    pub fn new() -> Self {
        Entity {
            id: None,
            values: ValueMap::new(),
            dirty: Vec::new(),
            _model: PhantomData,
        }
    }

    /// The native identifier, if assigned.
    pub fn id(&self) -> Option<&ObjectId> {
        self.id.as_ref()
    }

    /// The virtual string form of the identifier. Read-only.
    pub fn id_str(&self) -> Option<String> {
        self.id.map(|id| id.to_hex())
    }

    /// Assigns the identifier. Fails once one is already present; the
    /// identifier is immutable for the entity's lifetime.
    pub fn set_id(&mut self, id: ObjectId) -> ModelResult<()> {
        if self.id.is_some() {
            return Err(ModelError::UnsupportedOperation(
                "Entity identifier is immutable once assigned".to_string(),
            ));
        }
        self.id = Some(id);
        Ok(())
    }

    /// Reads a property from the bag.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Whether a property is present in the bag.
    pub fn is_set(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// Assigns a property and marks it dirty.
    ///
    /// Names outside the declared field set still succeed; they are kept in
    /// the bag but never persisted or serialized. Assignments to the
    /// identifier names are ignored: the string accessor is read-only and
    /// the identifier itself only changes through [`Entity::set_id`].
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        if field == ID_FIELD || field == ID_VIRTUAL_FIELD {
            return;
        }
        self.values.insert(field.clone(), value.into());
        self.dirty.push(field);
    }

    /// Assignment path used by the transformer; does not touch dirty state.
    pub(crate) fn load(&mut self, field: impl Into<String>, value: Value) {
        self.values.insert(field.into(), value);
    }

    /// Whether any property was mutated since load.
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Mutated field names in write order. Repeated writes to one field
    /// produce repeated entries; deduplicate where set semantics are needed.
    pub fn dirty_fields(&self) -> &[String] {
        &self.dirty
    }

    /// Forgets all recorded mutations.
    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    /// Builds a deduplicated update map from the dirty fields.
    ///
    /// First-write order is preserved; only declared fields are included.
    pub fn update_from_dirty(&self) -> ValueMap {
        let mut map = ValueMap::new();
        for field in &self.dirty {
            if map.contains_key(field) || !M::schema().contains(field, true) {
                continue;
            }
            if let Some(value) = self.values.get(field) {
                map.insert(field.clone(), value.clone());
            }
        }
        map
    }

    /// Snapshot of the declared fields as a value map, ready for insert.
    ///
    /// The identifier is excluded (the store generates it); hidden fields
    /// are included since they persist like any declared field.
    pub fn to_store_map(&self) -> ValueMap {
        let mut map = ValueMap::new();
        for name in M::schema().field_names(true) {
            if name == ID_FIELD {
                continue;
            }
            if let Some(value) = self.values.get(name) {
                map.insert(name.to_string(), value.clone());
            }
        }
        map
    }

    /// Plain-object snapshot of the default-visibility fields.
    ///
    /// The identifier renders as a string; nested values are recursively
    /// simplified. Properties outside the declared field set never appear.
    pub fn to_plain_object(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut doc = serde_json::Map::new();
        for name in M::schema().field_names(false) {
            if name == ID_FIELD {
                doc.insert(
                    name.to_string(),
                    self.id_str()
                        .map(serde_json::Value::String)
                        .unwrap_or(serde_json::Value::Null),
                );
            } else {
                let value = self
                    .values
                    .get(name)
                    .map(simplify_value)
                    .unwrap_or(serde_json::Value::Null);
                doc.insert(name.to_string(), value);
            }
        }
        doc
    }

    /// JSON string form of [`Entity::to_plain_object`].
    pub fn to_json(&self) -> ModelResult<String> {
        Ok(serde_json::to_string(&self.to_plain_object())?)
    }

    /// The entity as a nested object value (declared fields plus the
    /// identifier), used when it is assigned into another entity's field.
    pub(crate) fn to_value(&self) -> Value {
        let mut map = ValueMap::new();
        if let Some(id) = self.id {
            map.insert(ID_FIELD.to_string(), Value::Id(id));
        }
        for name in M::schema().field_names(false) {
            if name == ID_FIELD {
                continue;
            }
            if let Some(value) = self.values.get(name) {
                map.insert(name.to_string(), value.clone());
            }
        }
        Value::Object(map)
    }
}

impl<M: Model> Default for Entity<M> {
    fn default() -> Self {
        Entity::new()
    }
}

impl<M: Model> Clone for Entity<M> {
    fn clone(&self) -> Self {
        Entity {
            id: self.id,
            values: self.values.clone(),
            dirty: self.dirty.clone(),
            _model: PhantomData,
        }
    }
}

impl<M: Model> std::fmt::Debug for Entity<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("collection", &M::collection_name())
            .field("id", &self.id)
            .field("values", &self.values)
            .field("dirty", &self.dirty)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, FieldKind, Schema};

    struct Article;

    const ARTICLE_FIELDS: &[FieldDef] = &[
        FieldDef::new(ID_FIELD, FieldKind::Id),
        FieldDef::new("title", FieldKind::String).required(),
        FieldDef::new("tags", FieldKind::List),
        FieldDef::new("secret", FieldKind::String).hidden(),
    ];

    impl Model for Article {
        fn collection_name() -> &'static str {
            "articles"
        }

        fn schema() -> Schema {
            Schema::new(ARTICLE_FIELDS)
        }
    }

    #[test]
    fn identifier_coercion_round_trip() {
        let hex = "507f191e810c19729de860ea";
        let id = ensure_object_id(hex).unwrap();
        assert_eq!(id.to_hex(), hex);
        assert!(is_valid_object_id(hex));
        assert!(!is_valid_object_id("not-an-id"));
        assert!(matches!(
            ensure_object_id("not-an-id"),
            Err(ModelError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn identifier_is_immutable_once_assigned() {
        let mut entity = Entity::<Article>::new();
        let id = ObjectId::new();
        entity.set_id(id).unwrap();
        assert!(entity.set_id(ObjectId::new()).is_err());
        assert_eq!(entity.id(), Some(&id));
        assert_eq!(entity.id_str(), Some(id.to_hex()));
    }

    #[test]
    fn virtual_accessor_is_read_only() {
        let mut entity = Entity::<Article>::new();
        entity.set("id", "overwritten");
        entity.set("_id", "overwritten");
        assert!(!entity.is_set("id"));
        assert!(!entity.is_set("_id"));
        assert!(!entity.is_dirty());
    }

    #[test]
    fn repeated_writes_append_repeated_dirty_entries() {
        let mut entity = Entity::<Article>::new();
        entity.set("title", "First");
        entity.set("title", "Second");
        assert_eq!(entity.dirty_fields(), &["title", "title"]);

        let update = entity.update_from_dirty();
        assert_eq!(update.len(), 1);
        assert_eq!(update.get("title").unwrap().as_str(), Some("Second"));
    }

    #[test]
    fn undeclared_fields_stay_in_the_bag_but_never_serialize() {
        let mut entity = Entity::<Article>::new();
        entity.set("title", "Hello");
        entity.set("legacy_field", 7i64);
        assert_eq!(entity.get("legacy_field").unwrap().as_int(), Some(7));

        let doc = entity.to_plain_object();
        assert!(doc.contains_key("title"));
        assert!(!doc.contains_key("legacy_field"));
        assert!(!doc.contains_key("secret"));
    }

    #[test]
    fn plain_object_renders_id_as_string() {
        let mut entity = Entity::<Article>::new();
        let id = ObjectId::new();
        entity.set_id(id).unwrap();
        entity.set("title", "Hello");

        let doc = entity.to_plain_object();
        assert_eq!(doc.get("_id").unwrap().as_str().unwrap(), id.to_hex());
        assert_eq!(doc.get("title").unwrap().as_str().unwrap(), "Hello");
        // Declared but unset fields are emitted as null.
        assert!(doc.get("tags").unwrap().is_null());
    }

    #[test]
    fn store_map_excludes_identifier_and_undeclared_fields() {
        let mut entity = Entity::<Article>::new();
        entity.set_id(ObjectId::new()).unwrap();
        entity.set("title", "Hello");
        entity.set("secret", "admin-only");
        entity.set("legacy_field", true);

        let map = entity.to_store_map();
        assert!(map.contains_key("title"));
        assert!(map.contains_key("secret"));
        assert!(!map.contains_key(ID_FIELD));
        assert!(!map.contains_key("legacy_field"));
    }
}
