//! In-memory value representation for entity properties.
//!
//! The store keeps schemaless BSON documents; entities keep [`Value`] trees.
//! The transformer ([`crate::transform`]) converts between the two. Keeping a
//! separate in-process representation is what lets dates surface as
//! [`chrono::DateTime`] values, arrays as ordered sequences, and rich value
//! types round-trip through their store shape.

use std::fmt;
use std::sync::Arc;

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;

/// Ordered-insertion mapping of property names to values.
pub type ValueMap = IndexMap<String, Value>;

/// Capability for value types that know their own storage representation.
///
/// Implementors return a plain mapping or list (never another
/// [`Value::Custom`]) suitable for handing to the store. Both the write path
/// and the serialization path detect this capability and invoke it
/// automatically.
pub trait StoreShape: Send + Sync + fmt::Debug {
    /// Returns the plain store representation of this value.
    fn to_store_shape(&self) -> Value;
}

/// A rich value wrapped for storage in a property bag.
#[derive(Clone, Debug)]
pub struct CustomValue(Arc<dyn StoreShape>);

impl CustomValue {
    /// Wraps a value implementing [`StoreShape`].
    pub fn new(value: impl StoreShape + 'static) -> Self {
        CustomValue(Arc::new(value))
    }

    /// Returns the plain store representation of the wrapped value.
    pub fn to_store_shape(&self) -> Value {
        self.0.to_store_shape()
    }
}

impl PartialEq for CustomValue {
    fn eq(&self, other: &Self) -> bool {
        // Equality is structural over the store shape.
        self.to_store_shape() == other.to_store_shape()
    }
}

/// A single property value of an entity.
///
/// Heterogeneous by design: scalar, identifier, date, ordered list,
/// ordered-insertion mapping, or a rich value carrying its own store shape.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    /// Absent or null value.
    #[default]
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar (32-bit store integers widen to 64-bit).
    Int(i64),
    /// Floating-point scalar.
    Float(f64),
    /// String scalar.
    String(String),
    /// Native store identifier.
    Id(ObjectId),
    /// In-process date/time. Converted to the native timestamp type on write.
    Date(DateTime<Utc>),
    /// Ordered sequence container.
    List(Vec<Value>),
    /// Nested object with insertion-ordered keys.
    Object(ValueMap),
    /// Rich value type implementing [`StoreShape`].
    Custom(CustomValue),
}

impl Value {
    /// Wraps a [`StoreShape`] value.
    pub fn custom(value: impl StoreShape + 'static) -> Self {
        Value::Custom(CustomValue::new(value))
    }

    /// True for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            Value::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_id(&self) -> Option<&ObjectId> {
        match self {
            Value::Id(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Date(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ValueMap> {
        match self {
            Value::Object(value) => Some(value),
            _ => None,
        }
    }
}

/// Turn a unix timestamp (seconds) into the in-process date representation.
pub fn time_to_date(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<ObjectId> for Value {
    fn from(value: ObjectId) -> Self {
        Value::Id(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Date(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::List(value.into_iter().map(Into::into).collect())
    }
}

impl From<ValueMap> for Value {
    fn from(value: ValueMap) -> Self {
        Value::Object(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Locale {
        en: String,
        fr: String,
    }

    impl StoreShape for Locale {
        fn to_store_shape(&self) -> Value {
            let mut map = ValueMap::new();
            map.insert("en".to_string(), self.en.as_str().into());
            map.insert("fr".to_string(), self.fr.as_str().into());
            Value::Object(map)
        }
    }

    #[test]
    fn scalar_conversions() {
        assert_eq!(Value::from(42i64).as_int(), Some(42));
        assert_eq!(Value::from("hello").as_str(), Some("hello"));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from(1.5f64).as_float(), Some(1.5));
        assert!(Value::from(None::<i64>).is_null());
    }

    #[test]
    fn list_conversion_preserves_order() {
        let value = Value::from(vec!["a", "b", "c"]);
        let items = value.as_list().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_str(), Some("a"));
        assert_eq!(items[2].as_str(), Some("c"));
    }

    #[test]
    fn custom_values_compare_by_store_shape() {
        let a = Value::custom(Locale { en: "Hello".into(), fr: "Bonjour".into() });
        let b = Value::custom(Locale { en: "Hello".into(), fr: "Bonjour".into() });
        let c = Value::custom(Locale { en: "Hi".into(), fr: "Salut".into() });
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn timestamp_to_date() {
        let date = time_to_date(0).unwrap();
        assert_eq!(date.timestamp(), 0);
        assert!(time_to_date(i64::MAX).is_none());
    }
}
