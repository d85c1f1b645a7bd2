//! Bidirectional mapping between store documents and entities.
//!
//! The store is schemaless: raw documents may carry legacy or foreign
//! fields, and typed values (dates, identifiers, rich value objects) only
//! round-trip correctly when both directions apply the same recursive
//! coercion rules. The read path builds an [`Entity`] from a raw document,
//! filtering through the declared allow-list; the write path turns a value
//! map into a store document, routing every field through the model's store
//! hook.
//!
//! Undeclared document keys are dropped silently on read, not rejected;
//! callers that need to detect schema drift must diff against the raw
//! document themselves.

use bson::{Bson, Document};

use crate::entity::{Entity, ensure_object_id};
use crate::error::ModelResult;
use crate::model::Model;
use crate::schema::ID_FIELD;
use crate::value::{Value, ValueMap};

/// Builds a typed entity from a raw store document.
///
/// Keys outside the allow-list for the requested visibility tier are
/// skipped. The identifier is assigned from either its native form or a
/// string form; every other value is coerced and passed through the model's
/// fetch hook, then loaded without touching dirty state.
pub fn transform_doc_to_entity<M: Model>(
    doc: &Document,
    fetch_all_fields: bool,
) -> ModelResult<Entity<M>> {
    let mut entity = Entity::<M>::new();
    let schema = M::schema();

    for (key, raw) in doc {
        if !schema.contains(key, fetch_all_fields) {
            continue;
        }

        if key.as_str() == ID_FIELD {
            match raw {
                Bson::ObjectId(id) => entity.set_id(*id)?,
                Bson::String(id) => entity.set_id(ensure_object_id(id.as_str())?)?,
                _ => {}
            }
            continue;
        }

        let value = match raw {
            Bson::ObjectId(id) => M::process_on_fetch(key, Value::Id(*id)),
            Bson::Array(items) => {
                let list = Value::List(items.iter().map(bson_to_value).collect());
                M::process_on_fetch(key, list)
            }
            Bson::DateTime(date) => M::process_on_fetch(key, Value::Date(date.to_chrono())),
            Bson::Document(nested) => M::process_on_fetch(key, parse_nested::<M>(nested)),
            scalar => M::process_on_fetch(key, bson_to_value(scalar)),
        };

        entity.load(key.clone(), value);
    }

    Ok(entity)
}

/// Walks a nested document with the same coercion rules as the top level,
/// minus the allow-list (nested objects carry no field declaration of their
/// own). Fetch hooks run per nested key.
fn parse_nested<M: Model>(doc: &Document) -> Value {
    let mut out = ValueMap::new();

    for (key, raw) in doc {
        let value = match raw {
            Bson::ObjectId(id) => M::process_on_fetch(key, Value::Id(*id)),
            Bson::Array(items) => M::process_on_fetch(
                key,
                Value::List(items.iter().map(bson_to_value).collect()),
            ),
            Bson::DateTime(date) => M::process_on_fetch(key, Value::Date(date.to_chrono())),
            Bson::Document(nested) => M::process_on_fetch(key, parse_nested::<M>(nested)),
            scalar => M::process_on_fetch(key, bson_to_value(scalar)),
        };
        out.insert(key.clone(), value);
    }

    Value::Object(out)
}

/// Hook-free structural conversion from a store value.
fn bson_to_value(raw: &Bson) -> Value {
    match raw {
        Bson::Null => Value::Null,
        Bson::Boolean(value) => Value::Bool(*value),
        Bson::Int32(value) => Value::Int(*value as i64),
        Bson::Int64(value) => Value::Int(*value),
        Bson::Double(value) => Value::Float(*value),
        Bson::String(value) => Value::String(value.clone()),
        Bson::ObjectId(id) => Value::Id(*id),
        Bson::DateTime(date) => Value::Date(date.to_chrono()),
        Bson::Array(items) => Value::List(items.iter().map(bson_to_value).collect()),
        Bson::Document(doc) => {
            let mut out = ValueMap::new();
            for (key, value) in doc {
                out.insert(key.clone(), bson_to_value(value));
            }
            Value::Object(out)
        }
        _ => Value::Null,
    }
}

/// Prepares a value map for writing to the store.
///
/// Dates become native timestamps, nested maps recurse into the same
/// procedure, and rich value types are replaced by their store shape. The
/// ordered sequence container is unwrapped to its plain list without running
/// the store hook; every other entry passes through the model's store hook,
/// which may reject the write with a validation error.
pub fn prepare_for_write<M: Model>(map: &ValueMap) -> ModelResult<Document> {
    let mut doc = Document::new();
    for (key, value) in map {
        doc.insert(key.clone(), prepare_value::<M>(key, value)?);
    }
    Ok(doc)
}

fn prepare_value<M: Model>(field: &str, value: &Value) -> ModelResult<Bson> {
    match value {
        // Container unwrap: a language-level convenience, not domain data,
        // so the store hook is bypassed.
        Value::List(items) => Ok(Bson::Array(items.iter().map(value_to_bson).collect())),
        Value::Custom(custom) => Ok(value_to_bson(&custom.to_store_shape())),
        other => {
            let hooked = M::process_on_store(field, other.clone())?;
            match hooked {
                Value::Object(map) => Ok(Bson::Document(prepare_for_write::<M>(&map)?)),
                Value::Date(date) => Ok(Bson::DateTime(bson::DateTime::from_chrono(date))),
                Value::List(items) => {
                    Ok(Bson::Array(items.iter().map(value_to_bson).collect()))
                }
                Value::Custom(custom) => Ok(value_to_bson(&custom.to_store_shape())),
                scalar => Ok(value_to_bson(&scalar)),
            }
        }
    }
}

/// Hook-free structural conversion to a store value.
pub fn value_to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(v) => Bson::Boolean(*v),
        Value::Int(v) => Bson::Int64(*v),
        Value::Float(v) => Bson::Double(*v),
        Value::String(v) => Bson::String(v.clone()),
        Value::Id(id) => Bson::ObjectId(*id),
        Value::Date(date) => Bson::DateTime(bson::DateTime::from_chrono(*date)),
        Value::List(items) => Bson::Array(items.iter().map(value_to_bson).collect()),
        Value::Object(map) => {
            let mut doc = Document::new();
            for (key, value) in map {
                doc.insert(key.clone(), value_to_bson(value));
            }
            Bson::Document(doc)
        }
        Value::Custom(custom) => value_to_bson(&custom.to_store_shape()),
    }
}

/// Simplifies a value into a JSON-encodable form: identifiers become
/// strings, dates render as RFC 3339, rich value types convert through
/// their store shape, containers recurse.
pub fn simplify_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(v) => serde_json::Value::Bool(*v),
        Value::Int(v) => serde_json::Value::Number((*v).into()),
        Value::Float(v) => serde_json::Number::from_f64(*v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(v) => serde_json::Value::String(v.clone()),
        Value::Id(id) => serde_json::Value::String(id.to_hex()),
        Value::Date(date) => serde_json::Value::String(date.to_rfc3339()),
        Value::List(items) => {
            serde_json::Value::Array(items.iter().map(simplify_value).collect())
        }
        Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), simplify_value(value)))
                .collect(),
        ),
        Value::Custom(custom) => simplify_value(&custom.to_store_shape()),
    }
}
