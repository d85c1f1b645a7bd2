//! Shared fixtures for the end-to-end tests: a memory-backed database and a
//! pair of related models.

use std::sync::Arc;

use modellayer::memory::MemoryStoreClient;
use modellayer::prelude::*;

pub struct User;

const USER_FIELDS: &[FieldDef] = &[
    FieldDef::new(ID_FIELD, FieldKind::Id),
    FieldDef::new("name", FieldKind::String).required(),
    FieldDef::new("email", FieldKind::String),
];

impl Model for User {
    fn collection_name() -> &'static str {
        "users"
    }

    fn schema() -> Schema {
        Schema::new(USER_FIELDS)
    }

    fn permission_group() -> &'static str {
        "users"
    }
}

pub struct Article;

const ARTICLE_FIELDS: &[FieldDef] = &[
    FieldDef::new(ID_FIELD, FieldKind::Id),
    FieldDef::new("title", FieldKind::String).required(),
    FieldDef::new("handle", FieldKind::String),
    FieldDef::new("owner_id", FieldKind::Id),
    FieldDef::new("owner", FieldKind::Object),
    FieldDef::new("published_at", FieldKind::Date),
    FieldDef::new("tags", FieldKind::List),
    FieldDef::new("meta", FieldKind::Object),
    FieldDef::new("review_state", FieldKind::String).hidden(),
];

impl Model for Article {
    fn collection_name() -> &'static str {
        "articles"
    }

    fn schema() -> Schema {
        Schema::new(ARTICLE_FIELDS)
    }

    fn process_on_store(field: &str, value: Value) -> ModelResult<Value> {
        if field == "handle" {
            if matches!(&value, Value::String(handle) if handle.is_empty()) {
                return Err(ModelError::Validation {
                    field: "handle".to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
        }
        Ok(value)
    }
}

/// A fresh memory-backed database plus the raw client for call counting.
pub fn database() -> (Database, MemoryStoreClient) {
    let client = MemoryStoreClient::new();
    let database = Database::new(Arc::new(client.clone()), "cms_test");
    (database, client)
}
