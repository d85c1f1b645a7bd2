//! Convenient re-exports of commonly used types from modellayer.
//!
//! ```ignore
//! use modellayer::prelude::*;
//! ```

pub use modellayer_core::{
    client::{CollationSpec, IndexSpec, ReadOptions, StoreClient, StoreCollection},
    database::{AccessContext, AccessControl, Database, Permission},
    entity::{Entity, IntoObjectId, ensure_object_id, is_valid_object_id},
    error::{ModelError, ModelResult},
    migrate::{Migration, MigrationRef, MigrationRunner, Migrations, SchemaExecutor},
    model::{Model, Repository, sanitize_filter_value},
    options::{DEFAULT_LIMIT, QueryOptions},
    page::{Page, PaginationParams},
    query::{DistinctQuery, ManyQuery, SingleQuery},
    schema::{FieldDef, FieldKind, ID_FIELD, ID_VIRTUAL_FIELD, Schema},
    transform::{prepare_for_write, simplify_value, transform_doc_to_entity, value_to_bson},
    update::UpdateSpec,
    value::{CustomValue, StoreShape, Value, ValueMap, time_to_date},
};
