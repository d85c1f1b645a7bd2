//! The model extension contract and the repository bound to one collection.
//!
//! A [`Model`] describes one collection: its name, its field declarations,
//! and optional per-field hooks that run on fetch and on store. A
//! [`Repository`] binds a model to a live collection handle and exposes the
//! finder methods (lazy, returning consumable builders) and the immediate
//! mutation operations.

use std::marker::PhantomData;
use std::sync::Arc;

use bson::{Bson, Document, doc, oid::ObjectId};

use crate::client::{IndexSpec, StoreCollection};
use crate::database::{Database, Permission};
use crate::entity::{Entity, IntoObjectId, ensure_object_id};
use crate::error::{ModelError, ModelResult};
use crate::options::QueryOptions;
use crate::query::{CursorState, DistinctQuery, ManyQuery, SingleQuery};
use crate::schema::{ID_FIELD, Schema};
use crate::transform::{prepare_for_write, transform_doc_to_entity};
use crate::update::UpdateSpec;
use crate::value::{Value, ValueMap};

/// Per-collection extension contract.
///
/// Every concrete model declares its collection name and field schema. The
/// hooks default to identity and may be overridden to enforce field-level
/// invariants on store (rejecting a write with a validation error) or to
/// build richer values on fetch.
pub trait Model: Send + Sync + Sized + 'static {
    /// Collection this model maps to.
    fn collection_name() -> &'static str;

    /// Static field declarations; must include the identifier field.
    fn schema() -> Schema;

    /// Permission group consulted by the permission gate.
    fn permission_group() -> &'static str {
        ""
    }

    /// Applied to each field as it is read from the store.
    fn process_on_fetch(_field: &str, value: Value) -> Value {
        value
    }

    /// Applied to each field as it is written to the store. Override to
    /// validate; returning an error aborts the write before any store call.
    fn process_on_store(_field: &str, value: Value) -> ModelResult<Value> {
        Ok(value)
    }
}

/// Strips `$` characters from the keys of a user-supplied value so it is
/// safe to embed in a filter. Scalars pass through untouched.
pub fn sanitize_filter_value(value: Bson) -> Bson {
    match value {
        Bson::Document(map) => Bson::Document(
            map.into_iter()
                .map(|(key, value)| (key.replace('$', ""), sanitize_filter_value(value)))
                .collect(),
        ),
        Bson::Array(items) => {
            Bson::Array(items.into_iter().map(sanitize_filter_value).collect())
        }
        scalar => scalar,
    }
}

/// A model bound to a live collection of a database.
///
/// Cheap to construct; every instance shares the process-wide store
/// connection through its [`Database`] handle. Finder methods return
/// short-lived builders consumed by their `exec` call, so repositories can
/// be shared across tasks without any cursor state to corrupt.
pub struct Repository<M: Model> {
    database: Database,
    collection: Arc<dyn StoreCollection>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Repository<M> {
    /// Binds the model to its declared collection.
    pub fn new(database: &Database) -> Self {
        Self::with_collection(database, M::collection_name())
    }

    /// Binds the model to an explicitly named collection.
    pub fn with_collection(database: &Database, collection: &str) -> Self {
        debug_assert!(
            M::schema().declares_id(),
            "schema for '{}' must declare the identifier field",
            M::collection_name()
        );
        Repository {
            database: database.clone(),
            collection: Arc::from(database.collection(collection)),
            _model: PhantomData,
        }
    }

    pub(crate) fn database(&self) -> &Database {
        &self.database
    }

    pub(crate) fn collection(&self) -> &dyn StoreCollection {
        self.collection.as_ref()
    }

    /// Name of the bound collection.
    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }

    /// Stages a single-result fetch by identifier.
    ///
    /// The identifier is coerced up front: an invalid string form fails here
    /// with [`ModelError::InvalidIdentifier`], before any store call. Only
    /// the projection is taken from `options`; any staged sort is cleared.
    pub fn find_by_id(
        &self,
        id: impl IntoObjectId,
        options: Option<QueryOptions>,
    ) -> ModelResult<SingleQuery<'_, M>> {
        let id = ensure_object_id(id)?;
        let options = options.unwrap_or_else(|| QueryOptions::init(None, 0, 1, None));

        Ok(SingleQuery::new(
            self,
            CursorState {
                filter: doc! { ID_FIELD: id },
                sort: None,
                projection: options.projection,
                skip: 0,
                limit: 1,
                collation: None,
                fetch_all_fields: false,
            },
        ))
    }

    /// Stages a single-result fetch matching `filter`.
    pub fn find_one(&self, filter: Document, options: Option<QueryOptions>) -> SingleQuery<'_, M> {
        let options = options.unwrap_or_default();
        SingleQuery::new(
            self,
            CursorState {
                filter,
                sort: options.sort,
                projection: options.projection,
                skip: 0,
                limit: 1,
                collation: options.collation,
                fetch_all_fields: false,
            },
        )
    }

    /// Stages a multi-result fetch matching `filter`.
    pub fn find(&self, filter: Document, options: Option<QueryOptions>) -> ManyQuery<'_, M> {
        let options = options.unwrap_or_default();
        ManyQuery::new(
            self,
            CursorState {
                filter,
                sort: options.sort,
                projection: options.projection,
                skip: options.skip,
                limit: options.limit,
                collation: options.collation,
                fetch_all_fields: false,
            },
        )
    }

    /// Stages a distinct-values fetch for `field` over documents matching
    /// `filter`. Results are raw values, not entities.
    pub fn distinct(
        &self,
        field: &str,
        filter: Document,
        options: Option<QueryOptions>,
    ) -> DistinctQuery<'_, M> {
        let options = options.unwrap_or_default();
        DistinctQuery::new(
            self,
            field.to_string(),
            CursorState {
                filter,
                sort: options.sort,
                projection: options.projection,
                skip: 0,
                limit: 1,
                collation: options.collation,
                fetch_all_fields: false,
            },
        )
    }

    /// Runs a store-native aggregation pipeline immediately and returns the
    /// transformed entities.
    ///
    /// Unlike the finders this does not stage: aggregation results are
    /// heterogeneous shapes that cannot reliably be re-fetched through the
    /// staged-cursor contract.
    pub async fn aggregate(&self, pipeline: Vec<Document>) -> ModelResult<Vec<Entity<M>>> {
        let results = self.collection.aggregate(pipeline).await?;
        results
            .iter()
            .map(|doc| transform_doc_to_entity::<M>(doc, false))
            .collect()
    }

    /// Inserts a record and returns its generated identifier.
    ///
    /// The map is filtered to the declared field set, required fields are
    /// checked, and values run through write preparation (store hooks, date
    /// conversion) before the store call.
    pub async fn insert(&self, doc: ValueMap) -> ModelResult<ObjectId> {
        let prepared = self.prepare_insert(doc)?;
        self.collection.insert_one(prepared).await
    }

    /// Inserts an entity's declared fields as a new record.
    pub async fn insert_entity(&self, entity: &Entity<M>) -> ModelResult<ObjectId> {
        self.insert(entity.to_store_map()).await
    }

    /// Inserts several records and returns their generated identifiers.
    pub async fn insert_many(&self, docs: Vec<ValueMap>) -> ModelResult<Vec<ObjectId>> {
        let prepared = docs
            .into_iter()
            .map(|doc| self.prepare_insert(doc))
            .collect::<ModelResult<Vec<Document>>>()?;
        self.collection.insert_many(prepared).await
    }

    pub(crate) fn prepare_insert(&self, doc: ValueMap) -> ModelResult<Document> {
        let schema = M::schema();
        let filtered: ValueMap = doc
            .into_iter()
            .filter(|(key, _)| key.as_str() != ID_FIELD && schema.contains(key, true))
            .collect();

        for field in schema.required_fields() {
            if field.name == ID_FIELD {
                continue;
            }
            match filtered.get(field.name) {
                None | Some(Value::Null) => {
                    return Err(ModelError::validation(field.name, "required field is missing"));
                }
                Some(_) => {}
            }
        }

        prepare_for_write::<M>(&filtered)
    }

    /// Updates the first record matching `filter`; returns the modified
    /// count.
    pub async fn update_one(&self, filter: Document, update: UpdateSpec) -> ModelResult<u64> {
        let update = update.into_document::<M>()?;
        self.collection.update_one(filter, update).await
    }

    /// Updates every record matching `filter`; returns the modified count.
    pub async fn update_many(&self, filter: Document, update: UpdateSpec) -> ModelResult<u64> {
        let update = update.into_document::<M>()?;
        self.collection.update_many(filter, update).await
    }

    /// Deletes the first record matching `filter`; returns the deleted
    /// count.
    pub async fn delete_one(&self, filter: Document) -> ModelResult<u64> {
        self.collection.delete_one(filter).await
    }

    /// Deletes every record matching `filter`; returns the deleted count.
    pub async fn delete_many(&self, filter: Document) -> ModelResult<u64> {
        self.collection.delete_many(filter).await
    }

    /// Deletes a record by its identifier; returns the deleted count.
    pub async fn delete_by_id(&self, id: impl IntoObjectId) -> ModelResult<u64> {
        let id = ensure_object_id(id)?;
        self.collection.delete_one(doc! { ID_FIELD: id }).await
    }

    /// Counts records matching `filter`.
    pub async fn count(&self, filter: Document) -> ModelResult<u64> {
        self.collection.count_documents(filter).await
    }

    /// Creates an index.
    pub async fn add_index(&self, index: IndexSpec) -> ModelResult<()> {
        self.collection.create_indexes(vec![index]).await
    }

    /// Creates several indexes.
    pub async fn add_indexes(&self, indexes: Vec<IndexSpec>) -> ModelResult<()> {
        self.collection.create_indexes(indexes).await
    }

    /// Drops an index by name.
    pub async fn drop_index(&self, name: impl Into<String>) -> ModelResult<()> {
        self.collection.drop_indexes(vec![name.into()]).await
    }

    /// Drops several indexes by name.
    pub async fn drop_indexes(&self, names: Vec<String>) -> ModelResult<()> {
        self.collection.drop_indexes(names).await
    }

    /// Permission gate for this model's permission group.
    ///
    /// A no-op in non-interactive execution; otherwise requires an
    /// authenticated actor holding the requested level, failing with
    /// [`ModelError::PermissionDenied`].
    pub fn require_permission(&self, permission: Permission) -> ModelResult<()> {
        self.database.access().check(M::permission_group(), permission)
    }
}

impl<M: Model> Clone for Repository<M> {
    fn clone(&self) -> Self {
        Repository {
            database: self.database.clone(),
            collection: Arc::clone(&self.collection),
            _model: PhantomData,
        }
    }
}

impl<M: Model> std::fmt::Debug for Repository<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("collection", &self.collection.name())
            .finish()
    }
}
