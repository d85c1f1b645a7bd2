//! Store client abstraction consumed by the model layer.
//!
//! The document store itself is an external collaborator; this module only
//! defines the interface the rest of the crate talks to. Implementations
//! live in their own crates (in-memory, MongoDB) and must be thread-safe —
//! a single client handle is shared across every repository in the process.
//!
//! # Error Handling
//!
//! Implementations wrap every underlying driver failure into
//! [`ModelError::StoreOperationFailed`](crate::error::ModelError) carrying
//! the original message. No retries happen at this layer; a failed call
//! surfaces immediately.

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use std::fmt::Debug;

use crate::error::ModelResult;

/// Options assembled by the query layer for a single read call.
///
/// `skip` and `limit` are `None` when they should be omitted from the store
/// call entirely, letting the store apply its own defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadOptions {
    /// Ordered field → direction pairs.
    pub sort: Option<Document>,
    /// Field inclusion/exclusion mapping.
    pub projection: Option<Document>,
    /// Documents to skip, when staged above zero.
    pub skip: Option<u64>,
    /// Result ceiling, when staged above zero.
    pub limit: Option<i64>,
    /// Collation applied to matching and sorting.
    pub collation: Option<CollationSpec>,
}

/// Collation handed to the store alongside a read call.
#[derive(Debug, Clone, PartialEq)]
pub struct CollationSpec {
    /// ICU locale code.
    pub locale: String,
    /// Comparison strength level.
    pub strength: u8,
}

/// Declaration of one index on a collection.
#[derive(Debug, Clone)]
pub struct IndexSpec {
    /// Indexed keys with direction (1 ascending, -1 descending).
    pub keys: Document,
    /// Explicit index name; the store derives one when absent.
    pub name: Option<String>,
    /// Enforce uniqueness across the collection.
    pub unique: bool,
}

impl IndexSpec {
    /// A non-unique, auto-named index on the given keys.
    pub fn new(keys: Document) -> Self {
        IndexSpec { keys, name: None, unique: false }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Connection-level interface to a document store.
///
/// The connection is established lazily by the underlying driver and torn
/// down only by an explicit [`disconnect`](StoreClient::disconnect) call.
#[async_trait]
pub trait StoreClient: Send + Sync + Debug {
    /// Returns a handle on a collection within a named database.
    fn select_collection(&self, database: &str, collection: &str) -> Box<dyn StoreCollection>;

    /// Closes the underlying connection, releasing driver resources.
    async fn disconnect(&self) -> ModelResult<()>;
}

/// Raw operations on one collection of the document store.
///
/// Filters and update documents are store-native nested mappings. Filter
/// documents support equality plus the fixed operator set `$eq`, `$ne`,
/// `$gt`, `$gte`, `$lt`, `$lte`, `$in`, `$nin`, `$exists`, `$and`, `$or`.
#[async_trait]
pub trait StoreCollection: Send + Sync + Debug {
    /// Name of this collection.
    fn name(&self) -> &str;

    /// Fetches the first document matching `filter`, or `None`.
    async fn find_one(
        &self,
        filter: Document,
        options: ReadOptions,
    ) -> ModelResult<Option<Document>>;

    /// Fetches every document matching `filter`, honoring `options`.
    async fn find(&self, filter: Document, options: ReadOptions) -> ModelResult<Vec<Document>>;

    /// Returns the distinct values of `field` across documents matching
    /// `filter`.
    async fn distinct(
        &self,
        field: &str,
        filter: Document,
        options: ReadOptions,
    ) -> ModelResult<Vec<Bson>>;

    /// Runs a store-native aggregation pipeline.
    async fn aggregate(&self, pipeline: Vec<Document>) -> ModelResult<Vec<Document>>;

    /// Inserts one document, returning the generated identifier.
    async fn insert_one(&self, document: Document) -> ModelResult<ObjectId>;

    /// Inserts several documents, returning the generated identifiers in
    /// insertion order.
    async fn insert_many(&self, documents: Vec<Document>) -> ModelResult<Vec<ObjectId>>;

    /// Applies an update spec to the first matching document; returns the
    /// modified count.
    async fn update_one(&self, filter: Document, update: Document) -> ModelResult<u64>;

    /// Applies an update spec to every matching document; returns the
    /// modified count.
    async fn update_many(&self, filter: Document, update: Document) -> ModelResult<u64>;

    /// Deletes the first matching document; returns the deleted count.
    async fn delete_one(&self, filter: Document) -> ModelResult<u64>;

    /// Deletes every matching document; returns the deleted count.
    async fn delete_many(&self, filter: Document) -> ModelResult<u64>;

    /// Counts documents matching `filter`.
    async fn count_documents(&self, filter: Document) -> ModelResult<u64>;

    /// Creates the given indexes.
    async fn create_indexes(&self, indexes: Vec<IndexSpec>) -> ModelResult<()>;

    /// Drops the named indexes.
    async fn drop_indexes(&self, names: Vec<String>) -> ModelResult<()>;
}
