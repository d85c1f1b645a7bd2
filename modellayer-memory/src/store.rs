//! In-memory store client for development and tests.
//!
//! Documents live in insertion-ordered vectors behind async-aware
//! read/write locks. Queries scan the whole collection; fine for the small
//! datasets this backend is meant for. Indexes are accepted and ignored, and
//! collation locales are not interpreted.
//!
//! Every collection call bumps a shared operation counter, so tests can
//! assert how many store round trips a higher-level operation performed.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use mea::rwlock::RwLock;

use modellayer_core::client::{IndexSpec, ReadOptions, StoreClient, StoreCollection};
use modellayer_core::error::{ModelError, ModelResult};

use crate::evaluator::{FilterEvaluator, project_document, sort_documents};

type CollectionVec = Vec<Document>;
type StoreMap = HashMap<String, CollectionVec>;

/// Thread-safe in-memory document store.
///
/// Cloning shares the underlying state; clones see each other's writes.
#[derive(Default, Clone, Debug)]
pub struct MemoryStoreClient {
    store: Arc<RwLock<StoreMap>>,
    operations: Arc<AtomicU64>,
}

impl MemoryStoreClient {
    /// Creates a new empty store.
    pub fn new() -> Self {
        MemoryStoreClient::default()
    }

    /// Number of collection operations performed so far.
    pub fn operation_count(&self) -> u64 {
        self.operations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreClient for MemoryStoreClient {
    fn select_collection(&self, database: &str, collection: &str) -> Box<dyn StoreCollection> {
        Box::new(MemoryCollection {
            key: format!("{database}.{collection}"),
            name: collection.to_string(),
            store: Arc::clone(&self.store),
            operations: Arc::clone(&self.operations),
        })
    }

    async fn disconnect(&self) -> ModelResult<()> {
        Ok(())
    }
}

#[derive(Debug)]
struct MemoryCollection {
    key: String,
    name: String,
    store: Arc<RwLock<StoreMap>>,
    operations: Arc<AtomicU64>,
}

impl MemoryCollection {
    fn record_operation(&self) {
        self.operations.fetch_add(1, Ordering::SeqCst);
    }

    async fn matching(&self, filter: &Document) -> ModelResult<Vec<Document>> {
        let store = self.store.read().await;
        let Some(collection) = store.get(&self.key) else {
            return Ok(Vec::new());
        };

        let mut matched = Vec::new();
        for doc in collection {
            if FilterEvaluator::matches(filter, doc)? {
                matched.push(doc.clone());
            }
        }
        Ok(matched)
    }

    fn apply_update(doc: &mut Document, update: &Document) -> ModelResult<()> {
        for (operator, spec) in update {
            let Bson::Document(spec) = spec else {
                return Err(ModelError::StoreOperationFailed(format!(
                    "Update operator {operator} requires a document operand"
                )));
            };

            for (field, value) in spec {
                match operator.as_str() {
                    "$set" => {
                        doc.insert(field.clone(), value.clone());
                    }
                    "$unset" => {
                        doc.remove(field);
                    }
                    "$rename" => {
                        if let Some(current) = doc.remove(field) {
                            let Bson::String(new_name) = value else {
                                return Err(ModelError::StoreOperationFailed(
                                    "$rename requires string targets".to_string(),
                                ));
                            };
                            doc.insert(new_name.clone(), current);
                        }
                    }
                    "$push" => match doc.get_array_mut(field) {
                        Ok(items) => items.push(value.clone()),
                        Err(_) => {
                            doc.insert(field.clone(), Bson::Array(vec![value.clone()]));
                        }
                    },
                    "$addToSet" => match doc.get_array_mut(field) {
                        Ok(items) => {
                            if !items.contains(value) {
                                items.push(value.clone());
                            }
                        }
                        Err(_) => {
                            doc.insert(field.clone(), Bson::Array(vec![value.clone()]));
                        }
                    },
                    "$pull" => {
                        if let Ok(items) = doc.get_array_mut(field) {
                            items.retain(|item| item != value);
                        }
                    }
                    "$pop" => {
                        if let Ok(items) = doc.get_array_mut(field) {
                            let first = matches!(value.as_i32(), Some(v) if v < 0)
                                || matches!(value.as_i64(), Some(v) if v < 0);
                            if !items.is_empty() {
                                if first {
                                    items.remove(0);
                                } else {
                                    items.pop();
                                }
                            }
                        }
                    }
                    other => {
                        return Err(ModelError::StoreOperationFailed(format!(
                            "Unsupported update operator: {other}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StoreCollection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find_one(
        &self,
        filter: Document,
        options: ReadOptions,
    ) -> ModelResult<Option<Document>> {
        self.record_operation();
        let mut matched = self.matching(&filter).await?;

        if let Some(sort) = &options.sort {
            sort_documents(&mut matched, sort);
        }

        Ok(matched.into_iter().next().map(|doc| match &options.projection {
            Some(projection) => project_document(&doc, projection),
            None => doc,
        }))
    }

    async fn find(&self, filter: Document, options: ReadOptions) -> ModelResult<Vec<Document>> {
        self.record_operation();
        let mut matched = self.matching(&filter).await?;

        if let Some(sort) = &options.sort {
            sort_documents(&mut matched, sort);
        }

        let skip = options.skip.unwrap_or(0) as usize;
        let limit = options.limit.map(|limit| limit as usize).unwrap_or(usize::MAX);

        Ok(matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|doc| match &options.projection {
                Some(projection) => project_document(&doc, projection),
                None => doc,
            })
            .collect())
    }

    async fn distinct(
        &self,
        field: &str,
        filter: Document,
        _options: ReadOptions,
    ) -> ModelResult<Vec<Bson>> {
        self.record_operation();
        let matched = self.matching(&filter).await?;

        let mut values: Vec<Bson> = Vec::new();
        for doc in &matched {
            match doc.get(field) {
                // Array fields contribute each element.
                Some(Bson::Array(items)) => {
                    for item in items {
                        if !values.contains(item) {
                            values.push(item.clone());
                        }
                    }
                }
                Some(value) => {
                    if !values.contains(value) {
                        values.push(value.clone());
                    }
                }
                None => {}
            }
        }
        Ok(values)
    }

    async fn aggregate(&self, pipeline: Vec<Document>) -> ModelResult<Vec<Document>> {
        self.record_operation();

        let store = self.store.read().await;
        let mut docs: Vec<Document> = store.get(&self.key).cloned().unwrap_or_default();
        drop(store);

        for stage in &pipeline {
            let Some((operator, spec)) = stage.iter().next() else {
                continue;
            };
            match operator.as_str() {
                "$match" => {
                    let Bson::Document(filter) = spec else {
                        return Err(ModelError::StoreOperationFailed(
                            "$match requires a filter document".to_string(),
                        ));
                    };
                    let mut kept = Vec::new();
                    for doc in docs {
                        if FilterEvaluator::matches(filter, &doc)? {
                            kept.push(doc);
                        }
                    }
                    docs = kept;
                }
                "$sort" => {
                    let Bson::Document(sort) = spec else {
                        return Err(ModelError::StoreOperationFailed(
                            "$sort requires a sort document".to_string(),
                        ));
                    };
                    sort_documents(&mut docs, sort);
                }
                "$skip" => {
                    let skip = spec.as_i64().or(spec.as_i32().map(i64::from)).unwrap_or(0);
                    docs = docs.into_iter().skip(skip.max(0) as usize).collect();
                }
                "$limit" => {
                    let limit = spec.as_i64().or(spec.as_i32().map(i64::from)).unwrap_or(0);
                    docs = docs.into_iter().take(limit.max(0) as usize).collect();
                }
                other => {
                    return Err(ModelError::StoreOperationFailed(format!(
                        "Unsupported aggregation stage: {other}"
                    )));
                }
            }
        }

        Ok(docs)
    }

    async fn insert_one(&self, mut document: Document) -> ModelResult<ObjectId> {
        self.record_operation();

        let id = match document.get_object_id("_id") {
            Ok(id) => id,
            Err(_) => {
                let id = ObjectId::new();
                document.insert("_id", id);
                id
            }
        };

        let mut store = self.store.write().await;
        let collection = store.entry(self.key.clone()).or_default();

        if collection
            .iter()
            .any(|existing| existing.get_object_id("_id").map(|e| e == id).unwrap_or(false))
        {
            return Err(ModelError::StoreOperationFailed(format!(
                "Duplicate key: {id} already exists in {}",
                self.name
            )));
        }

        collection.push(document);
        Ok(id)
    }

    async fn insert_many(&self, documents: Vec<Document>) -> ModelResult<Vec<ObjectId>> {
        let mut ids = Vec::with_capacity(documents.len());
        for document in documents {
            ids.push(self.insert_one(document).await?);
        }
        Ok(ids)
    }

    async fn update_one(&self, filter: Document, update: Document) -> ModelResult<u64> {
        self.record_operation();
        let mut store = self.store.write().await;
        let Some(collection) = store.get_mut(&self.key) else {
            return Ok(0);
        };

        for doc in collection.iter_mut() {
            if FilterEvaluator::matches(&filter, doc)? {
                Self::apply_update(doc, &update)?;
                return Ok(1);
            }
        }
        Ok(0)
    }

    async fn update_many(&self, filter: Document, update: Document) -> ModelResult<u64> {
        self.record_operation();
        let mut store = self.store.write().await;
        let Some(collection) = store.get_mut(&self.key) else {
            return Ok(0);
        };

        let mut modified = 0;
        for doc in collection.iter_mut() {
            if FilterEvaluator::matches(&filter, doc)? {
                Self::apply_update(doc, &update)?;
                modified += 1;
            }
        }
        Ok(modified)
    }

    async fn delete_one(&self, filter: Document) -> ModelResult<u64> {
        self.record_operation();
        let mut store = self.store.write().await;
        let Some(collection) = store.get_mut(&self.key) else {
            return Ok(0);
        };

        for (index, doc) in collection.iter().enumerate() {
            if FilterEvaluator::matches(&filter, doc)? {
                collection.remove(index);
                return Ok(1);
            }
        }
        Ok(0)
    }

    async fn delete_many(&self, filter: Document) -> ModelResult<u64> {
        self.record_operation();
        let mut store = self.store.write().await;
        let Some(collection) = store.get_mut(&self.key) else {
            return Ok(0);
        };

        let before = collection.len();
        let mut kept = Vec::with_capacity(before);
        for doc in collection.drain(..) {
            if FilterEvaluator::matches(&filter, &doc)? {
                continue;
            }
            kept.push(doc);
        }
        let deleted = (before - kept.len()) as u64;
        *collection = kept;
        Ok(deleted)
    }

    async fn count_documents(&self, filter: Document) -> ModelResult<u64> {
        self.record_operation();
        let matched = self.matching(&filter).await?;
        Ok(matched.len() as u64)
    }

    async fn create_indexes(&self, _indexes: Vec<IndexSpec>) -> ModelResult<()> {
        // No indexing in the memory backend.
        self.record_operation();
        Ok(())
    }

    async fn drop_indexes(&self, _names: Vec<String>) -> ModelResult<()> {
        self.record_operation();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn collection(client: &MemoryStoreClient) -> Box<dyn StoreCollection> {
        client.select_collection("cms", "articles")
    }

    #[tokio::test]
    async fn insert_find_and_count() {
        let client = MemoryStoreClient::new();
        let articles = collection(&client);

        let id = articles
            .insert_one(doc! { "title": "Hello", "views": 3 })
            .await
            .unwrap();
        articles
            .insert_one(doc! { "title": "Second", "views": 9 })
            .await
            .unwrap();

        let found = articles
            .find_one(doc! { "_id": id }, Default::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.get_str("title").unwrap(), "Hello");

        let count = articles.count_documents(doc! {}).await.unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn duplicate_identifiers_are_rejected() {
        let client = MemoryStoreClient::new();
        let articles = collection(&client);

        let id = ObjectId::new();
        articles.insert_one(doc! { "_id": id }).await.unwrap();
        let err = articles.insert_one(doc! { "_id": id }).await.unwrap_err();
        assert!(matches!(err, ModelError::StoreOperationFailed(_)));
    }

    #[tokio::test]
    async fn find_honors_sort_skip_and_limit() {
        let client = MemoryStoreClient::new();
        let articles = collection(&client);

        for views in [5, 1, 9, 3] {
            articles
                .insert_one(doc! { "title": format!("a{views}"), "views": views })
                .await
                .unwrap();
        }

        let options = ReadOptions {
            sort: Some(doc! { "views": 1 }),
            skip: Some(1),
            limit: Some(2),
            ..Default::default()
        };
        let docs = articles.find(doc! {}, options).await.unwrap();
        let views: Vec<i32> = docs.iter().map(|d| d.get_i32("views").unwrap()).collect();
        assert_eq!(views, vec![3, 5]);
    }

    #[tokio::test]
    async fn update_operators_apply() {
        let client = MemoryStoreClient::new();
        let articles = collection(&client);

        let id = articles
            .insert_one(doc! { "title": "Hello", "tags": ["a"] })
            .await
            .unwrap();

        let modified = articles
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$set": { "title": "Updated" },
                    "$push": { "tags": "b" },
                },
            )
            .await
            .unwrap();
        assert_eq!(modified, 1);

        articles
            .update_one(doc! { "_id": id }, doc! { "$pop": { "tags": -1 } })
            .await
            .unwrap();

        let found = articles
            .find_one(doc! { "_id": id }, Default::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.get_str("title").unwrap(), "Updated");
        assert_eq!(found.get_array("tags").unwrap(), &vec![Bson::String("b".into())]);
    }

    #[tokio::test]
    async fn rename_and_unset_fields() {
        let client = MemoryStoreClient::new();
        let articles = collection(&client);

        articles
            .insert_one(doc! { "title": "Hello", "old_name": 1 })
            .await
            .unwrap();

        articles
            .update_many(doc! {}, doc! { "$rename": { "old_name": "new_name" } })
            .await
            .unwrap();
        articles
            .update_many(doc! {}, doc! { "$unset": { "title": "" } })
            .await
            .unwrap();

        let doc = articles
            .find_one(doc! {}, Default::default())
            .await
            .unwrap()
            .unwrap();
        assert!(doc.get("new_name").is_some());
        assert!(doc.get("old_name").is_none());
        assert!(doc.get("title").is_none());
    }

    #[tokio::test]
    async fn distinct_unwinds_arrays() {
        let client = MemoryStoreClient::new();
        let articles = collection(&client);

        articles
            .insert_one(doc! { "tags": ["a", "b"] })
            .await
            .unwrap();
        articles
            .insert_one(doc! { "tags": ["b", "c"] })
            .await
            .unwrap();

        let values = articles
            .distinct("tags", doc! {}, Default::default())
            .await
            .unwrap();
        assert_eq!(values.len(), 3);
    }

    #[tokio::test]
    async fn aggregate_supports_match_sort_and_limit() {
        let client = MemoryStoreClient::new();
        let articles = collection(&client);

        for views in [5, 1, 9] {
            articles.insert_one(doc! { "views": views }).await.unwrap();
        }

        let docs = articles
            .aggregate(vec![
                doc! { "$match": { "views": { "$gt": 1 } } },
                doc! { "$sort": { "views": -1 } },
                doc! { "$limit": 1 },
            ])
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].get_i32("views").unwrap(), 9);

        let err = articles
            .aggregate(vec![doc! { "$group": { "_id": "$views" } }])
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::StoreOperationFailed(_)));
    }

    #[tokio::test]
    async fn operation_counter_tracks_calls() {
        let client = MemoryStoreClient::new();
        let articles = collection(&client);

        assert_eq!(client.operation_count(), 0);
        articles.insert_one(doc! { "title": "Hello" }).await.unwrap();
        articles
            .find(doc! {}, Default::default())
            .await
            .unwrap();
        assert_eq!(client.operation_count(), 2);
    }
}
