use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as DriverCollection, IndexModel,
    options::{
        ClientOptions, Collation, CollationStrength, DistinctOptions, FindOneOptions,
        FindOptions, IndexOptions,
    },
};

use modellayer_core::client::{CollationSpec, IndexSpec, ReadOptions, StoreClient, StoreCollection};
use modellayer_core::error::{ModelError, ModelResult};

fn store_error(err: impl std::fmt::Display) -> ModelError {
    ModelError::StoreOperationFailed(err.to_string())
}

fn driver_collation(spec: &CollationSpec) -> Collation {
    let strength = match spec.strength {
        1 => CollationStrength::Primary,
        2 => CollationStrength::Secondary,
        4 => CollationStrength::Quaternary,
        5 => CollationStrength::Identical,
        _ => CollationStrength::Tertiary,
    };

    Collation::builder()
        .locale(spec.locale.clone())
        .strength(strength)
        .build()
}

/// Store client backed by a MongoDB deployment.
#[derive(Debug, Clone)]
pub struct MongoStoreClient {
    client: Client,
}

impl MongoStoreClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Parses a connection string and wraps the driver client. The driver
    /// connects lazily on first use.
    pub async fn connect(dsn: &str) -> ModelResult<Self> {
        let options = ClientOptions::parse(dsn).await.map_err(store_error)?;
        Ok(Self::new(Client::with_options(options).map_err(store_error)?))
    }
}

#[async_trait]
impl StoreClient for MongoStoreClient {
    fn select_collection(&self, database: &str, collection: &str) -> Box<dyn StoreCollection> {
        Box::new(MongoCollection {
            name: collection.to_string(),
            collection: self
                .client
                .database(database)
                .collection::<Document>(collection),
        })
    }

    async fn disconnect(&self) -> ModelResult<()> {
        self.client.clone().shutdown().await;

        Ok(())
    }
}

#[derive(Debug)]
struct MongoCollection {
    name: String,
    collection: DriverCollection<Document>,
}

#[async_trait]
impl StoreCollection for MongoCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find_one(
        &self,
        filter: Document,
        options: ReadOptions,
    ) -> ModelResult<Option<Document>> {
        let mut driver_options = FindOneOptions::default();
        driver_options.sort = options.sort;
        driver_options.projection = options.projection;
        driver_options.collation = options.collation.as_ref().map(driver_collation);

        self.collection
            .find_one(filter)
            .with_options(driver_options)
            .await
            .map_err(store_error)
    }

    async fn find(&self, filter: Document, options: ReadOptions) -> ModelResult<Vec<Document>> {
        let mut driver_options = FindOptions::default();
        driver_options.sort = options.sort;
        driver_options.projection = options.projection;
        driver_options.skip = options.skip;
        driver_options.limit = options.limit;
        driver_options.collation = options.collation.as_ref().map(driver_collation);

        self.collection
            .find(filter)
            .with_options(driver_options)
            .await
            .map_err(store_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(store_error)
    }

    async fn distinct(
        &self,
        field: &str,
        filter: Document,
        options: ReadOptions,
    ) -> ModelResult<Vec<Bson>> {
        let mut driver_options = DistinctOptions::default();
        driver_options.collation = options.collation.as_ref().map(driver_collation);

        self.collection
            .distinct(field, filter)
            .with_options(driver_options)
            .await
            .map_err(store_error)
    }

    async fn aggregate(&self, pipeline: Vec<Document>) -> ModelResult<Vec<Document>> {
        self.collection
            .aggregate(pipeline)
            .await
            .map_err(store_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(store_error)
    }

    async fn insert_one(&self, document: Document) -> ModelResult<ObjectId> {
        let result = self
            .collection
            .insert_one(document)
            .await
            .map_err(store_error)?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| store_error("Store returned a non-ObjectId identifier"))
    }

    async fn insert_many(&self, documents: Vec<Document>) -> ModelResult<Vec<ObjectId>> {
        let count = documents.len();
        let result = self
            .collection
            .insert_many(documents)
            .await
            .map_err(store_error)?;

        let mut ids = Vec::with_capacity(count);
        for index in 0..count {
            let id = result
                .inserted_ids
                .get(&index)
                .and_then(Bson::as_object_id)
                .ok_or_else(|| store_error("Store returned a non-ObjectId identifier"))?;
            ids.push(id);
        }
        Ok(ids)
    }

    async fn update_one(&self, filter: Document, update: Document) -> ModelResult<u64> {
        Ok(self
            .collection
            .update_one(filter, update)
            .await
            .map_err(store_error)?
            .modified_count)
    }

    async fn update_many(&self, filter: Document, update: Document) -> ModelResult<u64> {
        Ok(self
            .collection
            .update_many(filter, update)
            .await
            .map_err(store_error)?
            .modified_count)
    }

    async fn delete_one(&self, filter: Document) -> ModelResult<u64> {
        Ok(self
            .collection
            .delete_one(filter)
            .await
            .map_err(store_error)?
            .deleted_count)
    }

    async fn delete_many(&self, filter: Document) -> ModelResult<u64> {
        Ok(self
            .collection
            .delete_many(filter)
            .await
            .map_err(store_error)?
            .deleted_count)
    }

    async fn count_documents(&self, filter: Document) -> ModelResult<u64> {
        self.collection
            .count_documents(filter)
            .await
            .map_err(store_error)
    }

    async fn create_indexes(&self, indexes: Vec<IndexSpec>) -> ModelResult<()> {
        let models = indexes
            .into_iter()
            .map(|index| {
                IndexModel::builder()
                    .keys(index.keys)
                    .options(
                        IndexOptions::builder()
                            .name(index.name)
                            .unique(index.unique)
                            .build(),
                    )
                    .build()
            })
            .collect::<Vec<_>>();

        self.collection
            .create_indexes(models)
            .await
            .map_err(store_error)?;

        Ok(())
    }

    async fn drop_indexes(&self, names: Vec<String>) -> ModelResult<()> {
        for name in names {
            self.collection
                .drop_index(name)
                .await
                .map_err(store_error)?;
        }

        Ok(())
    }
}
