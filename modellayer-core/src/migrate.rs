//! Schema migrations: imperative collection primitives and a versioned
//! migration chain.
//!
//! [`SchemaExecutor`] is a thin wrapper over raw collection operations —
//! rename/add/remove a field across all documents, manage indexes, insert or
//! remove raw records. It deliberately bypasses the entity and transformer
//! layers: migrations operate on raw documents.
//!
//! On top of it, [`Migration`]/[`Migrations`]/[`MigrationRunner`] provide
//! bidirectional, versioned schema evolution. Each migration names its
//! predecessor, forming a chain; the runner resolves the path between the
//! stored revision and a target and applies each step, recording progress in
//! a reserved collection.

use async_trait::async_trait;
use bson::{Bson, Document, doc, oid::ObjectId};
use std::collections::HashMap;

use crate::database::Database;
use crate::error::{ModelError, ModelResult};

/// Reserved collection holding the current schema revision.
const REVISION_COLLECTION: &str = "_migrations";

/// Imperative schema operations against one database.
pub struct SchemaExecutor<'a> {
    database: &'a Database,
}

impl<'a> SchemaExecutor<'a> {
    pub fn new(database: &'a Database) -> Self {
        SchemaExecutor { database }
    }

    /// Renames a field on every document of a collection.
    pub async fn rename_field(
        &self,
        collection: &str,
        field: &str,
        new_name: &str,
    ) -> ModelResult<u64> {
        self.database
            .collection(collection)
            .update_many(
                doc! { field: { "$exists": true } },
                doc! { "$rename": { field: new_name } },
            )
            .await
    }

    /// Sets a field to `value` on every document of a collection,
    /// overwriting existing values.
    pub async fn add_field(
        &self,
        collection: &str,
        field: &str,
        value: impl Into<Bson>,
    ) -> ModelResult<u64> {
        self.database
            .collection(collection)
            .update_many(doc! {}, doc! { "$set": { field: value.into() } })
            .await
    }

    /// Sets a field to `value` only on documents where it is absent.
    pub async fn add_field_if_missing(
        &self,
        collection: &str,
        field: &str,
        value: impl Into<Bson>,
    ) -> ModelResult<u64> {
        self.database
            .collection(collection)
            .update_many(
                doc! { field: { "$exists": false } },
                doc! { "$set": { field: value.into() } },
            )
            .await
    }

    /// Removes a field from every document of a collection.
    pub async fn remove_field(&self, collection: &str, field: &str) -> ModelResult<u64> {
        self.database
            .collection(collection)
            .update_many(doc! {}, doc! { "$unset": { field: "" } })
            .await
    }

    /// Creates indexes on a collection.
    pub async fn add_indexes(
        &self,
        collection: &str,
        indexes: Vec<crate::client::IndexSpec>,
    ) -> ModelResult<()> {
        self.database.collection(collection).create_indexes(indexes).await
    }

    /// Drops indexes from a collection.
    pub async fn drop_indexes(&self, collection: &str, names: Vec<String>) -> ModelResult<()> {
        self.database.collection(collection).drop_indexes(names).await
    }

    /// Inserts a raw record, bypassing the entity layer.
    pub async fn insert_record(
        &self,
        collection: &str,
        record: Document,
    ) -> ModelResult<ObjectId> {
        self.database.collection(collection).insert_one(record).await
    }

    /// Removes raw records matching `filter`.
    pub async fn remove_records(&self, collection: &str, filter: Document) -> ModelResult<u64> {
        self.database.collection(collection).delete_many(filter).await
    }

    /// The stored schema revision, if any migration has been applied.
    pub async fn current_revision(&self) -> ModelResult<Option<String>> {
        let record = self
            .database
            .collection(REVISION_COLLECTION)
            .find_one(doc! {}, Default::default())
            .await?;
        Ok(record.and_then(|doc| doc.get_str("revision_id").map(str::to_string).ok()))
    }

    /// Records `revision` as the current schema revision.
    pub async fn set_revision(&self, revision: &str) -> ModelResult<()> {
        let collection = self.database.collection(REVISION_COLLECTION);
        collection.delete_many(doc! {}).await?;
        collection.insert_one(doc! { "revision_id": revision }).await?;
        Ok(())
    }

    /// Clears the stored schema revision.
    pub async fn clear_revision(&self) -> ModelResult<()> {
        self.database
            .collection(REVISION_COLLECTION)
            .delete_many(doc! {})
            .await?;
        Ok(())
    }
}

/// One step in the schema evolution chain.
#[async_trait]
pub trait Migration: Send + Sync {
    /// Unique identifier of this migration.
    fn id(&self) -> &'static str;

    /// Identifier of the migration this one follows; `None` for the initial
    /// migration.
    fn previous_id(&self) -> Option<&'static str>;

    /// Applies this migration.
    async fn up(&self, schema: &SchemaExecutor<'_>) -> ModelResult<()>;

    /// Reverses this migration.
    async fn down(&self, schema: &SchemaExecutor<'_>) -> ModelResult<()>;
}

pub type MigrationRef = Box<dyn Migration>;

/// Registry of all migrations of an application.
pub trait Migrations: Send + Sync {
    fn migrations() -> Vec<MigrationRef>;
}

struct RevisionChain {
    revisions: HashMap<String, MigrationRef>,
    head: Option<String>,
}

impl RevisionChain {
    fn new(migrations: Vec<MigrationRef>) -> Self {
        let revisions: HashMap<String, MigrationRef> = migrations
            .into_iter()
            .map(|migration| (migration.id().to_string(), migration))
            .collect();

        // The head is the revision no other migration names as previous.
        let head = revisions
            .keys()
            .find(|id| {
                !revisions
                    .values()
                    .any(|migration| migration.previous_id() == Some(id.as_str()))
            })
            .cloned();

        RevisionChain { revisions, head }
    }

    fn get(&self, id: &str) -> ModelResult<&MigrationRef> {
        self.revisions
            .get(id)
            .ok_or_else(|| ModelError::Migration(format!("Unknown revision '{id}'")))
    }

    fn head(&self) -> ModelResult<&str> {
        self.head
            .as_deref()
            .ok_or_else(|| ModelError::Migration("No head revision found".to_string()))
    }

    /// Revisions to apply, oldest first, to move from `from` up to `to`.
    fn path_up(&self, from: Option<&str>, to: &str) -> ModelResult<Vec<&MigrationRef>> {
        let mut path = Vec::new();
        let mut cursor = Some(to.to_string());

        while let Some(id) = cursor {
            if from == Some(id.as_str()) {
                path.reverse();
                return Ok(path);
            }
            let migration = self.get(&id)?;
            path.push(migration);
            cursor = migration.previous_id().map(str::to_string);
        }

        match from {
            // Walked past the initial migration without meeting `from`.
            Some(from) => Err(ModelError::Migration(format!(
                "No upgrade path from revision '{from}' to '{to}'"
            ))),
            None => {
                path.reverse();
                Ok(path)
            }
        }
    }

    /// Revisions to reverse, newest first, to move from `from` down to `to`
    /// (exclusive; `to = None` reverses everything).
    fn path_down(&self, from: &str, to: Option<&str>) -> ModelResult<Vec<&MigrationRef>> {
        let mut path = Vec::new();
        let mut cursor = Some(from.to_string());

        while let Some(id) = cursor {
            if to == Some(id.as_str()) {
                return Ok(path);
            }
            let migration = self.get(&id)?;
            path.push(migration);
            cursor = migration.previous_id().map(str::to_string);
        }

        match to {
            Some(to) => Err(ModelError::Migration(format!(
                "No downgrade path from revision '{from}' to '{to}'"
            ))),
            None => Ok(path),
        }
    }
}

/// Resolves and applies migration paths against a database.
pub struct MigrationRunner<M: Migrations> {
    chain: RevisionChain,
    _registry: std::marker::PhantomData<fn() -> M>,
}

impl<M: Migrations> MigrationRunner<M> {
    pub fn new() -> Self {
        MigrationRunner {
            chain: RevisionChain::new(M::migrations()),
            _registry: std::marker::PhantomData,
        }
    }

    /// Applies every pending migration up to the head revision.
    pub async fn upgrade(&self, database: &Database) -> ModelResult<()> {
        self.upgrade_to(database, self.chain.head()?.to_string().as_str())
            .await
    }

    /// Applies pending migrations up to and including `target`.
    pub async fn upgrade_to(&self, database: &Database, target: &str) -> ModelResult<()> {
        let schema = SchemaExecutor::new(database);
        let current = schema.current_revision().await?;

        let path = self.chain.path_up(current.as_deref(), target)?;
        for migration in path {
            migration.up(&schema).await?;
            schema.set_revision(migration.id()).await?;
        }

        Ok(())
    }

    /// Reverses every applied migration.
    pub async fn downgrade(&self, database: &Database) -> ModelResult<()> {
        self.apply_down(database, None).await
    }

    /// Reverses applied migrations down to `target`, which stays applied.
    pub async fn downgrade_to(&self, database: &Database, target: &str) -> ModelResult<()> {
        self.apply_down(database, Some(target)).await
    }

    async fn apply_down(&self, database: &Database, target: Option<&str>) -> ModelResult<()> {
        let schema = SchemaExecutor::new(database);
        let Some(current) = schema.current_revision().await? else {
            return Ok(());
        };

        let path = self.chain.path_down(&current, target)?;
        for migration in path {
            migration.down(&schema).await?;
            match migration.previous_id() {
                Some(previous) => schema.set_revision(previous).await?,
                None => schema.clear_revision().await?,
            }
        }

        Ok(())
    }
}

impl<M: Migrations> Default for MigrationRunner<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Step {
        id: &'static str,
        previous: Option<&'static str>,
    }

    #[async_trait]
    impl Migration for Step {
        fn id(&self) -> &'static str {
            self.id
        }

        fn previous_id(&self) -> Option<&'static str> {
            self.previous
        }

        async fn up(&self, _schema: &SchemaExecutor<'_>) -> ModelResult<()> {
            Ok(())
        }

        async fn down(&self, _schema: &SchemaExecutor<'_>) -> ModelResult<()> {
            Ok(())
        }
    }

    fn chain() -> RevisionChain {
        RevisionChain::new(vec![
            Box::new(Step { id: "001_initial", previous: None }),
            Box::new(Step { id: "002_entries", previous: Some("001_initial") }),
            Box::new(Step { id: "003_assets", previous: Some("002_entries") }),
        ])
    }

    fn ids(path: Vec<&MigrationRef>) -> Vec<&'static str> {
        path.into_iter().map(|migration| migration.id()).collect()
    }

    #[test]
    fn head_is_the_unreferenced_revision() {
        assert_eq!(chain().head().unwrap(), "003_assets");
    }

    #[test]
    fn upgrade_path_from_scratch_covers_the_whole_chain() {
        let chain = chain();
        let path = chain.path_up(None, "003_assets").unwrap();
        assert_eq!(ids(path), vec!["001_initial", "002_entries", "003_assets"]);
    }

    #[test]
    fn upgrade_path_is_relative_to_the_current_revision() {
        let chain = chain();
        let path = chain.path_up(Some("001_initial"), "003_assets").unwrap();
        assert_eq!(ids(path), vec!["002_entries", "003_assets"]);
    }

    #[test]
    fn downgrade_path_excludes_the_target() {
        let chain = chain();
        let path = chain.path_down("003_assets", Some("001_initial")).unwrap();
        assert_eq!(ids(path), vec!["003_assets", "002_entries"]);
    }

    #[test]
    fn full_downgrade_reverses_everything() {
        let chain = chain();
        let path = chain.path_down("003_assets", None).unwrap();
        assert_eq!(ids(path), vec!["003_assets", "002_entries", "001_initial"]);
    }

    #[test]
    fn unreachable_targets_are_errors() {
        let chain = chain();
        assert!(chain.path_up(Some("003_assets"), "001_initial").is_err());
        assert!(chain.path_down("001_initial", Some("003_assets")).is_err());
        assert!(chain.path_up(None, "999_unknown").is_err());
    }
}
