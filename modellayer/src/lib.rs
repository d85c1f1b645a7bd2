//! Main modellayer crate: a typed model and query layer for schemaless
//! document stores.
//!
//! This crate is the primary entry point for users of the modellayer
//! framework. It re-exports the core types and provides convenient access to
//! the storage backends.
//!
//! # Features
//!
//! - **Declared schemas** - Each model declares its fields statically; the
//!   declaration doubles as the read/write allow-list
//! - **Lazy finders** - Finder methods stage a query on a short-lived
//!   builder consumed by `exec`, so no cursor state leaks between calls
//! - **Recursive transformation** - Store documents and typed entities
//!   round-trip through per-field hooks, date coercion, and rich value
//!   types that know their own store shape
//! - **Population** - Foreign-key-like fields resolve into fully
//!   materialized related entities after the primary fetch
//! - **Schema migrations** - Imperative field/index primitives plus a
//!   versioned, bidirectional migration chain
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use modellayer::{memory::MemoryStoreClient, prelude::*};
//! use modellayer::bson::doc;
//!
//! struct Article;
//!
//! const ARTICLE_FIELDS: &[FieldDef] = &[
//!     FieldDef::new(ID_FIELD, FieldKind::Id),
//!     FieldDef::new("title", FieldKind::String).required(),
//!     FieldDef::new("published_at", FieldKind::Date),
//! ];
//!
//! impl Model for Article {
//!     fn collection_name() -> &'static str {
//!         "articles"
//!     }
//!
//!     fn schema() -> Schema {
//!         Schema::new(ARTICLE_FIELDS)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> ModelResult<()> {
//!     let database = Database::new(Arc::new(MemoryStoreClient::new()), "cms");
//!     let articles = Repository::<Article>::new(&database);
//!
//!     let mut draft = ValueMap::new();
//!     draft.insert("title".to_string(), "Hello".into());
//!     let id = articles.insert(draft).await?;
//!
//!     let found = articles.find_by_id(id, None)?.exec().await?;
//!     println!("{}", found.unwrap().to_json()?);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Population
//!
//! ```ignore
//! let entries = Repository::<Entry>::new(&database);
//! let list = entries
//!     .find(doc! { "status": "live" }, None)
//!     .populate::<User>("author_id", "author")
//!     .exec()
//!     .await?;
//! // Each entry's "author" field now holds the materialized user.
//! ```
//!
//! # Migrations
//!
//! ```ignore
//! struct AddHandles;
//!
//! #[async_trait::async_trait]
//! impl Migration for AddHandles {
//!     fn id(&self) -> &'static str { "002_add_handles" }
//!     fn previous_id(&self) -> Option<&'static str> { Some("001_initial") }
//!
//!     async fn up(&self, schema: &SchemaExecutor<'_>) -> ModelResult<()> {
//!         schema.add_field_if_missing("articles", "handle", "").await?;
//!         Ok(())
//!     }
//!
//!     async fn down(&self, schema: &SchemaExecutor<'_>) -> ModelResult<()> {
//!         schema.remove_field("articles", "handle").await?;
//!         Ok(())
//!     }
//! }
//!
//! MigrationRunner::<AppMigrations>::new().upgrade(&database).await?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - [`mongodb`] - Persistent MongoDB backend (requires the `mongodb`
//!   feature)

pub mod prelude;

pub use modellayer_core::{
    client, database, entity, error, migrate, model, options, page, query, schema, transform,
    update, value,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend.
pub mod memory {
    pub use modellayer_memory::MemoryStoreClient;
}

/// MongoDB storage backend.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use modellayer_mongodb::MongoStoreClient;
}
