//! Core of the modellayer project: a typed model and query layer over
//! schemaless document stores.
//!
//! This crate maps typed in-memory entities onto loosely-typed store
//! documents and back. It provides:
//!
//! - **Store client abstraction** ([`client`]) - Traits implemented by
//!   storage backends (in-memory, MongoDB)
//! - **Database handle** ([`database`]) - Shared connection handle, global
//!   slot, and the access-control context
//! - **Value model** ([`value`]) - In-memory representation of property
//!   values, including the store-shape capability for rich types
//! - **Schema descriptors** ([`schema`]) - Static per-model field
//!   declarations forming the read/write allow-list
//! - **Entity base** ([`entity`]) - Property bag, dirty tracking,
//!   identifier handling, serialization
//! - **Models and repositories** ([`model`]) - The per-collection extension
//!   contract and its bound finder/mutation surface
//! - **Query builders** ([`query`]) - Short-lived staged cursors with
//!   population (post-fetch join) support
//! - **Document transformation** ([`transform`]) - Recursive coercion
//!   between store documents and entities
//! - **Update specs** ([`update`]) - Partial-update construction
//! - **Query options** ([`options`]) - Preset-built immutable options
//! - **Pagination** ([`page`]) - Page values and parameters for listings
//! - **Migrations** ([`migrate`]) - Imperative schema primitives and a
//!   versioned migration chain
//! - **Error handling** ([`error`]) - The error taxonomy and result alias
//!
//! # Example
//!
//! ```ignore
//! use modellayer_core::model::Model;
//! use modellayer_core::schema::{FieldDef, FieldKind, Schema};
//!
//! struct Article;
//!
//! const ARTICLE_FIELDS: &[FieldDef] = &[
//!     FieldDef::new("_id", FieldKind::Id),
//!     FieldDef::new("title", FieldKind::String).required(),
//!     FieldDef::new("author_id", FieldKind::Id),
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
//! ```

pub mod client;
pub mod database;
pub mod entity;
pub mod error;
pub mod migrate;
pub mod model;
pub mod options;
pub mod page;
pub mod query;
pub mod schema;
pub mod transform;
pub mod update;
pub mod value;
