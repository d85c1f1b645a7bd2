//! Short-lived query builders and population resolution.
//!
//! Each finder method on a repository returns a builder holding the staged
//! operation: filter, sort, projection, skip/limit, collation, visibility
//! tier, and population requests. A builder is consumed by its `exec` call —
//! on every exit path, success or failure — so no staged state survives
//! between calls and nothing needs an explicit reset.
//!
//! Population is a post-fetch join: after the primary documents are
//! transformed, each request resolves a foreign-key-like source field into a
//! fully materialized related entity, one level deep. The two result modes
//! deliberately differ on null handling (see [`SingleQuery::exec`] and
//! [`ManyQuery::exec`]).

use bson::{Bson, Document, oid::ObjectId};
use futures::future::BoxFuture;

use crate::client::{CollationSpec, ReadOptions};
use crate::database::Database;
use crate::entity::{Entity, ensure_object_id};
use crate::error::{ModelError, ModelResult};
use crate::model::{Model, Repository};
use crate::transform::transform_doc_to_entity;
use crate::value::Value;

/// Collation strength handed to the store alongside a staged locale.
const COLLATION_STRENGTH: u8 = 3;

/// Staged cursor state shared by the builder types.
#[derive(Debug, Clone)]
pub(crate) struct CursorState {
    pub filter: Document,
    pub sort: Option<Document>,
    pub projection: Option<Document>,
    pub skip: u64,
    pub limit: i64,
    pub collation: Option<String>,
    pub fetch_all_fields: bool,
}

impl CursorState {
    /// Assembles the per-call options record.
    ///
    /// Sort, projection and collation are included only when staged.
    /// Skip/limit participate only for windowed (multi-result) calls and are
    /// omitted entirely when zero, letting the store use its own defaults.
    pub(crate) fn read_options(&self, windowed: bool) -> ReadOptions {
        ReadOptions {
            sort: self.sort.clone().filter(|sort| !sort.is_empty()),
            projection: self
                .projection
                .clone()
                .filter(|projection| !projection.is_empty()),
            skip: (windowed && self.skip > 0).then_some(self.skip),
            limit: (windowed && self.limit > 0).then_some(self.limit),
            collation: self.collation.as_ref().map(|locale| CollationSpec {
                locale: locale.clone(),
                strength: COLLATION_STRENGTH,
            }),
        }
    }
}

type PopulateLookup =
    Box<dyn Fn(Database, ObjectId) -> BoxFuture<'static, ModelResult<Option<Value>>> + Send + Sync>;

/// A staged request to resolve a source field into a related entity.
pub(crate) struct PopulateRequest {
    source: String,
    dest: String,
    lookup: PopulateLookup,
}

pub(crate) fn populate_request<T: Model>(source: &str, dest: &str) -> PopulateRequest {
    PopulateRequest {
        source: source.to_string(),
        dest: dest.to_string(),
        lookup: Box::new(|database, id| {
            Box::pin(async move {
                // The inner fetch carries no population requests of its own;
                // joins never recurse past one level.
                let related = Repository::<T>::new(&database)
                    .find_by_id(id, None)?
                    .exec()
                    .await?;
                Ok(related.map(|entity| entity.to_value()))
            })
        }),
    }
}

fn value_to_object_id(value: &Value) -> ModelResult<ObjectId> {
    match value {
        Value::Id(id) => Ok(*id),
        Value::String(raw) => ensure_object_id(raw.as_str()),
        other => Err(ModelError::InvalidIdentifier(format!(
            "cannot use {other:?} as an identifier"
        ))),
    }
}

/// Builder for a single-result fetch.
pub struct SingleQuery<'a, M: Model> {
    repo: &'a Repository<M>,
    state: CursorState,
    populations: Vec<PopulateRequest>,
}

impl<'a, M: Model> std::fmt::Debug for SingleQuery<'a, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleQuery")
            .field("repo", &self.repo)
            .field("state", &self.state)
            .field("populations", &self.populations.len())
            .finish()
    }
}

impl<'a, M: Model> SingleQuery<'a, M> {
    pub(crate) fn new(repo: &'a Repository<M>, state: CursorState) -> Self {
        SingleQuery { repo, state, populations: Vec::new() }
    }

    /// Includes hidden/administrative fields in the result.
    pub fn all_fields(mut self) -> Self {
        self.state.fetch_all_fields = true;
        self
    }

    /// Resolves `source` into an entity of model `T`, assigned to `dest`.
    pub fn populate<T: Model>(mut self, source: &str, dest: &str) -> Self {
        self.populations.push(populate_request::<T>(source, dest));
        self
    }

    /// Executes the staged fetch. Absence of a match is `Ok(None)`.
    ///
    /// Population lookups run unconditionally in this mode: a null or empty
    /// source field surfaces as an identifier error rather than resolving to
    /// null (the multi-result mode behaves differently by design).
    pub async fn exec(self) -> ModelResult<Option<Entity<M>>> {
        let SingleQuery { repo, state, populations } = self;
        let options = state.read_options(false);

        let Some(doc) = repo.collection().find_one(state.filter, options).await? else {
            return Ok(None);
        };

        let mut entity = transform_doc_to_entity::<M>(&doc, state.fetch_all_fields)?;
        for request in &populations {
            let source = entity.get(&request.source).cloned().unwrap_or(Value::Null);
            let id = value_to_object_id(&source)?;
            let resolved = (request.lookup)(repo.database().clone(), id).await?;
            entity.load(request.dest.clone(), resolved.unwrap_or(Value::Null));
        }

        Ok(Some(entity))
    }
}

/// Builder for a multi-result fetch.
pub struct ManyQuery<'a, M: Model> {
    repo: &'a Repository<M>,
    state: CursorState,
    populations: Vec<PopulateRequest>,
}

impl<'a, M: Model> ManyQuery<'a, M> {
    pub(crate) fn new(repo: &'a Repository<M>, state: CursorState) -> Self {
        ManyQuery { repo, state, populations: Vec::new() }
    }

    /// Includes hidden/administrative fields in the results.
    pub fn all_fields(mut self) -> Self {
        self.state.fetch_all_fields = true;
        self
    }

    /// Resolves `source` into an entity of model `T`, assigned to `dest`.
    pub fn populate<T: Model>(mut self, source: &str, dest: &str) -> Self {
        self.populations.push(populate_request::<T>(source, dest));
        self
    }

    /// Executes the staged fetch, preserving store order.
    ///
    /// A population source that is null or an empty string resolves the
    /// destination to null without issuing a store call.
    pub async fn exec(self) -> ModelResult<Vec<Entity<M>>> {
        let ManyQuery { repo, state, populations } = self;
        let options = state.read_options(true);

        let results = repo.collection().find(state.filter, options).await?;
        let mut entities = Vec::with_capacity(results.len());

        for doc in &results {
            let mut entity = transform_doc_to_entity::<M>(doc, state.fetch_all_fields)?;

            for request in &populations {
                let source = entity.get(&request.source).cloned().unwrap_or(Value::Null);
                let empty =
                    source.is_null() || matches!(&source, Value::String(raw) if raw.is_empty());

                if empty {
                    entity.load(request.dest.clone(), Value::Null);
                } else {
                    let id = value_to_object_id(&source)?;
                    let resolved = (request.lookup)(repo.database().clone(), id).await?;
                    entity.load(request.dest.clone(), resolved.unwrap_or(Value::Null));
                }
            }

            entities.push(entity);
        }

        Ok(entities)
    }
}

/// Builder for a distinct-values fetch.
///
/// Single-result-shaped: skip/limit are never sent. Results are raw store
/// values and do not pass through the transformer.
pub struct DistinctQuery<'a, M: Model> {
    repo: &'a Repository<M>,
    field: String,
    state: CursorState,
}

impl<'a, M: Model> DistinctQuery<'a, M> {
    pub(crate) fn new(repo: &'a Repository<M>, field: String, state: CursorState) -> Self {
        DistinctQuery { repo, field, state }
    }

    /// Executes the staged distinct call.
    pub async fn exec(self) -> ModelResult<Vec<Bson>> {
        let DistinctQuery { repo, field, state } = self;
        let options = state.read_options(false);
        repo.collection().distinct(&field, state.filter, options).await
    }
}
