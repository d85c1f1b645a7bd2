//! Filter evaluation, comparison, and sorting for in-memory documents.
//!
//! Filters are store-native nested mappings: implicit equality plus the
//! fixed operator set `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`,
//! `$nin`, `$exists`, and the logical `$and`/`$or`.

use std::cmp::Ordering;

use bson::{Bson, Document, oid::ObjectId};

use modellayer_core::error::{ModelError, ModelResult};

/// Type-erased, comparable representation of store values.
///
/// Numeric types normalize to `f64` so mixed-width comparisons behave.
#[derive(Debug, PartialEq)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(bson::DateTime),
    String(&'a str),
    Id(&'a ObjectId),
    Array(Vec<Comparable<'a>>),
    Map(Vec<(&'a str, Comparable<'a>)>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(value: &'a Bson) -> Self {
        match value {
            Bson::Null => Comparable::Null,
            Bson::Boolean(v) => Comparable::Bool(*v),
            Bson::Int32(v) => Comparable::Number(*v as f64),
            Bson::Int64(v) => Comparable::Number(*v as f64),
            Bson::Double(v) => Comparable::Number(*v),
            Bson::DateTime(v) => Comparable::DateTime(*v),
            Bson::String(v) => Comparable::String(v),
            Bson::ObjectId(v) => Comparable::Id(v),
            Bson::Array(items) => {
                Comparable::Array(items.iter().map(Comparable::from).collect())
            }
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(key, value)| (key.as_str(), Comparable::from(value)))
                    .collect(),
            ),
            _ => Comparable::Null,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::Id(a), Comparable::Id(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Evaluates filter documents against stored documents.
pub(crate) struct FilterEvaluator;

impl FilterEvaluator {
    /// Whether `doc` matches `filter`. An empty filter matches everything.
    pub(crate) fn matches(filter: &Document, doc: &Document) -> ModelResult<bool> {
        for (key, condition) in filter {
            let matched = match key.as_str() {
                "$and" => Self::logical(condition, doc)?.all(),
                "$or" => Self::logical(condition, doc)?.any(),
                field => Self::matches_field(doc.get(field), condition)?,
            };
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn logical(condition: &Bson, doc: &Document) -> ModelResult<LogicalOutcome> {
        let Bson::Array(branches) = condition else {
            return Err(ModelError::StoreOperationFailed(
                "Logical operator requires an array of filters".to_string(),
            ));
        };

        let mut results = Vec::with_capacity(branches.len());
        for branch in branches {
            let Bson::Document(filter) = branch else {
                return Err(ModelError::StoreOperationFailed(
                    "Logical operator branches must be filter documents".to_string(),
                ));
            };
            results.push(Self::matches(filter, doc)?);
        }
        Ok(LogicalOutcome(results))
    }

    fn matches_field(actual: Option<&Bson>, condition: &Bson) -> ModelResult<bool> {
        if let Bson::Document(spec) = condition {
            if spec.keys().any(|key| key.starts_with('$')) {
                for (operator, operand) in spec {
                    if !Self::apply_operator(actual, operator, operand)? {
                        return Ok(false);
                    }
                }
                return Ok(true);
            }
        }

        Ok(Self::equals(actual, condition))
    }

    fn equals(actual: Option<&Bson>, expected: &Bson) -> bool {
        match actual {
            Some(value) => Comparable::from(value) == Comparable::from(expected),
            None => matches!(expected, Bson::Null),
        }
    }

    fn apply_operator(actual: Option<&Bson>, operator: &str, operand: &Bson) -> ModelResult<bool> {
        match operator {
            "$eq" => Ok(Self::equals(actual, operand)),
            "$ne" => Ok(!Self::equals(actual, operand)),
            "$exists" => {
                let should_exist = operand.as_bool().unwrap_or(false);
                Ok(actual.is_some() == should_exist)
            }
            "$in" => Ok(Self::membership(actual, operand)?),
            "$nin" => Ok(!Self::membership(actual, operand)?),
            "$gt" | "$gte" | "$lt" | "$lte" => {
                let Some(value) = actual else {
                    return Ok(false);
                };
                match Comparable::from(value).partial_cmp(&Comparable::from(operand)) {
                    Some(ordering) => Ok(match operator {
                        "$gt" => ordering == Ordering::Greater,
                        "$gte" => ordering != Ordering::Less,
                        "$lt" => ordering == Ordering::Less,
                        "$lte" => ordering != Ordering::Greater,
                        _ => unreachable!(),
                    }),
                    None => Ok(false),
                }
            }
            other => Err(ModelError::StoreOperationFailed(format!(
                "Unsupported filter operator: {other}"
            ))),
        }
    }

    /// `$in` semantics: the field equals any candidate, or an array field
    /// contains any candidate.
    fn membership(actual: Option<&Bson>, operand: &Bson) -> ModelResult<bool> {
        let Bson::Array(candidates) = operand else {
            return Err(ModelError::StoreOperationFailed(
                "$in/$nin require an array operand".to_string(),
            ));
        };

        let Some(value) = actual else {
            return Ok(false);
        };

        for candidate in candidates {
            if Comparable::from(value) == Comparable::from(candidate) {
                return Ok(true);
            }
            if let Bson::Array(items) = value {
                if items
                    .iter()
                    .any(|item| Comparable::from(item) == Comparable::from(candidate))
                {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

struct LogicalOutcome(Vec<bool>);

impl LogicalOutcome {
    fn all(&self) -> bool {
        self.0.iter().all(|matched| *matched)
    }

    fn any(&self) -> bool {
        self.0.iter().any(|matched| *matched)
    }
}

/// Sorts documents by an ordered field → direction mapping.
pub(crate) fn sort_documents(documents: &mut [Document], sort: &Document) {
    documents.sort_by(|a, b| {
        for (field, direction) in sort {
            let left = a.get(field).map(Comparable::from).unwrap_or(Comparable::Null);
            let right = b.get(field).map(Comparable::from).unwrap_or(Comparable::Null);

            let descending = matches!(direction.as_i32(), Some(v) if v < 0)
                || matches!(direction.as_i64(), Some(v) if v < 0);

            let ordering = if descending {
                right.partial_cmp(&left)
            } else {
                left.partial_cmp(&right)
            };

            match ordering {
                Some(Ordering::Equal) | None => continue,
                Some(ordering) => return ordering,
            }
        }
        Ordering::Equal
    });
}

/// Applies a field inclusion/exclusion mapping to a document.
pub(crate) fn project_document(doc: &Document, projection: &Document) -> Document {
    let truthy = |value: &Bson| -> bool {
        match value {
            Bson::Boolean(v) => *v,
            Bson::Int32(v) => *v != 0,
            Bson::Int64(v) => *v != 0,
            Bson::Double(v) => *v != 0.0,
            _ => false,
        }
    };

    let included: Vec<&str> = projection
        .iter()
        .filter(|(key, value)| *key != "_id" && truthy(value))
        .map(|(key, _)| key.as_str())
        .collect();

    let id_excluded = projection.get("_id").is_some_and(|value| !truthy(value));

    if !included.is_empty() {
        // Inclusion mode: listed fields plus the identifier.
        return doc
            .iter()
            .filter(|(key, _)| {
                (*key == "_id" && !id_excluded) || included.contains(&key.as_str())
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
    }

    // Exclusion mode: everything except the listed fields.
    doc.iter()
        .filter(|(key, _)| match projection.get(key.as_str()) {
            Some(value) => truthy(value),
            None => !(*key == "_id" && id_excluded),
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
