//! Update specifications for partial writes.
//!
//! An [`UpdateSpec`] collects the operator portions of a store update. Only
//! the `$set` portion is routed through the write-preparation path (store
//! hooks, date conversion); every other operator passes through to the
//! store unmodified.

use bson::{Bson, Document};

use crate::error::ModelResult;
use crate::model::Model;
use crate::transform::prepare_for_write;
use crate::value::ValueMap;

/// Builder for a store update document.
#[derive(Debug, Default)]
pub struct UpdateSpec {
    set: Option<ValueMap>,
    operators: Document,
}

impl UpdateSpec {
    pub fn new() -> Self {
        UpdateSpec::default()
    }

    /// Starts an update that sets the given fields.
    pub fn set(values: ValueMap) -> Self {
        UpdateSpec { set: Some(values), operators: Document::new() }
    }

    /// Removes the given fields.
    pub fn unset(mut self, fields: &[&str]) -> Self {
        for field in fields {
            self.push_operator("$unset", field, Bson::String(String::new()));
        }
        self
    }

    /// Renames a field.
    pub fn rename(mut self, field: &str, new_name: &str) -> Self {
        self.push_operator("$rename", field, Bson::String(new_name.to_string()));
        self
    }

    /// Appends a value to an array field.
    pub fn push(mut self, field: &str, value: impl Into<Bson>) -> Self {
        self.push_operator("$push", field, value.into());
        self
    }

    /// Removes matching values from an array field.
    pub fn pull(mut self, field: &str, value: impl Into<Bson>) -> Self {
        self.push_operator("$pull", field, value.into());
        self
    }

    /// Removes the first element of an array field.
    pub fn pop_first(mut self, field: &str) -> Self {
        self.push_operator("$pop", field, Bson::Int32(-1));
        self
    }

    /// Removes the last element of an array field.
    pub fn pop_last(mut self, field: &str) -> Self {
        self.push_operator("$pop", field, Bson::Int32(1));
        self
    }

    /// Appends a value to an array field unless already present.
    pub fn add_to_set(mut self, field: &str, value: impl Into<Bson>) -> Self {
        self.push_operator("$addToSet", field, value.into());
        self
    }

    /// Merges a raw operator document, passed through unmodified.
    pub fn operator(mut self, operator: &str, spec: Document) -> Self {
        for (key, value) in spec {
            self.push_operator(operator, &key, value);
        }
        self
    }

    fn push_operator(&mut self, operator: &str, field: &str, value: Bson) {
        if !self.operators.contains_key(operator) {
            self.operators.insert(operator, Document::new());
        }
        if let Some(Bson::Document(spec)) = self.operators.get_mut(operator) {
            spec.insert(field, value);
        }
    }

    /// Assembles the final update document for model `M`. The `$set`
    /// portion runs through write preparation; the rest is verbatim.
    pub(crate) fn into_document<M: Model>(self) -> ModelResult<Document> {
        let mut update = self.operators;
        if let Some(values) = &self.set {
            update.insert("$set", prepare_for_write::<M>(values)?);
        }
        Ok(update)
    }
}
