//! Error types and result alias for the model layer.
//!
//! Every fallible operation in this crate returns [`ModelResult<T>`]. Absence
//! of a matching document is never an error; finders return `None` or an
//! empty vector instead.

use thiserror::Error;

/// All error conditions the model layer can surface.
///
/// Store backends wrap every underlying driver failure into
/// [`ModelError::StoreOperationFailed`] carrying the original message; this
/// layer never retries and never logs, it only raises or returns.
#[derive(Error, Debug)]
pub enum ModelError {
    /// A string was passed where a native identifier is required and could
    /// not be converted into one.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    /// Any failure reported by the underlying document store.
    #[error("Store operation failed: {0}")]
    StoreOperationFailed(String),
    /// Internal invariant violation. Does not surface when the layer is used
    /// through its public methods.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
    /// A write was rejected by a field hook or a required-on-write check.
    #[error("Validation failed on field '{field}': {reason}")]
    Validation {
        /// Name of the offending field.
        field: String,
        /// Human-readable reason for the rejection.
        reason: String,
    },
    /// The permission gate rejected the current actor.
    #[error("Permission denied ({0})")]
    PermissionDenied(String),
    /// Migration chain could not be resolved or applied.
    #[error("Migration error: {0}")]
    Migration(String),
    /// A snapshot could not be encoded to JSON.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ModelError {
    /// HTTP-equivalent severity class for this error.
    pub fn status(&self) -> u16 {
        match self {
            ModelError::InvalidIdentifier(_) | ModelError::Validation { .. } => 400,
            ModelError::PermissionDenied(_) => 403,
            ModelError::StoreOperationFailed(_)
            | ModelError::UnsupportedOperation(_)
            | ModelError::Migration(_)
            | ModelError::Serialization(_) => 500,
        }
    }

    /// Helper used when validation hooks reject a value.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ModelError::Validation { field: field.into(), reason: reason.into() }
    }
}

/// A specialized `Result` type for model-layer operations.
pub type ModelResult<T> = Result<T, ModelError>;

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes() {
        assert_eq!(ModelError::InvalidIdentifier("x".into()).status(), 400);
        assert_eq!(ModelError::validation("handle", "empty").status(), 400);
        assert_eq!(ModelError::PermissionDenied("users".into()).status(), 403);
        assert_eq!(ModelError::StoreOperationFailed("down".into()).status(), 500);
        assert_eq!(ModelError::Migration("no path".into()).status(), 500);
    }

    #[test]
    fn store_failure_keeps_original_message() {
        let err = ModelError::StoreOperationFailed("connection reset".into());
        assert_eq!(err.to_string(), "Store operation failed: connection reset");
    }
}
