//! Error types for record transformation
//!
//! Configuration and input-shape problems are errors. Missing data never is:
//! absent values are `None` and the affected field is skipped.

use thiserror::Error;

/// Errors raised while reading or writing a record path
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Empty path expression")]
    Empty,

    #[error("Malformed path segment '{segment}' in '{path}'")]
    MalformedSegment { path: String, segment: String },

    /// An intermediate segment already holds a scalar value
    #[error("Cannot write '{path}': '{segment}' is not a container")]
    Conflict { path: String, segment: String },
}

/// Main error type for transformer construction and record transformation
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Field mappings are empty")]
    EmptyFieldMap,

    #[error("Setting '{name}' cannot be empty")]
    EmptySetting { name: &'static str },

    #[error("Field mapping #{index}: source cannot be empty")]
    MissingSource { index: usize },

    #[error("Field mapping #{index} ({source_field}): destination cannot be empty")]
    MissingDestination { index: usize, source_field: String },

    #[error("Field mapping #{index} ({source_field}): type is required")]
    MissingFieldType { index: usize, source_field: String },

    #[error("Field mapping #{index} ({source_field}): nested type cannot be combined with other field types")]
    ConflictingFieldType { index: usize, source_field: String },

    #[error("Record doesn't support transformation: expected a JSON object, got {kind}")]
    UnsupportedRecord { kind: &'static str },

    #[error("Failed to get entity type from record {record}")]
    MissingEntityType { record: String },

    #[error(transparent)]
    Path(#[from] PathError),
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, TransformError>;
