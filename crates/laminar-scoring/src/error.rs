//! Scoring error types.
//!
//! Errors come in two tiers:
//!
//! - [`ScoringError`] structural failures (unresolvable fields, incompatible
//!   types, missing model artifact, unsupported type tags). These are fatal
//!   to an evaluation unit: no record could ever succeed.
//! - [`RecordError`] per-record failures (a value that does not convert, a
//!   model that rejects a specific input). These affect one record only and
//!   reach callers wrapped in [`ScoringError::Record`].

use std::path::PathBuf;
use std::sync::Arc;

use arrow_schema::DataType;
use thiserror::Error;

use crate::types::{DataKind, FieldName};

/// Result alias for scoring operations.
pub type ScoringResult<T> = Result<T, ScoringError>;

/// Errors that can occur while wiring or running an evaluation unit.
#[derive(Debug, Error)]
pub enum ScoringError {
    /// A model kind has no external type tag.
    #[error("model data type {0} does not have a corresponding record data type")]
    UnsupportedKind(DataKind),

    /// An external type tag has no model kind.
    #[error("record data type {0} does not have a corresponding model data type")]
    UnsupportedExternalType(DataType),

    /// Two caller-schema aliases collapse to the same lower-case name.
    #[error("aliases '{first}' and '{second}' collide case-insensitively")]
    DuplicateAlias {
        /// The alias that was indexed first.
        first: String,
        /// The alias that collided with it.
        second: String,
    },

    /// A required model field has no matching alias in the caller schema.
    #[error("field {0} not defined")]
    UnresolvedField(FieldName),

    /// A required model field maps to a caller column of incompatible kind.
    #[error("field {field} does not support {actual} data. Must be {expected} data")]
    IncompatibleFieldType {
        /// The model field.
        field: FieldName,
        /// Kind declared by the caller schema.
        actual: DataKind,
        /// Kind required by the model.
        expected: DataKind,
    },

    /// The index map has no position for a required field.
    #[error("no record position for field {0}")]
    MissingFieldValue(FieldName),

    /// The model artifact was found neither at its path nor in the working
    /// directory.
    #[error("model file {} not found", .0.display())]
    ModelNotFound(PathBuf),

    /// The model collaborator failed to load an artifact.
    #[error("model load failed: {0}")]
    ModelLoad(String),

    /// A record was submitted before the host announced its schema.
    #[error("input schema has not been announced")]
    MissingInputSchema,

    /// The unit failed to initialize earlier; the first failure is kept.
    #[error("evaluation unit failed to initialize: {0}")]
    Initialization(#[source] Arc<ScoringError>),

    /// A single record could not be evaluated.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// I/O error while reading the model artifact.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error while reading or building batches.
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    /// Malformed JSON model definition.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScoringError {
    /// Returns `true` if the failure is confined to one record and the
    /// unit can keep processing subsequent records.
    #[must_use]
    pub fn is_record_scoped(&self) -> bool {
        matches!(self, Self::Record(_))
    }
}

/// Recoverable failures confined to a single record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    /// An input value cannot be converted into the model's representation.
    #[error("value '{value}' of field {field} cannot be converted to {kind}")]
    ValueConversion {
        /// The model field.
        field: FieldName,
        /// Rendering of the offending value.
        value: String,
        /// Kind the model expected.
        kind: DataKind,
    },

    /// The model rejected the input.
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// A model output cannot be represented in its declared output type.
    #[error("output field {field} cannot be written as {kind}")]
    OutputConversion {
        /// The output field.
        field: FieldName,
        /// Kind of the output column.
        kind: DataKind,
    },

    /// The record is shorter than the resolved position of a field.
    #[error("field {field} resolved to position {index}, but the record has {arity} values")]
    IndexOutOfBounds {
        /// The model field.
        field: FieldName,
        /// The resolved position.
        index: usize,
        /// The record's arity.
        arity: usize,
    },
}
