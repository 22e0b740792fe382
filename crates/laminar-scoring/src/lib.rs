//! # `LaminarDB` Scoring
//!
//! Scores host records against a predictive model.
//!
//! A [`ScoringUnit`] loads a model definition lazily, resolves each of the
//! model's active fields to a column of the caller's schema by
//! case-insensitive name, and evaluates records one at a time or a whole
//! Arrow [`RecordBatch`](arrow_array::RecordBatch) at once. Output records
//! hold the model's targets followed by its auxiliary outputs, matching
//! the schema derived at initialization.
//!
//! Model formats plug in through [`ModelLoader`] and [`ModelEvaluator`];
//! [`reference`] ships a JSON linear regression model.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

/// Columnar reading and writing of Arrow record batches
pub mod batch;

/// Per-record evaluation and output schema derivation
pub mod bridge;

/// Evaluation unit configuration
pub mod config;

/// Model contract and the evaluator/loader seams
pub mod contract;

/// Error types
pub mod error;

/// Mapping between model kinds and Arrow types
pub mod kinds;

/// JSON linear regression model
pub mod reference;

/// Name-based binding of active fields to caller columns
pub mod resolver;

/// Field names, data kinds, values and records
pub mod types;

/// The lazily initialized evaluation unit
pub mod unit;

pub use config::ScoringConfig;
pub use contract::{ModelContract, ModelEvaluator, ModelLoader, OutputSpec};
pub use error::{RecordError, ScoringError, ScoringResult};
pub use reference::{JsonModelLoader, RegressionModel};
pub use resolver::{AliasCollision, FieldIndexMap, FieldResolver};
pub use types::{DataKind, FieldName, FieldSpec, Record, RowView, Value};
pub use unit::{ScoringUnit, UnitStats, UnitStatus};
