//! The model side of the bridge.
//!
//! A loaded model is an opaque [`ModelEvaluator`]: it declares a
//! [`ModelContract`] (active inputs, targets, auxiliary outputs), converts
//! raw record values into prepared [`FieldValue`]s, and maps prepared
//! arguments to named [`ModelValue`] outputs. [`ModelLoader`] turns a model
//! artifact on disk into an evaluator.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{RecordError, ScoringResult};
use crate::types::{DataKind, FieldName, FieldSpec, Value};

/// An auxiliary model output.
///
/// Outputs may leave their kind undeclared, in which case it is inferred
/// from the model when the output schema is derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
    /// Output name.
    pub name: FieldName,
    /// Declared kind, if any.
    #[serde(default)]
    pub kind: Option<DataKind>,
}

impl OutputSpec {
    /// Creates an output with a declared kind.
    #[must_use]
    pub fn declared(name: impl Into<FieldName>, kind: DataKind) -> Self {
        Self {
            name: name.into(),
            kind: Some(kind),
        }
    }

    /// Creates an output whose kind must be inferred.
    #[must_use]
    pub fn inferred(name: impl Into<FieldName>) -> Self {
        Self {
            name: name.into(),
            kind: None,
        }
    }
}

/// The input/output contract of one loaded model.
///
/// Field order is significant: active fields are prepared in this order,
/// and output records list targets then auxiliary outputs in declared order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelContract {
    /// Inputs the model requires.
    pub active_fields: Vec<FieldSpec>,
    /// Primary outputs.
    pub target_fields: Vec<FieldSpec>,
    /// Secondary outputs.
    pub output_fields: Vec<OutputSpec>,
}

impl ModelContract {
    /// Creates an empty contract.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an active field.
    #[must_use]
    pub fn with_active(mut self, spec: FieldSpec) -> Self {
        self.active_fields.push(spec);
        self
    }

    /// Adds a target field.
    #[must_use]
    pub fn with_target(mut self, spec: FieldSpec) -> Self {
        self.target_fields.push(spec);
        self
    }

    /// Adds an auxiliary output.
    #[must_use]
    pub fn with_output(mut self, spec: OutputSpec) -> Self {
        self.output_fields.push(spec);
        self
    }

    /// Number of values in an output record.
    #[must_use]
    pub fn output_arity(&self) -> usize {
        self.target_fields.len() + self.output_fields.len()
    }
}

/// A raw record value converted for the model.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    kind: DataKind,
    value: Value,
}

impl FieldValue {
    /// Converts `raw` into the canonical representation of `kind`.
    ///
    /// Nulls become missing values. Numeric values widen, and text is
    /// parsed into the target kind.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::ValueConversion`] if the value cannot
    /// represent `kind`.
    pub fn prepare(field: &FieldName, kind: DataKind, raw: &Value) -> Result<Self, RecordError> {
        let value = raw.cast(kind).ok_or_else(|| RecordError::ValueConversion {
            field: field.clone(),
            value: raw.to_string(),
            kind,
        })?;
        Ok(Self { kind, value })
    }

    /// The kind this value was prepared for.
    #[must_use]
    pub fn kind(&self) -> DataKind {
        self.kind
    }

    /// The prepared value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns `true` if the input was null.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.value.is_null()
    }

    /// Numeric view of the value, if it has one.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self.value {
            Value::Int32(v) => Some(f64::from(v)),
            Value::Int64(v) => Some(v as f64),
            Value::Float32(v) => Some(f64::from(v)),
            Value::Float64(v) => Some(v),
            Value::Boolean(b) => Some(if b { 1.0 } else { 0.0 }),
            Value::Utf8(_) | Value::Null => None,
        }
    }
}

/// A value produced by the model.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelValue {
    /// A plain value.
    Plain(Value),
    /// A classification result with per-category probabilities.
    Classified {
        /// Winning category.
        label: Value,
        /// Probability of each category.
        probabilities: Vec<(String, f64)>,
    },
}

impl ModelValue {
    /// Reduces the model value to its external-facing result.
    #[must_use]
    pub fn decode(&self) -> Value {
        match self {
            Self::Plain(v) => v.clone(),
            Self::Classified { label, .. } => label.clone(),
        }
    }

    /// Converts the model value into a record value without decoding.
    ///
    /// Classification results are rendered as text so their probabilities
    /// survive.
    #[must_use]
    pub fn into_raw(self) -> Value {
        match self {
            Self::Plain(v) => v,
            Self::Classified { .. } => Value::Utf8(self.to_string()),
        }
    }
}

impl fmt::Display for ModelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(v) => write!(f, "{v}"),
            Self::Classified {
                label,
                probabilities,
            } => {
                write!(f, "{label} {{")?;
                for (i, (category, p)) in probabilities.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{category}={p}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Prepared model arguments, keyed by active field name.
pub type Arguments = HashMap<FieldName, FieldValue>;

/// Model results, keyed by target or output name.
pub type Outputs = HashMap<FieldName, ModelValue>;

/// The model could not determine the kind of an undeclared output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("type analysis failed for output {field}: {reason}")]
pub struct TypeAnalysisError {
    /// The output field.
    pub field: FieldName,
    /// Why analysis failed.
    pub reason: String,
}

/// A loaded, ready-to-evaluate model.
///
/// Implementations must be immutable once loaded; the bridge calls them
/// from a single worker at a time but may share them behind an [`Arc`].
pub trait ModelEvaluator: Send + Sync + fmt::Debug {
    /// The model's input/output contract.
    fn contract(&self) -> &ModelContract;

    /// Converts a raw record value for the active field `field`.
    ///
    /// # Errors
    ///
    /// Returns a [`RecordError`] if the value cannot be converted.
    fn prepare(&self, field: &FieldSpec, raw: &Value) -> Result<FieldValue, RecordError> {
        FieldValue::prepare(&field.name, field.kind, raw)
    }

    /// Evaluates the model.
    ///
    /// # Errors
    ///
    /// Returns a [`RecordError`] if the model rejects these arguments.
    fn evaluate(&self, arguments: &Arguments) -> Result<Outputs, RecordError>;

    /// Converts a target result into its external-facing value.
    fn decode(&self, value: &ModelValue) -> Value {
        value.decode()
    }

    /// Infers the kind of an output that declares none.
    ///
    /// # Errors
    ///
    /// Returns [`TypeAnalysisError`] if the kind cannot be determined.
    fn infer_output_kind(&self, output: &OutputSpec) -> Result<DataKind, TypeAnalysisError>;
}

/// Loads a model artifact into a [`ModelEvaluator`].
pub trait ModelLoader: Send + Sync {
    /// Loads the model at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`ScoringError`](crate::error::ScoringError) if the
    /// artifact cannot be read or understood.
    fn load(&self, path: &Path) -> ScoringResult<Arc<dyn ModelEvaluator>>;
}

impl<F> ModelLoader for F
where
    F: Fn(&Path) -> ScoringResult<Arc<dyn ModelEvaluator>> + Send + Sync,
{
    fn load(&self, path: &Path) -> ScoringResult<Arc<dyn ModelEvaluator>> {
        self(path)
    }
}
