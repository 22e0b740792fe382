//! Core data types shared by the resolver and the evaluation bridge.
//!
//! - [`FieldName`]: case-sensitive identifier of a model field
//! - [`DataKind`]: the model's semantic type system
//! - [`FieldSpec`]: a named, typed model field
//! - [`Value`] / [`Record`]: positional, fixed-arity record values
//! - [`RowView`]: get-by-position access to any host record

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a model-level field.
///
/// Equality and hashing are by exact (case-sensitive) value. Case-insensitive
/// matching only happens against caller-schema aliases in the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldName(String);

impl FieldName {
    /// Creates a field name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FieldName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for FieldName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Semantic type of a model field.
///
/// Only the first five members take part in compatibility checks and
/// external type formatting; the temporal kinds exist because model
/// contracts may declare them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    /// Text.
    String,
    /// Integral number.
    Integer,
    /// Single-precision floating point.
    Float,
    /// Double-precision floating point.
    Double,
    /// `true` / `false`.
    Boolean,
    /// Calendar date.
    Date,
    /// Date and time of day.
    DateTime,
}

impl DataKind {
    /// Every member, in declaration order.
    pub const ALL: [DataKind; 7] = [
        DataKind::String,
        DataKind::Integer,
        DataKind::Float,
        DataKind::Double,
        DataKind::Boolean,
        DataKind::Date,
        DataKind::DateTime,
    ];

    /// Returns the upper-case display name (e.g. `"DOUBLE"`).
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Integer => "INTEGER",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::DateTime => "DATETIME",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A field the model consumes or produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name.
    pub name: FieldName,
    /// Declared kind.
    pub kind: DataKind,
}

impl FieldSpec {
    /// Creates a new field spec.
    #[must_use]
    pub fn new(name: impl Into<FieldName>, kind: DataKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A single positional value of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing value.
    Null,
    /// UTF-8 text.
    Utf8(String),
    /// 32-bit integer.
    Int32(i32),
    /// 64-bit integer.
    Int64(i64),
    /// 32-bit float.
    Float32(f32),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Boolean(bool),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Converts the value into the canonical representation of `kind`.
    ///
    /// Canonical forms: STRING → `Utf8`, INTEGER → `Int64`, FLOAT →
    /// `Float32`, DOUBLE → `Float64`, BOOLEAN → `Boolean`. Nulls stay null.
    /// Text is parsed into the target kind. Returns `None` when the value
    /// cannot represent `kind` (unparseable text, fractional or
    /// out-of-range integers, temporal kinds).
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn cast(&self, kind: DataKind) -> Option<Value> {
        if self.is_null() {
            return Some(Value::Null);
        }
        match kind {
            DataKind::String => Some(Value::Utf8(self.to_string())),
            DataKind::Integer => match self {
                Self::Int32(v) => Some(Value::Int64(i64::from(*v))),
                Self::Int64(v) => Some(Value::Int64(*v)),
                Self::Boolean(b) => Some(Value::Int64(i64::from(*b))),
                Self::Float32(v) => integral(f64::from(*v)).map(Value::Int64),
                Self::Float64(v) => integral(*v).map(Value::Int64),
                Self::Utf8(s) => s.trim().parse::<i64>().ok().map(Value::Int64),
                Self::Null => None,
            },
            DataKind::Float => match self {
                Self::Int32(v) => Some(Value::Float32(*v as f32)),
                Self::Int64(v) => Some(Value::Float32(*v as f32)),
                Self::Float32(v) => Some(Value::Float32(*v)),
                Self::Float64(v) => Some(Value::Float32(*v as f32)),
                Self::Boolean(b) => Some(Value::Float32(if *b { 1.0 } else { 0.0 })),
                Self::Utf8(s) => s.trim().parse::<f32>().ok().map(Value::Float32),
                Self::Null => None,
            },
            DataKind::Double => match self {
                Self::Int32(v) => Some(Value::Float64(f64::from(*v))),
                Self::Int64(v) => Some(Value::Float64(*v as f64)),
                Self::Float32(v) => Some(Value::Float64(f64::from(*v))),
                Self::Float64(v) => Some(Value::Float64(*v)),
                Self::Boolean(b) => Some(Value::Float64(if *b { 1.0 } else { 0.0 })),
                Self::Utf8(s) => s.trim().parse::<f64>().ok().map(Value::Float64),
                Self::Null => None,
            },
            DataKind::Boolean => match self {
                Self::Boolean(b) => Some(Value::Boolean(*b)),
                Self::Int32(0) | Self::Int64(0) => Some(Value::Boolean(false)),
                Self::Int32(1) | Self::Int64(1) => Some(Value::Boolean(true)),
                Self::Utf8(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" => Some(Value::Boolean(true)),
                    "false" | "0" => Some(Value::Boolean(false)),
                    _ => None,
                },
                _ => None,
            },
            DataKind::Date | DataKind::DateTime => None,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn integral(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Utf8(s) => f.write_str(s),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float32(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Utf8(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Utf8(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

/// Get-by-position access to a host record.
///
/// The bridge reads incoming records only through this trait, so both
/// owned [`Record`]s and borrowed columnar rows
/// ([`BatchRow`](crate::batch::BatchRow)) can be evaluated.
pub trait RowView {
    /// Number of positions in the record.
    fn arity(&self) -> usize;

    /// Returns the value at `index`, or `None` if the position is out of
    /// range or not readable.
    fn value(&self, index: usize) -> Option<Value>;
}

/// An ordered, fixed-arity sequence of values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record(Vec<Value>);

impl Record {
    /// Creates an empty record with room for `capacity` values.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    /// Appends a value.
    pub fn push(&mut self, value: Value) {
        self.0.push(value);
    }

    /// Returns the value at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the record has no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the values in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    /// Consumes the record, returning its values.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}

impl From<Vec<Value>> for Record {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl RowView for Record {
    fn arity(&self) -> usize {
        self.0.len()
    }

    fn value(&self, index: usize) -> Option<Value> {
        self.0.get(index).cloned()
    }
}
