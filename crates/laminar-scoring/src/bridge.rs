//! Evaluation bridge between host records and a model.
//!
//! - [`evaluate`] pulls the active values out of one record through a
//!   resolved [`FieldIndexMap`], runs the model, and assembles the output
//!   record: decoded targets first, then raw auxiliary outputs, both in
//!   declared order.
//! - [`derive_output_schema`] produces the matching Arrow schema once.
//!
//! Output records and the derived schema always agree on field order.

use std::sync::Arc;

use arrow_schema::{Field, Schema, SchemaRef};
use tracing::debug;

use crate::contract::{Arguments, ModelEvaluator, ModelValue};
use crate::error::{RecordError, ScoringError, ScoringResult};
use crate::kinds::format_kind;
use crate::resolver::FieldIndexMap;
use crate::types::{DataKind, Record, RowView, Value};

/// Evaluates one record.
///
/// # Errors
///
/// - [`ScoringError::MissingFieldValue`] if `index_map` has no position for
///   an active field (the map belongs to a different contract)
/// - [`ScoringError::Record`] if the record is too short, a value does not
///   convert, or the model rejects the input; only this record is affected
pub fn evaluate<R>(
    evaluator: &dyn ModelEvaluator,
    index_map: &FieldIndexMap,
    record: &R,
) -> ScoringResult<Record>
where
    R: RowView + ?Sized,
{
    let contract = evaluator.contract();

    let mut arguments = Arguments::with_capacity(contract.active_fields.len());
    for spec in &contract.active_fields {
        let index = index_map
            .get(&spec.name)
            .ok_or_else(|| ScoringError::MissingFieldValue(spec.name.clone()))?;
        let raw = record
            .value(index)
            .ok_or_else(|| RecordError::IndexOutOfBounds {
                field: spec.name.clone(),
                index,
                arity: record.arity(),
            })?;
        let prepared = evaluator.prepare(spec, &raw)?;
        arguments.insert(spec.name.clone(), prepared);
    }

    let results = evaluator.evaluate(&arguments)?;

    let mut output = Record::with_capacity(contract.output_arity());
    for spec in &contract.target_fields {
        let value = results
            .get(&spec.name)
            .map_or(Value::Null, |v| evaluator.decode(v));
        output.push(value);
    }
    for spec in &contract.output_fields {
        let value = results
            .get(&spec.name)
            .cloned()
            .map_or(Value::Null, ModelValue::into_raw);
        output.push(value);
    }

    Ok(output)
}

/// Derives the Arrow schema of the records [`evaluate`] produces.
///
/// Undeclared output kinds are inferred from the model; an output whose
/// kind cannot be inferred is typed as text.
///
/// # Errors
///
/// Returns [`ScoringError::UnsupportedKind`] if a target or output kind has
/// no Arrow type.
pub fn derive_output_schema(evaluator: &dyn ModelEvaluator) -> ScoringResult<SchemaRef> {
    let contract = evaluator.contract();

    let mut fields = Vec::with_capacity(contract.output_arity());
    for spec in &contract.target_fields {
        fields.push(Field::new(spec.name.as_str(), format_kind(spec.kind)?, true));
    }
    for spec in &contract.output_fields {
        let kind = match spec.kind {
            Some(kind) => kind,
            None => evaluator.infer_output_kind(spec).unwrap_or_else(|err| {
                debug!(output = %spec.name, error = %err, "falling back to STRING output");
                DataKind::String
            }),
        };
        fields.push(Field::new(spec.name.as_str(), format_kind(kind)?, true));
    }

    Ok(Arc::new(Schema::new(fields)))
}
