//! Arrow `RecordBatch` adapters for the evaluation bridge.
//!
//! [`BatchReader`] exposes the rows of an input batch as [`BatchRow`]s that
//! implement [`RowView`], so the bridge reads values straight out of the
//! columns. Only the columns referenced by the [`FieldIndexMap`] are
//! downcast, once per batch.
//!
//! [`RecordBatchWriter`] is the reverse: it appends scored [`Record`]s
//! (or null rows for records that failed) and builds an output batch of
//! the derived output schema.

use std::sync::Arc;

use arrow_array::builder::{
    BooleanBuilder, Float32Builder, Float64Builder, Int32Builder, StringBuilder,
};
use arrow_array::{
    Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    RecordBatch, RecordBatchOptions, StringArray,
};
use arrow_schema::{ArrowError, DataType, SchemaRef};

use crate::error::{RecordError, ScoringError, ScoringResult};
use crate::resolver::FieldIndexMap;
use crate::types::{DataKind, FieldName, Record, RowView, Value};

/// Pre-downcast column accessor to avoid per-row `downcast_ref` overhead.
enum ColumnAccessor<'a> {
    Utf8(&'a StringArray),
    Int32(&'a Int32Array),
    Int64(&'a Int64Array),
    Float32(&'a Float32Array),
    Float64(&'a Float64Array),
    Boolean(&'a BooleanArray),
}

impl<'a> ColumnAccessor<'a> {
    fn new(column: &'a ArrayRef) -> ScoringResult<Self> {
        let any = column.as_any();
        let accessor = match column.data_type() {
            DataType::Utf8 => any.downcast_ref::<StringArray>().map(Self::Utf8),
            DataType::Int32 => any.downcast_ref::<Int32Array>().map(Self::Int32),
            DataType::Int64 => any.downcast_ref::<Int64Array>().map(Self::Int64),
            DataType::Float32 => any.downcast_ref::<Float32Array>().map(Self::Float32),
            DataType::Float64 => any.downcast_ref::<Float64Array>().map(Self::Float64),
            DataType::Boolean => any.downcast_ref::<BooleanArray>().map(Self::Boolean),
            _ => None,
        };
        accessor.ok_or_else(|| ScoringError::UnsupportedExternalType(column.data_type().clone()))
    }

    fn value(&self, row: usize) -> Value {
        match self {
            Self::Utf8(a) if a.is_valid(row) => Value::Utf8(a.value(row).to_owned()),
            Self::Int32(a) if a.is_valid(row) => Value::Int32(a.value(row)),
            Self::Int64(a) if a.is_valid(row) => Value::Int64(a.value(row)),
            Self::Float32(a) if a.is_valid(row) => Value::Float32(a.value(row)),
            Self::Float64(a) if a.is_valid(row) => Value::Float64(a.value(row)),
            Self::Boolean(a) if a.is_valid(row) => Value::Boolean(a.value(row)),
            _ => Value::Null,
        }
    }
}

/// Row-wise view over the columns of an input batch.
pub struct BatchReader<'a> {
    batch: &'a RecordBatch,
    columns: Vec<Option<ColumnAccessor<'a>>>,
}

impl<'a> BatchReader<'a> {
    /// Creates a reader for the columns referenced by `index_map`.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::UnsupportedExternalType`] if a referenced
    /// column has no model kind, or [`ScoringError::Arrow`] if a position
    /// lies outside the batch.
    pub fn new(batch: &'a RecordBatch, index_map: &FieldIndexMap) -> ScoringResult<Self> {
        let mut columns: Vec<Option<ColumnAccessor<'a>>> =
            (0..batch.num_columns()).map(|_| None).collect();

        for (field, index) in index_map.iter() {
            if index >= batch.num_columns() {
                return Err(ArrowError::InvalidArgumentError(format!(
                    "field {field} resolved to column {index}, but the batch has {} columns",
                    batch.num_columns()
                ))
                .into());
            }
            if columns[index].is_none() {
                columns[index] = Some(ColumnAccessor::new(batch.column(index))?);
            }
        }

        Ok(Self { batch, columns })
    }

    /// Returns the number of rows in the batch.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.batch.num_rows()
    }

    /// Returns a view of row `row`.
    #[must_use]
    pub fn row(&self, row: usize) -> BatchRow<'_> {
        BatchRow { reader: self, row }
    }
}

/// One row of a [`BatchReader`].
pub struct BatchRow<'r> {
    reader: &'r BatchReader<'r>,
    row: usize,
}

impl RowView for BatchRow<'_> {
    fn arity(&self) -> usize {
        self.reader.batch.num_columns()
    }

    fn value(&self, index: usize) -> Option<Value> {
        if self.row >= self.reader.row_count() {
            return None;
        }
        let accessor = self.reader.columns.get(index)?.as_ref()?;
        Some(accessor.value(self.row))
    }
}

/// A value conformed to its output column.
enum Cell {
    Null,
    Utf8(String),
    Int32(i32),
    Float32(f32),
    Float64(f64),
    Boolean(bool),
}

enum ColumnBuilder {
    Utf8(StringBuilder),
    Int32(Int32Builder),
    Float32(Float32Builder),
    Float64(Float64Builder),
    Boolean(BooleanBuilder),
}

impl ColumnBuilder {
    fn new(data_type: &DataType, capacity: usize) -> ScoringResult<Self> {
        match data_type {
            DataType::Utf8 => Ok(Self::Utf8(StringBuilder::with_capacity(capacity, capacity * 8))),
            DataType::Int32 => Ok(Self::Int32(Int32Builder::with_capacity(capacity))),
            DataType::Float32 => Ok(Self::Float32(Float32Builder::with_capacity(capacity))),
            DataType::Float64 => Ok(Self::Float64(Float64Builder::with_capacity(capacity))),
            DataType::Boolean => Ok(Self::Boolean(BooleanBuilder::with_capacity(capacity))),
            other => Err(ScoringError::UnsupportedExternalType(other.clone())),
        }
    }

    fn kind(&self) -> DataKind {
        match self {
            Self::Utf8(_) => DataKind::String,
            Self::Int32(_) => DataKind::Integer,
            Self::Float32(_) => DataKind::Float,
            Self::Float64(_) => DataKind::Double,
            Self::Boolean(_) => DataKind::Boolean,
        }
    }

    fn conform(&self, field: &str, value: &Value) -> Result<Cell, RecordError> {
        let kind = self.kind();
        let fail = || RecordError::OutputConversion {
            field: FieldName::new(field),
            kind,
        };
        match value.cast(kind).ok_or_else(fail)? {
            Value::Null => Ok(Cell::Null),
            Value::Utf8(s) => Ok(Cell::Utf8(s)),
            Value::Int64(v) => i32::try_from(v).map(Cell::Int32).map_err(|_| fail()),
            Value::Float32(v) => Ok(Cell::Float32(v)),
            Value::Float64(v) => Ok(Cell::Float64(v)),
            Value::Boolean(b) => Ok(Cell::Boolean(b)),
            Value::Int32(v) => Ok(Cell::Int32(v)),
        }
    }

    fn push(&mut self, cell: Cell) {
        match (self, cell) {
            (Self::Utf8(b), Cell::Utf8(s)) => b.append_value(s),
            (Self::Int32(b), Cell::Int32(v)) => b.append_value(v),
            (Self::Float32(b), Cell::Float32(v)) => b.append_value(v),
            (Self::Float64(b), Cell::Float64(v)) => b.append_value(v),
            (Self::Boolean(b), Cell::Boolean(v)) => b.append_value(v),
            // conform() only yields cells of the builder's own type, or Null.
            (builder, _) => builder.push_null(),
        }
    }

    fn push_null(&mut self) {
        match self {
            Self::Utf8(b) => b.append_null(),
            Self::Int32(b) => b.append_null(),
            Self::Float32(b) => b.append_null(),
            Self::Float64(b) => b.append_null(),
            Self::Boolean(b) => b.append_null(),
        }
    }

    fn finish(mut self) -> ArrayRef {
        match &mut self {
            Self::Utf8(b) => Arc::new(b.finish()) as ArrayRef,
            Self::Int32(b) => Arc::new(b.finish()) as ArrayRef,
            Self::Float32(b) => Arc::new(b.finish()) as ArrayRef,
            Self::Float64(b) => Arc::new(b.finish()) as ArrayRef,
            Self::Boolean(b) => Arc::new(b.finish()) as ArrayRef,
        }
    }
}

/// Builds an output batch from scored records.
pub struct RecordBatchWriter {
    schema: SchemaRef,
    builders: Vec<ColumnBuilder>,
    rows: usize,
}

impl RecordBatchWriter {
    /// Creates a writer for `schema` with room for `capacity` rows.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::UnsupportedExternalType`] if a column type is
    /// not one the bridge produces.
    pub fn new(schema: SchemaRef, capacity: usize) -> ScoringResult<Self> {
        let builders = schema
            .fields()
            .iter()
            .map(|f| ColumnBuilder::new(f.data_type(), capacity))
            .collect::<ScoringResult<Vec<_>>>()?;
        Ok(Self {
            schema,
            builders,
            rows: 0,
        })
    }

    /// Appends a scored record.
    ///
    /// The row is written only if every value fits its column; otherwise
    /// nothing is appended.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::OutputConversion`] for the first value that
    /// is missing or cannot be represented in its column.
    pub fn append(&mut self, record: &Record) -> Result<(), RecordError> {
        let mut cells = Vec::with_capacity(self.builders.len());
        for (i, builder) in self.builders.iter().enumerate() {
            let field = self.schema.field(i);
            let value = record.get(i).ok_or_else(|| RecordError::OutputConversion {
                field: FieldName::new(field.name().as_str()),
                kind: builder.kind(),
            })?;
            cells.push(builder.conform(field.name(), value)?);
        }

        for (builder, cell) in self.builders.iter_mut().zip(cells) {
            match cell {
                Cell::Null => builder.push_null(),
                cell => builder.push(cell),
            }
        }
        self.rows += 1;
        Ok(())
    }

    /// Appends a row of nulls.
    pub fn append_null(&mut self) {
        for builder in &mut self.builders {
            builder.push_null();
        }
        self.rows += 1;
    }

    /// Number of rows appended so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows
    }

    /// Returns `true` if no rows were appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Builds the output batch.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::Arrow`] if Arrow rejects the columns.
    pub fn finish(self) -> ScoringResult<RecordBatch> {
        let columns: Vec<ArrayRef> = self.builders.into_iter().map(ColumnBuilder::finish).collect();
        // An empty schema still carries one row per appended record.
        let options = RecordBatchOptions::new().with_row_count(Some(self.rows));
        Ok(RecordBatch::try_new_with_options(
            self.schema,
            columns,
            &options,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::cast::AsArray;
    use arrow_array::types::{Float64Type, Int32Type};
    use arrow_schema::{Field, Schema};

    fn input_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("name", DataType::Utf8, true),
            Field::new("age", DataType::Int64, true),
            Field::new("blob", DataType::Binary, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec![Some("a"), None])),
                Arc::new(Int64Array::from(vec![Some(30), Some(41)])),
                Arc::new(arrow_array::BinaryArray::from(vec![&b"x"[..], &b"y"[..]])),
            ],
        )
        .unwrap()
    }

    fn map(entries: &[(&str, usize)]) -> FieldIndexMap {
        entries
            .iter()
            .map(|(name, index)| (FieldName::new(*name), *index))
            .collect()
    }

    // ── BatchReader ────────────────────────────────────────────

    #[test]
    fn test_reader_reads_referenced_columns() {
        let batch = input_batch();
        let reader = BatchReader::new(&batch, &map(&[("Name", 0), ("Age", 1)])).unwrap();
        assert_eq!(reader.row_count(), 2);

        let row = reader.row(0);
        assert_eq!(row.arity(), 3);
        assert_eq!(row.value(0), Some(Value::from("a")));
        assert_eq!(row.value(1), Some(Value::Int64(30)));

        let row = reader.row(1);
        assert_eq!(row.value(0), Some(Value::Null));
    }

    #[test]
    fn test_reader_skips_unreferenced_columns() {
        let batch = input_batch();
        let reader = BatchReader::new(&batch, &map(&[("age", 1)])).unwrap();
        assert_eq!(reader.row(0).value(2), None);
        assert_eq!(reader.row(0).value(0), None);
        assert_eq!(reader.row(5).value(1), None);
    }

    #[test]
    fn test_reader_rejects_unsupported_referenced_column() {
        let batch = input_batch();
        let err = BatchReader::new(&batch, &map(&[("blob", 2)])).err().unwrap();
        assert!(matches!(err, ScoringError::UnsupportedExternalType(DataType::Binary)));
    }

    #[test]
    fn test_reader_rejects_out_of_range_position() {
        let batch = input_batch();
        let err = BatchReader::new(&batch, &map(&[("x", 9)])).err().unwrap();
        assert!(matches!(err, ScoringError::Arrow(_)));
    }

    // ── RecordBatchWriter ──────────────────────────────────────

    fn output_schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("score", DataType::Float64, true),
            Field::new("bucket", DataType::Int32, true),
            Field::new("label", DataType::Utf8, true),
        ]))
    }

    #[test]
    fn test_writer_conforms_values() {
        let mut writer = RecordBatchWriter::new(output_schema(), 4).unwrap();
        writer
            .append(&Record::from(vec![
                Value::Float32(1.5),
                Value::Int64(3),
                Value::Boolean(true),
            ]))
            .unwrap();
        writer.append_null();
        assert_eq!(writer.len(), 2);

        let batch = writer.finish().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.column(0).as_primitive::<Float64Type>().value(0), 1.5);
        assert_eq!(batch.column(1).as_primitive::<Int32Type>().value(0), 3);
        assert_eq!(batch.column(2).as_string::<i32>().value(0), "true");
        assert!(batch.column(0).is_null(1));
        assert!(batch.column(2).is_null(1));
    }

    #[test]
    fn test_writer_rejects_whole_row_on_bad_value() {
        let mut writer = RecordBatchWriter::new(output_schema(), 1).unwrap();
        let err = writer
            .append(&Record::from(vec![
                Value::Float64(1.0),
                Value::Int64(i64::MAX),
                Value::from("x"),
            ]))
            .unwrap_err();
        assert!(matches!(err, RecordError::OutputConversion { ref field, .. } if field.as_str() == "bucket"));
        assert!(writer.is_empty());

        let batch = writer.finish().unwrap();
        assert_eq!(batch.num_rows(), 0);
    }

    #[test]
    fn test_writer_rejects_short_record() {
        let mut writer = RecordBatchWriter::new(output_schema(), 1).unwrap();
        let err = writer.append(&Record::from(vec![Value::Float64(1.0)])).unwrap_err();
        assert!(matches!(err, RecordError::OutputConversion { .. }));
    }

    #[test]
    fn test_writer_keeps_row_count_without_columns() {
        let mut writer = RecordBatchWriter::new(Arc::new(Schema::empty()), 2).unwrap();
        writer.append(&Record::default()).unwrap();
        writer.append_null();

        let batch = writer.finish().unwrap();
        assert_eq!(batch.num_columns(), 0);
        assert_eq!(batch.num_rows(), 2);
    }

    #[test]
    fn test_writer_rejects_unsupported_schema() {
        let schema = Arc::new(Schema::new(vec![Field::new("x", DataType::Int64, true)]));
        assert!(RecordBatchWriter::new(schema, 1).is_err());
    }
}
