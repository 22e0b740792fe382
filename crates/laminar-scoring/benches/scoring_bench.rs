//! Scoring throughput benchmarks
//!
//! Measures per-record and columnar scoring of a linear regression model.
//!
//! Run with: cargo bench --bench scoring_bench

use std::hint::black_box;
use std::sync::Arc;

use arrow_array::{ArrayRef, Float64Array, Int32Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use laminar_scoring::{
    ModelEvaluator, Record, RegressionModel, ScoringConfig, ScoringResult, ScoringUnit, Value,
};

const MODEL: &str = r#"{
    "active": [
        {"name": "a", "kind": "double"},
        {"name": "b", "kind": "integer"},
        {"name": "c", "kind": "double"}
    ],
    "target": {"name": "y", "kind": "double"},
    "intercept": 1.0,
    "coefficients": {"a": 0.5, "b": -2.0, "c": 3.0},
    "outputs": [{"name": "high", "feature": "exceeds", "threshold": 0.0}]
}"#;

fn schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("A", DataType::Float64, true),
        Field::new("B", DataType::Int32, true),
        Field::new("C", DataType::Float64, true),
    ]))
}

/// Builds a unit whose loader parses the model from memory.
fn unit() -> ScoringUnit {
    // The path only has to exist; the loader ignores it.
    let config = ScoringConfig::new(std::env::temp_dir());
    let loader = |_: &std::path::Path| -> ScoringResult<Arc<dyn ModelEvaluator>> {
        Ok(Arc::new(RegressionModel::from_json(MODEL)?))
    };
    let mut unit = ScoringUnit::new(config, loader);
    unit.set_input_schema(schema());
    unit
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn make_batch(rows: usize) -> RecordBatch {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            (0..rows).map(|i| format!("row-{i}")),
        )),
        Arc::new(Float64Array::from_iter_values((0..rows).map(|i| i as f64 * 0.1))),
        Arc::new(Int32Array::from_iter_values((0..rows).map(|i| (i % 7) as i32))),
        Arc::new(Float64Array::from_iter_values((0..rows).map(|i| (i % 13) as f64))),
    ];
    RecordBatch::try_new(schema(), columns).unwrap()
}

fn bench_exec(c: &mut Criterion) {
    let mut unit = unit();
    let record = Record::from(vec![
        Value::from("row-0"),
        Value::Float64(1.5),
        Value::Int32(3),
        Value::Float64(0.25),
    ]);

    c.bench_function("exec_single_record", |b| {
        b.iter(|| black_box(unit.exec(black_box(&record)).unwrap()));
    });
}

fn bench_exec_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("exec_batch");
    for rows in [64, 1024, 8192] {
        let mut unit = unit();
        let batch = make_batch(rows);
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &batch, |b, batch| {
            b.iter(|| black_box(unit.exec_batch(black_box(batch)).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_exec, bench_exec_batch);
criterion_main!(benches);
