//! The evaluation unit: one model bound to one caller schema.
//!
//! A [`ScoringUnit`] is created per worker slot and initializes lazily on
//! its first record or schema query:
//!
//! ```text
//! Uninitialized ──first use──► Ready   (model loaded, fields resolved,
//!        │                             output schema derived)
//!        └───────failure─────► Failed  (terminal; every later call returns
//!                                       the same error)
//! ```
//!
//! Methods take `&mut self`, so a unit is driven by one caller at a time
//! and initialization runs exactly once. Separate units share nothing and
//! may initialize independently.

use std::fmt;
use std::sync::Arc;

use arrow_array::RecordBatch;
use arrow_schema::{ArrowError, DataType, Field, Schema, SchemaRef};
use tracing::{debug, info, warn};

use crate::batch::{BatchReader, RecordBatchWriter};
use crate::bridge;
use crate::config::ScoringConfig;
use crate::contract::{ModelEvaluator, ModelLoader};
use crate::error::{ScoringError, ScoringResult};
use crate::resolver::{FieldIndexMap, FieldResolver};
use crate::types::{Record, RowView};

/// Lifecycle state of a [`ScoringUnit`], as reported by
/// [`ScoringUnit::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    /// No record or schema query has been made yet.
    Uninitialized,
    /// The model is loaded and resolved.
    Ready,
    /// Initialization failed; the unit cannot score.
    Failed,
}

/// Counters for records processed by a unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitStats {
    /// Records that produced an output.
    pub records_scored: u64,
    /// Records that failed individually.
    pub records_failed: u64,
}

struct Ready {
    evaluator: Arc<dyn ModelEvaluator>,
    input_schema: SchemaRef,
    index_map: FieldIndexMap,
    output_schema: SchemaRef,
}

enum UnitState {
    Uninitialized,
    Ready(Ready),
    Failed(Arc<ScoringError>),
}

/// Scores records against one model.
pub struct ScoringUnit {
    config: ScoringConfig,
    loader: Arc<dyn ModelLoader>,
    input_schema: Option<SchemaRef>,
    state: UnitState,
    stats: UnitStats,
}

impl fmt::Debug for ScoringUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoringUnit")
            .field("config", &self.config)
            .field("status", &self.status())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl ScoringUnit {
    /// Creates an uninitialized unit. Nothing is loaded until first use.
    pub fn new(config: ScoringConfig, loader: impl ModelLoader + 'static) -> Self {
        Self {
            config,
            loader: Arc::new(loader),
            input_schema: None,
            state: UnitState::Uninitialized,
            stats: UnitStats::default(),
        }
    }

    /// Records the caller schema announced by the host.
    ///
    /// Has no effect once the unit has initialized: the schema it resolved
    /// against stays in force for the unit's lifetime.
    pub fn set_input_schema(&mut self, schema: SchemaRef) {
        if matches!(self.state, UnitState::Uninitialized) {
            self.input_schema = Some(schema);
        } else {
            warn!("input schema announced after initialization; ignoring");
        }
    }

    /// The unit's configuration.
    #[must_use]
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn status(&self) -> UnitStatus {
        match self.state {
            UnitState::Uninitialized => UnitStatus::Uninitialized,
            UnitState::Ready(_) => UnitStatus::Ready,
            UnitState::Failed(_) => UnitStatus::Failed,
        }
    }

    /// Record counters.
    #[must_use]
    pub fn stats(&self) -> UnitStats {
        self.stats
    }

    /// Returns the schema the host declares downstream: a single nullable
    /// struct column named [`output_name`](ScoringConfig::output_name)
    /// holding the model's targets then auxiliary outputs.
    ///
    /// Initializes the unit against `input_schema` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::Initialization`] if the unit cannot
    /// initialize or failed to earlier.
    pub fn output_schema(&mut self, input_schema: &SchemaRef) -> ScoringResult<SchemaRef> {
        let name = self.config.output_name.clone();
        let ready = self.ensure_ready(Some(input_schema))?;
        let column = Field::new(
            name,
            DataType::Struct(ready.output_schema.fields().clone()),
            true,
        );
        Ok(Arc::new(Schema::new(vec![column])))
    }

    /// Returns the flat schema of the records this unit produces.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::Initialization`] if the unit cannot
    /// initialize (including when no input schema was announced).
    pub fn output_fields(&mut self) -> ScoringResult<SchemaRef> {
        let ready = self.ensure_ready(None)?;
        Ok(Arc::clone(&ready.output_schema))
    }

    /// Scores one record.
    ///
    /// Returns `Ok(None)` if the record failed on its own (a value did not
    /// convert or the model rejected it) and
    /// [`null_on_record_error`](ScoringConfig::null_on_record_error) is set.
    ///
    /// # Errors
    ///
    /// - [`ScoringError::Initialization`] if the unit cannot initialize
    /// - [`ScoringError::Record`] for per-record failures when nulling is
    ///   disabled; the unit stays usable
    /// - [`ScoringError::MissingFieldValue`] if the resolved index is
    ///   inconsistent with the model
    pub fn exec<R>(&mut self, record: &R) -> ScoringResult<Option<Record>>
    where
        R: RowView + ?Sized,
    {
        let null_on_error = self.config.null_on_record_error;
        let ready = self.ensure_ready(None)?;
        let outcome = bridge::evaluate(ready.evaluator.as_ref(), &ready.index_map, record);

        match outcome {
            Ok(output) => {
                self.stats.records_scored += 1;
                Ok(Some(output))
            }
            Err(err) if err.is_record_scoped() => {
                self.stats.records_failed += 1;
                if null_on_error {
                    warn!(error = %err, "record evaluation failed; output is null");
                    Ok(None)
                } else {
                    Err(err)
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Scores every row of `batch` and returns a batch of the flat output
    /// schema with one row per input row. Rows that fail on their own are
    /// written as nulls when
    /// [`null_on_record_error`](ScoringConfig::null_on_record_error) is set.
    ///
    /// If no input schema was announced, the batch's schema is used;
    /// otherwise the batch must match the announced schema.
    ///
    /// # Errors
    ///
    /// - [`ScoringError::Initialization`] if the unit cannot initialize
    /// - [`ScoringError::Arrow`] if the batch layout differs from the
    ///   schema the unit resolved against
    /// - [`ScoringError::Record`] for the first per-record failure when
    ///   nulling is disabled
    pub fn exec_batch(&mut self, batch: &RecordBatch) -> ScoringResult<RecordBatch> {
        let null_on_error = self.config.null_on_record_error;
        let batch_schema = batch.schema();
        let announced = self
            .input_schema
            .clone()
            .unwrap_or_else(|| Arc::clone(&batch_schema));
        let ready = self.ensure_ready(Some(&announced))?;

        if !same_layout(&ready.input_schema, &batch_schema) {
            return Err(ArrowError::SchemaError(
                "batch schema does not match the resolved input schema".into(),
            )
            .into());
        }

        let reader = BatchReader::new(batch, &ready.index_map)?;
        let mut writer =
            RecordBatchWriter::new(Arc::clone(&ready.output_schema), reader.row_count())?;

        let mut stats = UnitStats::default();
        for row in 0..reader.row_count() {
            let outcome = bridge::evaluate(
                ready.evaluator.as_ref(),
                &ready.index_map,
                &reader.row(row),
            )
            .and_then(|record| writer.append(&record).map_err(ScoringError::from));

            match outcome {
                Ok(()) => stats.records_scored += 1,
                Err(err) if err.is_record_scoped() && null_on_error => {
                    debug!(row, error = %err, "row evaluation failed; output is null");
                    stats.records_failed += 1;
                    writer.append_null();
                }
                Err(err) => {
                    if err.is_record_scoped() {
                        stats.records_failed += 1;
                    }
                    self.stats.records_scored += stats.records_scored;
                    self.stats.records_failed += stats.records_failed;
                    return Err(err);
                }
            }
        }

        if stats.records_failed > 0 {
            warn!(
                rows = reader.row_count(),
                failed = stats.records_failed,
                "batch rows failed evaluation; outputs are null"
            );
        }
        self.stats.records_scored += stats.records_scored;
        self.stats.records_failed += stats.records_failed;
        writer.finish()
    }

    fn ensure_ready(&mut self, announced: Option<&SchemaRef>) -> ScoringResult<&Ready> {
        if matches!(self.state, UnitState::Uninitialized) {
            let result = match announced.or(self.input_schema.as_ref()) {
                Some(schema) => self.initialize(schema),
                None => Err(ScoringError::MissingInputSchema),
            };
            self.state = match result {
                Ok(ready) => UnitState::Ready(ready),
                Err(err) => {
                    warn!(
                        model = %self.config.model_path.display(),
                        error = %err,
                        "evaluation unit failed to initialize"
                    );
                    UnitState::Failed(Arc::new(err))
                }
            };
        }

        match &self.state {
            UnitState::Ready(ready) => Ok(ready),
            UnitState::Failed(err) => Err(ScoringError::Initialization(Arc::clone(err))),
            UnitState::Uninitialized => Err(ScoringError::MissingInputSchema),
        }
    }

    fn initialize(&self, input_schema: &SchemaRef) -> ScoringResult<Ready> {
        let path = self.config.resolve_model_path()?;
        let evaluator = self.loader.load(&path)?;

        let contract = evaluator.contract();
        let index_map = FieldResolver::new(self.config.alias_collision)
            .resolve(&contract.active_fields, input_schema)?;
        let output_schema = bridge::derive_output_schema(evaluator.as_ref())?;

        info!(
            model = %path.display(),
            active = contract.active_fields.len(),
            targets = contract.target_fields.len(),
            outputs = contract.output_fields.len(),
            "evaluation unit ready"
        );

        Ok(Ready {
            evaluator,
            input_schema: Arc::clone(input_schema),
            index_map,
            output_schema,
        })
    }
}

/// Same column names and types, in the same order.
fn same_layout(a: &Schema, b: &Schema) -> bool {
    a.fields().len() == b.fields().len()
        && a
            .fields()
            .iter()
            .zip(b.fields().iter())
            .all(|(x, y)| x.name() == y.name() && x.data_type() == y.data_type())
}
