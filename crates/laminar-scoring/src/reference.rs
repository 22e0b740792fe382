//! A JSON-described linear regression model.
//!
//! Small enough to read at a glance, but it exercises every seam of the
//! bridge: typed active fields, a numeric target, auxiliary outputs with
//! declared, inferable and non-inferable kinds, and per-record rejections.
//!
//! ```json
//! {
//!   "active": [{"name": "x", "kind": "double"}],
//!   "target": {"name": "Score", "kind": "double"},
//!   "intercept": 0.5,
//!   "coefficients": {"x": 2.0},
//!   "outputs": [
//!     {"name": "predicted", "feature": "predicted"},
//!     {"name": "high", "feature": "exceeds", "threshold": 10.0},
//!     {"name": "sign", "feature": "sign_label"}
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::contract::{
    Arguments, ModelContract, ModelEvaluator, ModelLoader, ModelValue, OutputSpec, Outputs,
    TypeAnalysisError,
};
use crate::error::{RecordError, ScoringError, ScoringResult};
use crate::types::{DataKind, FieldName, FieldSpec, Value};

/// What an auxiliary output reports.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "feature", rename_all = "snake_case")]
enum OutputFeature {
    /// The target value again. Kind: the target's.
    Predicted,
    /// Whether the prediction exceeds a threshold. Kind: BOOLEAN.
    Exceeds { threshold: f64 },
    /// `"negative"`, `"zero"` or `"positive"`. Kind cannot be inferred.
    SignLabel,
}

#[derive(Debug, Clone, Deserialize)]
struct OutputDef {
    name: FieldName,
    #[serde(default)]
    kind: Option<DataKind>,
    #[serde(flatten)]
    feature: OutputFeature,
}

#[derive(Debug, Deserialize)]
struct RegressionDef {
    active: Vec<FieldSpec>,
    target: FieldSpec,
    #[serde(default)]
    intercept: f64,
    #[serde(default)]
    coefficients: HashMap<FieldName, f64>,
    #[serde(default)]
    outputs: Vec<OutputDef>,
}

fn is_numeric(kind: DataKind) -> bool {
    matches!(
        kind,
        DataKind::Integer | DataKind::Float | DataKind::Double | DataKind::Boolean
    )
}

/// `target = intercept + Σ coefficient · input`.
#[derive(Debug)]
pub struct RegressionModel {
    contract: ModelContract,
    intercept: f64,
    terms: Vec<(FieldName, f64)>,
    outputs: Vec<OutputDef>,
}

impl RegressionModel {
    /// Parses a model definition.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::Json`] for malformed JSON, or
    /// [`ScoringError::ModelLoad`] if the definition is inconsistent (a
    /// non-numeric target, a coefficient for an unknown or non-numeric
    /// field, an output name used twice).
    pub fn from_json(json: &str) -> ScoringResult<Self> {
        let def: RegressionDef = serde_json::from_str(json)?;
        Self::from_def(def)
    }

    fn from_def(def: RegressionDef) -> ScoringResult<Self> {
        if !matches!(
            def.target.kind,
            DataKind::Integer | DataKind::Float | DataKind::Double
        ) {
            return Err(ScoringError::ModelLoad(format!(
                "regression target {} must be numeric, not {}",
                def.target.name, def.target.kind
            )));
        }

        let mut terms = Vec::with_capacity(def.coefficients.len());
        for spec in &def.active {
            if let Some(&coefficient) = def.coefficients.get(&spec.name) {
                if !is_numeric(spec.kind) {
                    return Err(ScoringError::ModelLoad(format!(
                        "field {} of kind {} cannot carry a coefficient",
                        spec.name, spec.kind
                    )));
                }
                terms.push((spec.name.clone(), coefficient));
            }
        }
        if let Some(unknown) = def
            .coefficients
            .keys()
            .find(|name| !def.active.iter().any(|spec| &spec.name == *name))
        {
            return Err(ScoringError::ModelLoad(format!(
                "coefficient for undeclared field {unknown}"
            )));
        }

        for (i, output) in def.outputs.iter().enumerate() {
            let taken = output.name == def.target.name
                || def.outputs[..i].iter().any(|o| o.name == output.name);
            if taken {
                return Err(ScoringError::ModelLoad(format!(
                    "output {} is declared more than once",
                    output.name
                )));
            }
        }

        let mut contract = ModelContract::new().with_target(def.target);
        contract.active_fields = def.active;
        contract.output_fields = def
            .outputs
            .iter()
            .map(|o| OutputSpec {
                name: o.name.clone(),
                kind: o.kind,
            })
            .collect();

        Ok(Self {
            contract,
            intercept: def.intercept,
            terms,
            outputs: def.outputs,
        })
    }

    #[allow(clippy::cast_possible_truncation)]
    fn target_value(&self, y: f64) -> Value {
        match self.contract.target_fields[0].kind {
            DataKind::Float => Value::Float32(y as f32),
            DataKind::Integer => Value::Int64(y.round() as i64),
            _ => Value::Float64(y),
        }
    }
}

impl ModelEvaluator for RegressionModel {
    fn contract(&self) -> &ModelContract {
        &self.contract
    }

    fn evaluate(&self, arguments: &Arguments) -> Result<Outputs, RecordError> {
        let mut y = self.intercept;
        for (name, coefficient) in &self.terms {
            let x = arguments
                .get(name)
                .and_then(crate::contract::FieldValue::as_f64)
                .ok_or_else(|| RecordError::Evaluation(format!("missing value for field {name}")))?;
            y += coefficient * x;
        }
        if !y.is_finite() {
            return Err(RecordError::Evaluation(format!("prediction is not finite: {y}")));
        }

        let target = self.target_value(y);
        let mut outputs = Outputs::with_capacity(1 + self.outputs.len());
        for def in &self.outputs {
            let value = match &def.feature {
                OutputFeature::Predicted => target.clone(),
                OutputFeature::Exceeds { threshold } => Value::Boolean(y > *threshold),
                OutputFeature::SignLabel => Value::from(if y < 0.0 {
                    "negative"
                } else if y > 0.0 {
                    "positive"
                } else {
                    "zero"
                }),
            };
            outputs.insert(def.name.clone(), ModelValue::Plain(value));
        }
        outputs.insert(
            self.contract.target_fields[0].name.clone(),
            ModelValue::Plain(target),
        );
        Ok(outputs)
    }

    fn infer_output_kind(&self, output: &OutputSpec) -> Result<DataKind, TypeAnalysisError> {
        let def = self
            .outputs
            .iter()
            .find(|d| d.name == output.name)
            .ok_or_else(|| TypeAnalysisError {
                field: output.name.clone(),
                reason: "not an output of this model".into(),
            })?;
        match def.feature {
            OutputFeature::Predicted => Ok(self.contract.target_fields[0].kind),
            OutputFeature::Exceeds { .. } => Ok(DataKind::Boolean),
            OutputFeature::SignLabel => Err(TypeAnalysisError {
                field: output.name.clone(),
                reason: "label outputs have no analyzable type".into(),
            }),
        }
    }
}

/// Loads [`RegressionModel`]s from JSON files.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonModelLoader;

impl ModelLoader for JsonModelLoader {
    fn load(&self, path: &Path) -> ScoringResult<Arc<dyn ModelEvaluator>> {
        let json = std::fs::read_to_string(path)?;
        let model = RegressionModel::from_json(&json)?;
        debug!(
            path = %path.display(),
            terms = model.terms.len(),
            "loaded regression model"
        );
        Ok(Arc::new(model))
    }
}
