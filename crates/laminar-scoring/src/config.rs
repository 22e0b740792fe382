//! Configuration for an evaluation unit.

use std::path::{Path, PathBuf};

use crate::error::{ScoringError, ScoringResult};
use crate::resolver::AliasCollision;

/// Configuration for a [`ScoringUnit`](crate::unit::ScoringUnit).
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Path of the model-definition file.
    ///
    /// If the path does not exist when the unit initializes, a file with
    /// the same name is looked up in [`working_dir`](Self::working_dir),
    /// where the host stages distributed files.
    pub model_path: PathBuf,
    /// Directory holding staged files (`None` = process working directory).
    pub working_dir: Option<PathBuf>,
    /// Treatment of caller aliases that differ only in case.
    pub alias_collision: AliasCollision,
    /// Name of the tuple-valued column announced to the host.
    /// Default: `"score"`.
    pub output_name: String,
    /// Whether per-record failures produce an absent output instead of an
    /// error. Default: `true`.
    pub null_on_record_error: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::new(),
            working_dir: None,
            alias_collision: AliasCollision::FailFast,
            output_name: "score".to_owned(),
            null_on_record_error: true,
        }
    }
}

impl ScoringConfig {
    /// Creates a configuration for the model at `model_path`.
    #[must_use]
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            ..Self::default()
        }
    }

    /// Sets the staging directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Sets the alias collision policy.
    #[must_use]
    pub fn with_alias_collision(mut self, collision: AliasCollision) -> Self {
        self.alias_collision = collision;
        self
    }

    /// Sets the output column name.
    #[must_use]
    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }

    /// Sets whether per-record failures are nulled out.
    #[must_use]
    pub fn with_null_on_record_error(mut self, enabled: bool) -> Self {
        self.null_on_record_error = enabled;
        self
    }

    /// Checks, on the submitting side, that the model file exists locally.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::ModelNotFound`] if it does not.
    pub fn validate(&self) -> ScoringResult<()> {
        if self.model_path.exists() {
            Ok(())
        } else {
            Err(ScoringError::ModelNotFound(self.model_path.clone()))
        }
    }

    /// Files the host must distribute to workers: the absolute model path.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::Io`] if the current directory is needed to
    /// absolutize a relative path and cannot be read.
    pub fn ship_files(&self) -> ScoringResult<Vec<PathBuf>> {
        let path = if self.model_path.is_absolute() {
            self.model_path.clone()
        } else {
            std::env::current_dir()?.join(&self.model_path)
        };
        Ok(vec![path])
    }

    /// Locates the model file.
    ///
    /// Uses [`model_path`](Self::model_path) if it exists, otherwise the
    /// same-named file in the staging directory.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::ModelNotFound`] if neither exists.
    pub fn resolve_model_path(&self) -> ScoringResult<PathBuf> {
        if self.model_path.exists() {
            return Ok(self.model_path.clone());
        }

        let staged = self.model_path.file_name().map(|name| match &self.working_dir {
            Some(dir) => dir.join(name),
            None => Path::new(name).to_path_buf(),
        });
        match staged {
            Some(path) if path.exists() => Ok(path),
            _ => Err(ScoringError::ModelNotFound(self.model_path.clone())),
        }
    }
}
