//! Gradient-boosted tree adapter: Implementation of `Classifier`.
//!
//! Loads a multi-class gradient boosting ensemble exported by the training
//! pipeline as JSON. Each boosting stage holds one regression tree per class;
//! the raw score of class `k` is `init_scores[k] + learning_rate * Σ tree_k(x)`
//! and the predicted label is the class with the highest raw score.
//!
//! # Compatibility
//!
//! An artifact is only accepted if it declares exactly the ten assessment
//! features in canonical training order. A model trained on a different column
//! order would silently mispredict, so the check happens at load time rather
//! than being left to the caller.

mod tree;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use tree::{Node, Tree};

use super::manifest::{self, IntegrityError, Verification};
use crate::config::Settings;
use crate::domain::{FEATURE_COUNT, FEATURE_NAMES};
use crate::ports::{Classifier, PredictError};

/// File name looked up when the model path is a directory.
pub const DEFAULT_ARTIFACT_FILE: &str = "classifier.json";

const FORMAT_VERSION: u32 = 1;

/// Error raised while loading a classifier artifact.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Model artifact not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read model artifact {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed model artifact {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Incompatible model artifact: {0}")]
    Incompatible(String),

    #[error("Model integrity check failed: {0}")]
    Integrity(#[from] IntegrityError),
}

/// Ensemble parameters exported by the training pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedEnsemble {
    pub format_version: u32,
    pub feature_names: Vec<String>,
    /// Class label for each output column
    pub classes: Vec<i64>,
    pub learning_rate: f64,
    pub init_scores: Vec<f64>,
    /// Boosting stages; each holds one tree per class
    pub estimators: Vec<Vec<Tree>>,
}

impl ExportedEnsemble {
    fn check(&self) -> Result<(), String> {
        if self.format_version != FORMAT_VERSION {
            return Err(format!(
                "unsupported format_version {}",
                self.format_version
            ));
        }
        if self.feature_names.len() != FEATURE_COUNT
            || self
                .feature_names
                .iter()
                .zip(FEATURE_NAMES)
                .any(|(got, want)| got != want)
        {
            return Err(format!(
                "feature_names must be {FEATURE_NAMES:?}, got {:?}",
                self.feature_names
            ));
        }

        let n_classes = self.classes.len();
        if n_classes < 2 {
            return Err(format!("need at least 2 classes, got {n_classes}"));
        }
        let mut sorted = self.classes.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != n_classes {
            return Err("duplicate class labels".into());
        }
        if self.init_scores.len() != n_classes {
            return Err(format!(
                "init_scores has {} entries, expected {n_classes}",
                self.init_scores.len()
            ));
        }
        if !self.learning_rate.is_finite() || self.init_scores.iter().any(|s| !s.is_finite()) {
            return Err("learning_rate and init_scores must be finite".into());
        }

        for (stage, trees) in self.estimators.iter().enumerate() {
            if trees.len() != n_classes {
                return Err(format!(
                    "stage {stage} has {} trees, expected {n_classes}",
                    trees.len()
                ));
            }
            for (k, tree) in trees.iter().enumerate() {
                tree.check(FEATURE_COUNT)
                    .map_err(|e| format!("stage {stage} class {k}: {e}"))?;
            }
        }

        Ok(())
    }
}

/// Multi-class gradient boosting classifier.
///
/// Immutable after construction and safe to share between threads.
#[derive(Debug, Clone)]
pub struct GradientBoostingClassifier {
    model: ExportedEnsemble,
    fingerprint: Option<String>,
}

impl GradientBoostingClassifier {
    /// Wrap already-parsed ensemble parameters.
    ///
    /// # Errors
    /// Returns `LoadError::Incompatible` if the ensemble is not a well-formed
    /// model over the ten assessment features.
    pub fn from_ensemble(model: ExportedEnsemble) -> Result<Self, LoadError> {
        model.check().map_err(LoadError::Incompatible)?;
        Ok(Self {
            model,
            fingerprint: None,
        })
    }

    /// Load an artifact from `path` (a file, or a directory containing
    /// `classifier.json`).
    ///
    /// # Errors
    /// Returns `LoadError` if the file is missing or unreadable, fails
    /// integrity verification, is not valid JSON, or is structurally
    /// incompatible.
    pub fn load(path: &Path, settings: &Settings) -> Result<Self, LoadError> {
        let artifact_path = if path.is_dir() {
            path.join(DEFAULT_ARTIFACT_FILE)
        } else {
            path.to_path_buf()
        };

        if !artifact_path.exists() {
            return Err(LoadError::NotFound {
                path: artifact_path,
            });
        }

        let bytes = std::fs::read(&artifact_path).map_err(|source| LoadError::Unreadable {
            path: artifact_path.clone(),
            source,
        })?;

        match manifest::verify_artifact(&artifact_path, &bytes, settings)? {
            Verification::Signed { created_at } => {
                tracing::debug!("Artifact manifest created_at={created_at}");
            }
            Verification::Unsigned => {}
        }

        let model: ExportedEnsemble =
            serde_json::from_slice(&bytes).map_err(|source| LoadError::Malformed {
                path: artifact_path.clone(),
                source,
            })?;

        let mut classifier = Self::from_ensemble(model)?;
        classifier.fingerprint = Some(manifest::sha256_hex(&bytes));

        tracing::info!(
            "Loaded classifier from {:?} (classes={:?}, stages={}, learning_rate={})",
            artifact_path,
            classifier.model.classes,
            classifier.model.estimators.len(),
            classifier.model.learning_rate
        );

        Ok(classifier)
    }

    /// SHA-256 of the artifact bytes, when loaded from disk.
    #[must_use]
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    #[must_use]
    pub fn classes(&self) -> &[i64] {
        &self.model.classes
    }

    /// Raw (pre-softmax) score per class.
    ///
    /// # Errors
    /// Returns `PredictError` on shape mismatch or non-finite input/output.
    pub fn raw_scores(&self, row: &[f64]) -> Result<Vec<f64>, PredictError> {
        if row.len() != FEATURE_COUNT {
            return Err(PredictError::ShapeMismatch {
                expected: FEATURE_COUNT,
                actual: row.len(),
            });
        }
        if let Some(i) = row.iter().position(|v| !v.is_finite()) {
            return Err(PredictError::NonFinite(format!("input column {i}")));
        }

        let mut scores = self.model.init_scores.clone();
        for (stage, trees) in self.model.estimators.iter().enumerate() {
            for (k, tree) in trees.iter().enumerate() {
                let leaf = tree.eval(row).ok_or_else(|| {
                    PredictError::Internal(format!("stage {stage} class {k}: malformed tree"))
                })?;
                scores[k] += self.model.learning_rate * leaf;
            }
        }

        if scores.iter().any(|s| !s.is_finite()) {
            return Err(PredictError::NonFinite("class score".into()));
        }
        Ok(scores)
    }
}

impl Classifier for GradientBoostingClassifier {
    fn n_features(&self) -> usize {
        self.model.feature_names.len()
    }

    fn predict(&self, row: &[f64]) -> Result<i64, PredictError> {
        let scores = self.raw_scores(row)?;
        // first maximum wins on ties
        let best = scores
            .iter()
            .enumerate()
            .fold(0, |best, (i, s)| if *s > scores[best] { i } else { best });
        Ok(self.model.classes[best])
    }

    fn predict_proba(&self, row: &[f64]) -> Result<Option<Vec<(i64, f64)>>, PredictError> {
        let scores = self.raw_scores(row)?;
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
        let total: f64 = exp.iter().sum();

        Ok(Some(
            self.model
                .classes
                .iter()
                .zip(exp)
                .map(|(&label, e)| (label, e / total))
                .collect(),
        ))
    }
}
