//! Inference engine: Orchestrates classification of a validated record.
//!
//! The pipeline per request is:
//! 1. Assemble the feature vector in canonical order
//! 2. Run the classifier on that single row
//! 3. Map the label to a diagnostic category
//!
//! The engine holds no mutable state. One instance is built at startup and
//! shared (by reference or `Arc`) with every request handler.

use std::path::Path;
use std::sync::Arc;

use crate::adapters::{GradientBoostingClassifier, LoadError};
use crate::config::Settings;
use crate::domain::{Diagnosis, DiagnosticResult, FeatureRecord, FEATURE_COUNT};
use crate::ports::{Classifier, PredictError};

/// Per-request classification failure. The engine remains usable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("Classifier returned unknown label {label}")]
    UnknownLabel { label: i64 },

    #[error("Classifier prediction failed: {0}")]
    PredictFailure(#[from] PredictError),
}

/// Service wrapping one loaded classifier.
pub struct InferenceEngine<C: Classifier> {
    classifier: Arc<C>,
    fingerprint: Option<String>,
}

impl<C: Classifier> Clone for InferenceEngine<C> {
    fn clone(&self) -> Self {
        Self {
            classifier: Arc::clone(&self.classifier),
            fingerprint: self.fingerprint.clone(),
        }
    }
}

impl InferenceEngine<GradientBoostingClassifier> {
    /// Load the gradient boosting artifact at `model_path` with default settings.
    ///
    /// # Errors
    /// Returns `LoadError` if the artifact is missing, unreadable, malformed or
    /// incompatible.
    pub fn load(model_path: impl AsRef<Path>) -> Result<Self, LoadError> {
        Self::load_with(model_path, &Settings::default())
    }

    /// Load with explicit integrity settings.
    ///
    /// # Errors
    /// As [`InferenceEngine::load`], plus `LoadError::Integrity` when the
    /// signed manifest does not verify or is required but absent.
    pub fn load_with(model_path: impl AsRef<Path>, settings: &Settings) -> Result<Self, LoadError> {
        tracing::info!("Initializing inference engine...");
        let classifier = GradientBoostingClassifier::load(model_path.as_ref(), settings)?;
        let fingerprint = classifier.fingerprint().map(str::to_owned);
        Ok(Self {
            classifier: Arc::new(classifier),
            fingerprint,
        })
    }
}

impl<C: Classifier> InferenceEngine<C> {
    /// Wrap an already-constructed classifier.
    #[must_use]
    pub fn new(classifier: C) -> Self {
        Self::from_shared(Arc::new(classifier))
    }

    #[must_use]
    pub fn from_shared(classifier: Arc<C>) -> Self {
        if classifier.n_features() != FEATURE_COUNT {
            // predict will report the mismatch per request
            tracing::warn!(
                "Classifier expects {} features, records provide {FEATURE_COUNT}",
                classifier.n_features()
            );
        }
        Self {
            classifier,
            fingerprint: None,
        }
    }

    #[must_use]
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// SHA-256 of the loaded artifact, if the engine was loaded from disk.
    #[must_use]
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    /// Classify one record.
    ///
    /// # Errors
    /// `PredictFailure` if the classifier fails, `UnknownLabel` if it returns a
    /// label outside the three diagnostic categories.
    pub fn classify(&self, record: &FeatureRecord) -> Result<DiagnosticResult, InferenceError> {
        let row = record.to_vector();

        let label = self.classifier.predict(&row).map_err(|e| {
            tracing::warn!("Prediction failed: {e}");
            InferenceError::PredictFailure(e)
        })?;

        let result = DiagnosticResult::from_label(label).ok_or_else(|| {
            tracing::warn!("Classifier returned unknown label {label}");
            InferenceError::UnknownLabel { label }
        })?;

        tracing::debug!("Classified record as code {}", result.code());
        Ok(result)
    }

    /// Classify and build a full diagnosis report.
    ///
    /// Probabilities are attached when the classifier provides them for all
    /// three categories.
    ///
    /// # Errors
    /// Same as [`InferenceEngine::classify`].
    pub fn assess(&self, record: &FeatureRecord) -> Result<Diagnosis, InferenceError> {
        let result = self.classify(record)?;

        let mut diagnosis = Diagnosis::new(result);
        diagnosis.model_fingerprint = self.fingerprint.clone();
        diagnosis.probabilities = self
            .classifier
            .predict_proba(&record.to_vector())?
            .and_then(|pairs| by_code(&pairs));

        tracing::info!(
            "Diagnosis complete: code={}, severity={}",
            diagnosis.result.code(),
            diagnosis.result.severity()
        );
        Ok(diagnosis)
    }
}

/// Reorder `(label, probability)` pairs by diagnostic code.
///
/// Returns `None` unless each of the three codes appears exactly once.
fn by_code(pairs: &[(i64, f64)]) -> Option<[f64; 3]> {
    if pairs.len() != 3 {
        return None;
    }
    let mut out = [None; 3];
    for &(label, p) in pairs {
        let code = usize::from(DiagnosticResult::from_label(label)?.code());
        if out[code].replace(p).is_some() {
            return None;
        }
    }
    Some([out[0]?, out[1]?, out[2]?])
}
