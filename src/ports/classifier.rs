//! Classifier port: Trait for a pre-trained multi-class model.
//!
//! This trait abstracts the model representation from the inference engine.

/// Error raised by a classifier's predict operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictError {
    #[error("Expected {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Non-finite value produced: {0}")]
    NonFinite(String),

    #[error("Prediction failed: {0}")]
    Internal(String),
}

/// A fitted classifier over a single row of features.
///
/// Implementations must be immutable after construction: `predict` takes
/// `&self` and may be called from many threads at once.
pub trait Classifier: Send + Sync {
    /// Number of input features the model was trained on.
    fn n_features(&self) -> usize;

    /// Predict the class label for one row.
    ///
    /// # Errors
    /// Returns `PredictError` if the row has the wrong shape or the model
    /// cannot produce a label.
    fn predict(&self, row: &[f64]) -> Result<i64, PredictError>;

    /// Class probabilities for one row, paired with their labels.
    ///
    /// Models without a probabilistic output return `Ok(None)`.
    ///
    /// # Errors
    /// Same conditions as [`Classifier::predict`].
    fn predict_proba(&self, row: &[f64]) -> Result<Option<Vec<(i64, f64)>>, PredictError> {
        let _ = row;
        Ok(None)
    }
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn n_features(&self) -> usize {
        (**self).n_features()
    }

    fn predict(&self, row: &[f64]) -> Result<i64, PredictError> {
        (**self).predict(row)
    }

    fn predict_proba(&self, row: &[f64]) -> Result<Option<Vec<(i64, f64)>>, PredictError> {
        (**self).predict_proba(row)
    }
}
