//! # NeuroDx
//!
//! Alzheimer's disease stage classification from clinical and cognitive
//! assessment scores.
//!
//! This crate provides:
//! - Validation of the ten ADNI-style assessment features
//! - A gradient-boosted tree classifier loaded from a (optionally signed) JSON artifact
//! - Mapping of the predicted label to Healthy / MCI / Demented
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (FeatureRecord, DiagnosticResult, Diagnosis)
//! - `ports`: The `Classifier` trait
//! - `adapters`: Concrete implementations (gradient boosting, manifest verification, log sanitization)
//! - `application`: The `InferenceEngine` orchestrating domain and ports
//! - `config`: Environment-driven settings
//!
//! ## Example
//!
//! ```no_run
//! use std::collections::BTreeMap;
//! use neurodx::{FeatureRecord, InferenceEngine};
//!
//! let engine = InferenceEngine::load("models/classifier.json")?;
//! let raw: BTreeMap<String, f64> = serde_json::from_str(
//!     r#"{"AGE": 74, "PTEDUCAT": 16, "CDRSB": 0.5, "ADAS13": 14.33, "ADAS11": 8.67,
//!         "FAQ": 2, "LDELTOTAL": 7, "MMSE": 27, "ADASQ4": 5, "RAVLT_immediate": 35}"#,
//! )?;
//! let record = FeatureRecord::validate(&raw)?;
//! let result = engine.classify(&record)?;
//! println!("{} ({})", result.label(), result.severity());
//! # Ok::<(), neurodx::NeuroDxError>(())
//! ```

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use adapters::LoadError;
pub use application::{InferenceEngine, InferenceError};
pub use domain::{Diagnosis, DiagnosticResult, Feature, FeatureRecord, Severity, ValidationError};

/// Result type for NeuroDx operations
pub type Result<T> = std::result::Result<T, NeuroDxError>;

/// Main error type for NeuroDx
///
/// Messages name the failure family only; the cause is the error `source`.
#[derive(Debug, thiserror::Error)]
pub enum NeuroDxError {
    #[error("Invalid input")]
    Validation(#[from] ValidationError),

    #[error("Model load failed")]
    Load(#[from] LoadError),

    #[error("Inference failed")]
    Inference(#[from] InferenceError),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Serialization error")]
    Serialization(#[from] serde_json::Error),
}
