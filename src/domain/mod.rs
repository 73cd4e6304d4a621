//! Domain layer: Core business types and logic.
//!
//! Pure types with strict validation; no I/O.

mod diagnosis;
mod features;

pub use diagnosis::{Diagnosis, DiagnosticResult, Severity};
pub use features::{
    Feature, FeatureDomain, FeatureRecord, ValidationError, ValidationErrorKind, FEATURE_COUNT,
    FEATURE_NAMES,
};

#[cfg(test)]
pub(crate) use features::tests::{boundary_input, typical_input};
