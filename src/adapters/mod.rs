//! Adapters layer: Concrete implementations of ports.
//!
//! - `gbdt`: gradient-boosted tree classifier loaded from a JSON artifact
//! - `manifest`: Ed25519-signed manifests binding artifacts to their digests
//! - `sanitize`: log redaction for patient data

pub mod gbdt;
pub mod manifest;
pub mod sanitize;

pub use gbdt::{GradientBoostingClassifier, LoadError};
pub use manifest::IntegrityError;
