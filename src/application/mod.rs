//! Application layer: Use cases and services.
//!
//! Orchestrates domain types and the classifier port into the
//! validate → vectorize → predict → map pipeline.

mod engine;

pub use engine::{InferenceEngine, InferenceError};
