//! Assessment features for Alzheimer's disease stage classification.
//!
//! Based on ADNI (Alzheimer's Disease Neuroimaging Initiative) baseline measures:
//! demographics, CDR, ADAS-Cog, FAQ, logical memory, MMSE and RAVLT scores.

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

/// Number of features the classifier consumes.
pub const FEATURE_COUNT: usize = 10;

/// Allowed Clinical Dementia Rating Sum of Boxes values.
const CDRSB_VALUES: [f64; 4] = [0.0, 0.5, 1.0, 2.0];

/// One input feature.
///
/// The discriminant is the column index in the training data. Reordering
/// variants changes what the classifier sees, so `ALL` is the only source of
/// truth for vector layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    /// Age in years
    Age = 0,
    /// Years of education
    PtEducat = 1,
    /// Clinical Dementia Rating, Sum of Boxes
    Cdrsb = 2,
    /// ADAS-Cog 13-item total
    Adas13 = 3,
    /// ADAS-Cog 11-item total
    Adas11 = 4,
    /// Functional Activities Questionnaire
    Faq = 5,
    /// Logical Memory delayed recall total
    LdelTotal = 6,
    /// Mini-Mental State Examination
    Mmse = 7,
    /// ADAS-Cog question 4 (delayed word recall)
    AdasQ4 = 8,
    /// Rey Auditory Verbal Learning Test, immediate recall
    RavltImmediate = 9,
}

impl Feature {
    /// Canonical training order.
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Age,
        Feature::PtEducat,
        Feature::Cdrsb,
        Feature::Adas13,
        Feature::Adas11,
        Feature::Faq,
        Feature::LdelTotal,
        Feature::Mmse,
        Feature::AdasQ4,
        Feature::RavltImmediate,
    ];

    /// Column name as it appears in raw input and in the model artifact.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Age => "AGE",
            Self::PtEducat => "PTEDUCAT",
            Self::Cdrsb => "CDRSB",
            Self::Adas13 => "ADAS13",
            Self::Adas11 => "ADAS11",
            Self::Faq => "FAQ",
            Self::LdelTotal => "LDELTOTAL",
            Self::Mmse => "MMSE",
            Self::AdasQ4 => "ADASQ4",
            Self::RavltImmediate => "RAVLT_immediate",
        }
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Age => "Age",
            Self::PtEducat => "Years of Education",
            Self::Cdrsb => "Clinical Dementia Rating Sum of Boxes",
            Self::Adas13 => "Alzheimer's Disease Assessment Scale - Cognitive Subscale 13",
            Self::Adas11 => "Alzheimer's Disease Assessment Scale - Cognitive Subscale 11",
            Self::Faq => "Functional Activities Questionnaire",
            Self::LdelTotal => "Total Learning and Delayed Recall Score",
            Self::Mmse => "Mini-Mental State Examination",
            Self::AdasQ4 => "Alzheimer's Disease Assessment Scale - Question 4",
            Self::RavltImmediate => "Rey Auditory Verbal Learning Test - Immediate Recall",
        }
    }

    /// Declared valid domain.
    #[must_use]
    pub fn domain(self) -> FeatureDomain {
        match self {
            Self::Age => FeatureDomain::Integer { min: 60, max: 90 },
            Self::PtEducat => FeatureDomain::Integer { min: 0, max: 23 },
            Self::Cdrsb => FeatureDomain::Discrete(&CDRSB_VALUES),
            Self::Adas13 | Self::Adas11 | Self::LdelTotal | Self::AdasQ4 => {
                FeatureDomain::Continuous { min: 0.0, max: 50.0 }
            }
            Self::Faq => FeatureDomain::Continuous { min: 0.0, max: 10.0 },
            Self::Mmse => FeatureDomain::Integer { min: 0, max: 30 },
            Self::RavltImmediate => FeatureDomain::Continuous { min: 0.0, max: 100.0 },
        }
    }

    /// Column index in the feature vector.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up a feature by its column name (exact match).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Closed domain of a single feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureDomain {
    /// Whole numbers in `[min, max]`
    Integer { min: i64, max: i64 },
    /// Real numbers in `[min, max]`
    Continuous { min: f64, max: f64 },
    /// One of a fixed set of values
    Discrete(&'static [f64]),
}

impl FeatureDomain {
    /// Check whether `value` belongs to this domain.
    ///
    /// Non-finite values never do.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match *self {
            Self::Integer { min, max } => {
                value.fract() == 0.0 && (min as f64..=max as f64).contains(&value)
            }
            Self::Continuous { min, max } => (min..=max).contains(&value),
            Self::Discrete(allowed) => allowed.iter().any(|&a| a == value),
        }
    }
}

impl Serialize for FeatureDomain {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match *self {
            Self::Integer { min, max } => {
                map.serialize_entry("type", "integer")?;
                map.serialize_entry("min", &min)?;
                map.serialize_entry("max", &max)?;
            }
            Self::Continuous { min, max } => {
                map.serialize_entry("type", "float")?;
                map.serialize_entry("min", &min)?;
                map.serialize_entry("max", &max)?;
            }
            Self::Discrete(allowed) => {
                map.serialize_entry("type", "enumerated")?;
                map.serialize_entry("values", allowed)?;
            }
        }
        map.end()
    }
}

/// Which validation rule was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    MissingField,
    OutOfRange,
    NotNumeric,
}

/// Raw input rejected by [`FeatureRecord::validate`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required field {field}")]
    MissingField { field: Feature },

    #[error("Field {field} value {value} is outside its valid range")]
    OutOfRange { field: Feature, value: f64 },

    #[error("Field {field} must be a number")]
    NotNumeric { field: Feature },
}

impl ValidationError {
    /// The offending field.
    #[must_use]
    pub fn field(&self) -> Feature {
        match self {
            Self::MissingField { field }
            | Self::OutOfRange { field, .. }
            | Self::NotNumeric { field } => *field,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ValidationErrorKind {
        match self {
            Self::MissingField { .. } => ValidationErrorKind::MissingField,
            Self::OutOfRange { .. } => ValidationErrorKind::OutOfRange,
            Self::NotNumeric { .. } => ValidationErrorKind::NotNumeric,
        }
    }
}

/// A complete, validated set of assessment values.
///
/// Only constructible through [`FeatureRecord::validate`], so every value is
/// present and inside its domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRecord {
    values: [f64; FEATURE_COUNT],
}

impl FeatureRecord {
    /// Validate a raw field-name → value map.
    ///
    /// Fields are checked in canonical order; the first failure is returned.
    /// Keys that are not feature names are ignored.
    ///
    /// # Errors
    /// `MissingField` if a feature is absent, `OutOfRange` if a value falls
    /// outside the feature's domain.
    pub fn validate(raw: &BTreeMap<String, f64>) -> Result<Self, ValidationError> {
        Self::check_fields(
            |feature| {
                raw.get(feature.name())
                    .copied()
                    .ok_or(ValidationError::MissingField { field: feature })
            },
            raw.keys().map(String::as_str),
        )
    }

    /// Validate a decoded JSON object.
    ///
    /// Same rules as [`FeatureRecord::validate`]. A `null` feature counts as
    /// absent. Keys that are not feature names are ignored whatever their
    /// type.
    ///
    /// # Errors
    /// As for `validate`, plus `NotNumeric` when a feature holds a string,
    /// bool, array or object.
    pub fn validate_json(raw: &Map<String, Value>) -> Result<Self, ValidationError> {
        Self::check_fields(
            |feature| match raw.get(feature.name()) {
                None | Some(Value::Null) => Err(ValidationError::MissingField { field: feature }),
                Some(value) => value
                    .as_f64()
                    .ok_or(ValidationError::NotNumeric { field: feature }),
            },
            raw.keys().map(String::as_str),
        )
    }

    fn check_fields<'a, F>(
        mut lookup: F,
        keys: impl Iterator<Item = &'a str>,
    ) -> Result<Self, ValidationError>
    where
        F: FnMut(Feature) -> Result<f64, ValidationError>,
    {
        let mut values = [0.0; FEATURE_COUNT];

        for feature in Feature::ALL {
            let value = lookup(feature)?;
            if !feature.domain().contains(value) {
                return Err(ValidationError::OutOfRange {
                    field: feature,
                    value,
                });
            }
            values[feature.index()] = value;
        }

        for key in keys.filter(|k| Feature::from_name(k).is_none()) {
            tracing::debug!("Ignoring unrecognized input field {key:?}");
        }

        Ok(Self { values })
    }

    /// Feature vector in canonical training order.
    #[must_use]
    pub fn to_vector(&self) -> [f64; FEATURE_COUNT] {
        self.values
    }

    /// Value of a single feature.
    #[must_use]
    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }
}

impl TryFrom<&BTreeMap<String, f64>> for FeatureRecord {
    type Error = ValidationError;

    fn try_from(raw: &BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        Self::validate(raw)
    }
}

impl Serialize for FeatureRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FEATURE_COUNT))?;
        for feature in Feature::ALL {
            map.serialize_entry(feature.name(), &self.get(feature))?;
        }
        map.end()
    }
}

/// Column names in canonical training order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "AGE",
    "PTEDUCAT",
    "CDRSB",
    "ADAS13",
    "ADAS11",
    "FAQ",
    "LDELTOTAL",
    "MMSE",
    "ADASQ4",
    "RAVLT_immediate",
];
