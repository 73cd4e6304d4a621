//! Diagnosis result types.
//!
//! Represents the output of the Alzheimer's disease stage classifier.

use serde::{Deserialize, Serialize};

/// Presentation severity of a diagnostic category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Informational,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Informational => write!(f, "INFORMATIONAL"),
            Self::Warning => write!(f, "WARNING"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Diagnostic category predicted by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticResult {
    /// Cognitively normal
    Healthy,
    /// Mild cognitive impairment
    MildCognitiveImpairment,
    /// Alzheimer's disease dementia
    Demented,
}

impl DiagnosticResult {
    pub const ALL: [DiagnosticResult; 3] = [
        DiagnosticResult::Healthy,
        DiagnosticResult::MildCognitiveImpairment,
        DiagnosticResult::Demented,
    ];

    /// Map a classifier label to a category.
    ///
    /// Returns `None` for anything outside the three trained classes.
    #[must_use]
    pub fn from_label(label: i64) -> Option<Self> {
        match label {
            0 => Some(Self::Healthy),
            1 => Some(Self::MildCognitiveImpairment),
            2 => Some(Self::Demented),
            _ => None,
        }
    }

    /// Machine code (the classifier label).
    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            Self::Healthy => 0,
            Self::MildCognitiveImpairment => 1,
            Self::Demented => 2,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Healthy => "Healthy (no sign of Alzheimer's disease)",
            Self::MildCognitiveImpairment => "Mild Cognitive Impairment",
            Self::Demented => "Demented (Alzheimer's Disease)",
        }
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::Healthy => Severity::Informational,
            Self::MildCognitiveImpairment => Severity::Warning,
            Self::Demented => Severity::Critical,
        }
    }
}

impl std::fmt::Display for DiagnosticResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Wire form: `{"code": 1, "label": "...", "tier": "warning"}`.
#[derive(Serialize, Deserialize)]
struct DiagnosticResultRepr {
    code: u8,
    label: String,
    tier: Severity,
}

impl Serialize for DiagnosticResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DiagnosticResultRepr {
            code: self.code(),
            label: self.label().to_string(),
            tier: self.severity(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DiagnosticResult {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = DiagnosticResultRepr::deserialize(deserializer)?;
        Self::from_label(i64::from(repr.code)).ok_or_else(|| {
            serde::de::Error::custom(format!("unknown diagnostic code {}", repr.code))
        })
    }
}

/// Complete diagnosis record including metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    /// Unique identifier
    pub id: String,

    /// Predicted category
    pub result: DiagnosticResult,

    /// Per-class probabilities indexed by code, when the classifier provides them
    pub probabilities: Option<[f64; 3]>,

    /// SHA-256 of the model artifact that produced this result
    pub model_fingerprint: Option<String>,

    /// Timestamp of diagnosis
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Diagnosis {
    #[must_use]
    pub fn new(result: DiagnosticResult) -> Self {
        Self {
            id: uuid_v4(),
            result,
            probabilities: None,
            model_fingerprint: None,
            created_at: chrono::Utc::now(),
        }
    }

    /// Probability the classifier assigned to the predicted category.
    #[must_use]
    pub fn confidence(&self) -> Option<f64> {
        self.probabilities
            .map(|p| p[usize::from(self.result.code())])
    }
}

/// Generate a random UUID v4 string.
///
/// Uses ChaCha20Rng seeded from OS entropy.
fn uuid_v4() -> String {
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    let mut rng = ChaCha20Rng::from_entropy();
    let bytes: [u8; 16] = rng.gen();

    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        (bytes[6] & 0x0f) | 0x40, bytes[7],
        (bytes[8] & 0x3f) | 0x80, bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_mapping() {
        let healthy = DiagnosticResult::from_label(0).expect("known label");
        assert_eq!(healthy.code(), 0);
        assert!(healthy.label().starts_with("Healthy"));
        assert_eq!(healthy.severity(), Severity::Informational);

        let mci = DiagnosticResult::from_label(1).expect("known label");
        assert_eq!(mci.code(), 1);
        assert_eq!(mci.label(), "Mild Cognitive Impairment");
        assert_eq!(mci.severity(), Severity::Warning);

        let demented = DiagnosticResult::from_label(2).expect("known label");
        assert_eq!(demented.code(), 2);
        assert!(demented.label().starts_with("Demented"));
        assert_eq!(demented.severity(), Severity::Critical);
    }

    #[test]
    fn test_unknown_labels() {
        for label in [-1, 3, 7, i64::MAX] {
            assert!(DiagnosticResult::from_label(label).is_none());
        }
    }

    #[test]
    fn test_code_roundtrips_through_label() {
        for result in DiagnosticResult::ALL {
            assert_eq!(
                DiagnosticResult::from_label(i64::from(result.code())),
                Some(result)
            );
        }
    }

    #[test]
    fn test_result_wire_format() {
        let json = serde_json::to_value(DiagnosticResult::MildCognitiveImpairment)
            .expect("serialize");
        assert_eq!(json["code"], 1);
        assert_eq!(json["label"], "Mild Cognitive Impairment");
        assert_eq!(json["tier"], "warning");

        let bad = serde_json::json!({"code": 9, "label": "x", "tier": "critical"});
        assert!(serde_json::from_value::<DiagnosticResult>(bad).is_err());
    }

    #[test]
    fn test_diagnosis_confidence() {
        let mut diagnosis = Diagnosis::new(DiagnosticResult::Demented);
        assert!(diagnosis.confidence().is_none());

        diagnosis.probabilities = Some([0.1, 0.2, 0.7]);
        assert!((diagnosis.confidence().expect("set") - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_uuid_generation() {
        let id1 = uuid_v4();
        let id2 = uuid_v4();
        assert_ne!(id1, id2);
        assert_eq!(id1.len(), 36);
        assert_eq!(&id1[14..15], "4");
    }
}
