//! Signed model manifests.
//!
//! A model directory may carry `manifest.json` (SHA-256 digests of the files it
//! binds) and `model.sig` (a detached Ed25519 signature over the manifest
//! bytes). When present, the artifact is only accepted if the signature
//! verifies against the configured public key and the manifest binds the
//! artifact's exact bytes.

use std::collections::BTreeMap;
use std::path::Path;

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::Settings;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "model.sig";

const MANIFEST_VERSION: u32 = 1;

/// Error raised while verifying a model artifact.
#[derive(Debug, thiserror::Error)]
pub enum IntegrityError {
    #[error("signed manifest required but {0} not found")]
    Unsigned(&'static str),

    #[error("manifest present but {SIGNATURE_FILE} is missing")]
    MissingSignature,

    #[error("manifest present but no trusted public key is configured")]
    NoTrustedKey,

    #[error("invalid trusted public key: {0}")]
    InvalidKey(String),

    #[error("invalid signature file: {0}")]
    InvalidSignature(String),

    #[error("manifest signature does not verify")]
    BadSignature,

    #[error("invalid manifest: {0}")]
    Malformed(String),

    #[error("unsupported manifest version {0}")]
    UnsupportedVersion(u32),

    #[error("manifest does not bind {0}")]
    Unbound(String),

    #[error("digest mismatch for {0}")]
    DigestMismatch(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Manifest binding artifact file names to their SHA-256 digests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedModelManifest {
    pub version: u32,
    /// Unix timestamp (seconds) when the manifest was created
    pub created_at: i64,
    pub files: BTreeMap<String, String>,
}

impl SignedModelManifest {
    /// Build a manifest for the given `(file name, contents)` pairs.
    #[must_use]
    pub fn for_files<'a, I>(files: I, created_at: i64) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [u8])>,
    {
        Self {
            version: MANIFEST_VERSION,
            created_at,
            files: files
                .into_iter()
                .map(|(name, bytes)| (name.to_string(), sha256_hex(bytes)))
                .collect(),
        }
    }
}

/// Outcome of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Manifest signature and digest checked
    Signed { created_at: i64 },
    /// No manifest present and none required
    Unsigned,
}

/// Lowercase hex SHA-256.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn constant_time_eq_str(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn read(path: &Path) -> Result<Vec<u8>, IntegrityError> {
    std::fs::read(path).map_err(|source| IntegrityError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn trusted_key(b64: &str) -> Result<VerifyingKey, IntegrityError> {
    let raw = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|e| IntegrityError::InvalidKey(e.to_string()))?;
    let bytes: [u8; 32] = raw
        .as_slice()
        .try_into()
        .map_err(|_| IntegrityError::InvalidKey(format!("expected 32 bytes, got {}", raw.len())))?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| IntegrityError::InvalidKey(e.to_string()))
}

/// Whether an artifact without a manifest may load.
///
/// Release builds always require a signed manifest; the opt-out exists only
/// in debug builds.
#[cfg(debug_assertions)]
fn unsigned_allowed(settings: &Settings) -> bool {
    !settings.require_signed_model
}

#[cfg(not(debug_assertions))]
fn unsigned_allowed(_settings: &Settings) -> bool {
    false
}

/// Verify `artifact_bytes` (read from `artifact_path`) against the manifest in
/// the same directory.
///
/// # Errors
/// Returns `IntegrityError` if a manifest is present but does not check out,
/// or if none is present and unsigned artifacts are not allowed (release
/// builds, or `settings.require_signed_model`).
pub fn verify_artifact(
    artifact_path: &Path,
    artifact_bytes: &[u8],
    settings: &Settings,
) -> Result<Verification, IntegrityError> {
    let dir = artifact_path.parent().unwrap_or_else(|| Path::new("."));
    let manifest_path = dir.join(MANIFEST_FILE);
    let sig_path = dir.join(SIGNATURE_FILE);

    if !manifest_path.exists() {
        if !unsigned_allowed(settings) {
            tracing::error!("No {MANIFEST_FILE} next to {:?}", artifact_path);
            return Err(IntegrityError::Unsigned(MANIFEST_FILE));
        }
        tracing::warn!("Loading UNSIGNED model artifact {:?}", artifact_path);
        return Ok(Verification::Unsigned);
    }
    if !sig_path.exists() {
        return Err(IntegrityError::MissingSignature);
    }

    let key_b64 = settings
        .model_pubkey_b64
        .as_deref()
        .ok_or(IntegrityError::NoTrustedKey)?;
    let public_key = trusted_key(key_b64)?;

    let sig_bytes = read(&sig_path)?;
    let signature = Signature::from_bytes(
        sig_bytes
            .as_slice()
            .try_into()
            .map_err(|_| IntegrityError::InvalidSignature("expected 64 bytes".into()))?,
    );

    let manifest_bytes = read(&manifest_path)?;
    public_key
        .verify(&manifest_bytes, &signature)
        .map_err(|_| IntegrityError::BadSignature)?;

    let manifest: SignedModelManifest = serde_json::from_slice(&manifest_bytes)
        .map_err(|e| IntegrityError::Malformed(e.to_string()))?;
    if manifest.version != MANIFEST_VERSION {
        return Err(IntegrityError::UnsupportedVersion(manifest.version));
    }

    let file_name = artifact_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| IntegrityError::Unbound(artifact_path.display().to_string()))?;
    let expected = manifest
        .files
        .get(file_name)
        .ok_or_else(|| IntegrityError::Unbound(file_name.to_string()))?;
    if !constant_time_eq_str(&expected.to_ascii_lowercase(), &sha256_hex(artifact_bytes)) {
        return Err(IntegrityError::DigestMismatch(file_name.to_string()));
    }

    tracing::info!("Model manifest signature and digest verified");
    Ok(Verification::Signed {
        created_at: manifest.created_at,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use tempfile::tempdir;

    pub(crate) fn test_signing_key() -> SigningKey {
        SigningKey::generate(&mut rand::rngs::OsRng)
    }

    pub(crate) fn pubkey_b64(key: &SigningKey) -> String {
        base64::engine::general_purpose::STANDARD.encode(key.verifying_key().to_bytes())
    }

    pub(crate) fn write_signed_manifest(dir: &Path, key: &SigningKey, files: &[(&str, &[u8])]) {
        let manifest = SignedModelManifest::for_files(files.iter().copied(), 1_700_000_000);
        let bytes = serde_json::to_vec_pretty(&manifest).expect("serialize manifest");
        std::fs::write(dir.join(MANIFEST_FILE), &bytes).expect("write manifest");
        let signature: Signature = key.sign(&bytes);
        std::fs::write(dir.join(SIGNATURE_FILE), signature.to_bytes()).expect("write sig");
    }

    fn settings_with_key(key: &SigningKey) -> Settings {
        Settings {
            model_pubkey_b64: Some(pubkey_b64(key)),
            ..Settings::default()
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    fn test_unsigned_allowed_by_default() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("classifier.json");
        let result = verify_artifact(&path, b"{}", &Settings::default()).expect("unsigned ok");
        assert_eq!(result, Verification::Unsigned);
    }

    #[test]
    fn test_unsigned_rejected_when_required() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("classifier.json");
        let settings = Settings {
            require_signed_model: true,
            ..Settings::default()
        };
        let err = verify_artifact(&path, b"{}", &settings).expect_err("must fail");
        assert!(matches!(err, IntegrityError::Unsigned(_)));
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_release_build_rejects_unsigned() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("classifier.json");
        let err = verify_artifact(&path, b"{}", &Settings::default()).expect_err("must fail");
        assert!(matches!(err, IntegrityError::Unsigned(_)));
    }

    #[test]
    fn test_signed_manifest_verifies() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("classifier.json");
        let key = test_signing_key();
        write_signed_manifest(temp.path(), &key, &[("classifier.json", b"model-bytes".as_slice())]);

        let result =
            verify_artifact(&path, b"model-bytes", &settings_with_key(&key)).expect("verifies");
        assert_eq!(
            result,
            Verification::Signed {
                created_at: 1_700_000_000
            }
        );
    }

    #[test]
    fn test_tampered_artifact_rejected() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("classifier.json");
        let key = test_signing_key();
        write_signed_manifest(temp.path(), &key, &[("classifier.json", b"model-bytes".as_slice())]);

        let err = verify_artifact(&path, b"model-bytes!", &settings_with_key(&key))
            .expect_err("must fail");
        assert!(matches!(err, IntegrityError::DigestMismatch(_)));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("classifier.json");
        let key = test_signing_key();
        write_signed_manifest(temp.path(), &key, &[("classifier.json", b"model-bytes".as_slice())]);

        let other = test_signing_key();
        let err = verify_artifact(&path, b"model-bytes", &settings_with_key(&other))
            .expect_err("must fail");
        assert!(matches!(err, IntegrityError::BadSignature));
    }

    #[test]
    fn test_manifest_must_bind_artifact() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("classifier.json");
        let key = test_signing_key();
        write_signed_manifest(temp.path(), &key, &[("other.json", b"model-bytes".as_slice())]);

        let err = verify_artifact(&path, b"model-bytes", &settings_with_key(&key))
            .expect_err("must fail");
        assert!(matches!(err, IntegrityError::Unbound(name) if name == "classifier.json"));
    }

    #[test]
    fn test_manifest_without_key_or_signature() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("classifier.json");
        let key = test_signing_key();
        write_signed_manifest(temp.path(), &key, &[("classifier.json", b"model-bytes".as_slice())]);

        let err = verify_artifact(&path, b"model-bytes", &Settings::default())
            .expect_err("must fail");
        assert!(matches!(err, IntegrityError::NoTrustedKey));

        std::fs::remove_file(temp.path().join(SIGNATURE_FILE)).expect("remove sig");
        let err = verify_artifact(&path, b"model-bytes", &settings_with_key(&key))
            .expect_err("must fail");
        assert!(matches!(err, IntegrityError::MissingSignature));
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
