//! Model signing utility for NeuroDx classifier artifacts.
//!
//! Writes `manifest.json` (SHA-256 of the artifact) and an Ed25519 signature
//! `model.sig` next to the artifact, so the loader can verify it at startup.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin sign_model -- models/classifier.json
//! ```
//!
//! The base64 signing seed is read from, in order:
//! `NEURODX_MODEL_SIGNING_KEY_B64_FILE`, the docker secret
//! `/run/secrets/neurodx_model_signing_key_b64`, or (debug builds only)
//! `NEURODX_MODEL_SIGNING_KEY_B64`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use clap::Parser;
use ed25519_dalek::{Signature, Signer, SigningKey};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use neurodx::adapters::manifest::{SignedModelManifest, MANIFEST_FILE, SIGNATURE_FILE};

const KEY_FILE_ENV: &str = "NEURODX_MODEL_SIGNING_KEY_B64_FILE";
const KEY_ENV: &str = "NEURODX_MODEL_SIGNING_KEY_B64";
const DOCKER_SECRET_PATH: &str = "/run/secrets/neurodx_model_signing_key_b64";

#[derive(Parser)]
#[command(name = "sign_model", about = "Sign a classifier artifact")]
struct Args {
    /// Classifier artifact to bind (e.g. models/classifier.json)
    artifact: PathBuf,
}

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

fn read_secret_file(path: &Path) -> Result<Zeroizing<String>> {
    let content = Zeroizing::new(
        fs::read_to_string(path).with_context(|| format!("reading signing key {path:?}"))?,
    );
    let secret = content.trim_end_matches(['\n', '\r']).to_string();
    if secret.is_empty() {
        bail!("Empty signing key");
    }
    Ok(Zeroizing::new(secret))
}

fn read_signing_seed_b64() -> Result<Zeroizing<String>> {
    if let Ok(path) = std::env::var(KEY_FILE_ENV) {
        return read_secret_file(Path::new(path.trim()));
    }

    if Path::new(DOCKER_SECRET_PATH).exists() {
        return read_secret_file(Path::new(DOCKER_SECRET_PATH));
    }

    // Dev-only fallback.
    if cfg!(debug_assertions) {
        if let Ok(v) = std::env::var(KEY_ENV) {
            return Ok(Zeroizing::new(v.trim().to_string()));
        }
    }

    bail!(
        "Missing signing key. Provide {KEY_FILE_ENV} or {DOCKER_SECRET_PATH} \
         ({KEY_ENV} is accepted in debug builds only)."
    )
}

fn read_signing_seed() -> Result<Seed> {
    let b64 = read_signing_seed_b64()?;
    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(b64.trim())
            .context("Invalid base64 in signing key")?,
    );
    if raw.len() != 32 {
        bail!(
            "Signing key seed must be 32 bytes after base64 decode (got {})",
            raw.len()
        );
    }

    let mut seed = [0u8; 32];
    seed.copy_from_slice(&raw);
    Ok(Seed(seed))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let file_name = args
        .artifact
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{:?} is not a file path", args.artifact))?
        .to_string();
    let dir = args
        .artifact
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let artifact_bytes =
        fs::read(&args.artifact).with_context(|| format!("reading {:?}", args.artifact))?;

    let seed = read_signing_seed()?;
    let signing_key = SigningKey::from_bytes(&seed.0);
    drop(seed);

    let manifest = SignedModelManifest::for_files(
        [(file_name.as_str(), artifact_bytes.as_slice())],
        chrono::Utc::now().timestamp(),
    );
    let manifest_bytes = serde_json::to_vec_pretty(&manifest)?;

    let manifest_path = dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, &manifest_bytes)
        .with_context(|| format!("writing {manifest_path:?}"))?;

    let signature: Signature = signing_key.sign(&manifest_bytes);
    let sig_path = dir.join(SIGNATURE_FILE);
    fs::write(&sig_path, signature.to_bytes()).with_context(|| format!("writing {sig_path:?}"))?;

    println!("Signed manifest: {manifest_path:?}");
    println!("Wrote signature: {sig_path:?}");
    println!(
        "NEURODX_MODEL_PUBKEY_B64={}",
        general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes())
    );

    Ok(())
}
