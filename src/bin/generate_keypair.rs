//! Ed25519 keypair generation for classifier artifact signing.
//!
//! Writes the base64 signing seed (0600 on Unix) and optionally the base64
//! public key, which is what `NEURODX_MODEL_PUBKEY_B64` expects.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin generate_keypair -- --out-seed <path> [--out-pub <path>] [--force]
//! ```

use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use clap::Parser;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

#[derive(Parser)]
#[command(name = "generate_keypair", about = "Generate an artifact signing keypair")]
struct Args {
    /// Where to write the base64 signing seed
    #[arg(long)]
    out_seed: PathBuf,

    /// Where to write the base64 public key
    #[arg(long)]
    out_pub: Option<PathBuf>,

    /// Overwrite existing files
    #[arg(long)]
    force: bool,
}

fn write_line(path: &Path, contents: &str, mode: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let mut opts = std::fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        opts.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = opts
        .open(path)
        .with_context(|| format!("Failed to open {path:?}"))?;
    file.write_all(contents.as_bytes())?;
    file.write_all(b"\n")?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    for path in std::iter::once(&args.out_seed).chain(args.out_pub.as_ref()) {
        if path.exists() && !args.force {
            bail!("Refusing to overwrite existing file {path:?}. Use --force.");
        }
    }

    let mut seed = [0u8; 32];
    OsRng.fill_bytes(&mut seed);

    let signing_key = SigningKey::from_bytes(&seed);
    let seed_b64 = Zeroizing::new(general_purpose::STANDARD.encode(seed));
    seed.zeroize();

    let pub_b64 = general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes());

    write_line(&args.out_seed, &seed_b64, 0o600)?;
    println!("Wrote signing seed (base64) to {:?}", args.out_seed);

    if let Some(pub_path) = &args.out_pub {
        // Public key is non-secret.
        write_line(pub_path, &pub_b64, 0o644)?;
        println!("Wrote public key (base64) to {pub_path:?}");
    }

    println!("NEURODX_MODEL_PUBKEY_B64={pub_b64}");
    Ok(())
}
