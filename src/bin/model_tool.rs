//! Model artifact utility: signing keys, manifests, inspection.
//!
//! # Usage
//!
//! ```bash
//! model_tool keygen --out-seed <path> [--out-pub <path>] [--force]
//! model_tool sign <model_dir> --key-file <path>
//! model_tool inspect <artifact_or_dir>
//! ```
//!
//! `keygen` writes the base64 Ed25519 seed with 0600 permissions and prints
//! only the public key. `sign` writes `manifest.json` (SHA-256 of
//! `knn_model.json`) and `model.sig`. `inspect` loads an artifact through the
//! same validation and integrity policy as the app.

use std::env;
use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use heartcheck::adapters::integrity::{ModelManifest, MANIFEST_FILE, SIGNATURE_FILE};
use heartcheck::adapters::knn::{KnnArtifact, KnnClassifier, ARTIFACT_FILE};
use heartcheck::config::Config;

const USAGE: &str = "Usage:
  model_tool keygen --out-seed <path> [--out-pub <path>] [--force]
  model_tool sign <model_dir> --key-file <path>
  model_tool inspect <artifact_or_dir>";

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let command = args.next().ok_or_else(|| anyhow!(USAGE))?;
    let rest: Vec<String> = args.collect();

    match command.as_str() {
        "keygen" => keygen(&rest),
        "sign" => sign(&rest),
        "inspect" => inspect(&rest),
        "-h" | "--help" => {
            println!("{USAGE}");
            Ok(())
        }
        other => bail!("Unknown command {other:?}\n{USAGE}"),
    }
}

fn flag_value(args: &[String], i: &mut usize) -> Result<PathBuf> {
    *i += 1;
    args.get(*i)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("{} expects a path\n{USAGE}", args[*i - 1]))
}

fn keygen(args: &[String]) -> Result<()> {
    let mut out_seed: Option<PathBuf> = None;
    let mut out_pub: Option<PathBuf> = None;
    let mut force = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--out-seed" => out_seed = Some(flag_value(args, &mut i)?),
            "--out-pub" => out_pub = Some(flag_value(args, &mut i)?),
            "--force" => force = true,
            other => bail!("Unknown argument {other:?}\n{USAGE}"),
        }
        i += 1;
    }
    let out_seed = out_seed.ok_or_else(|| anyhow!("--out-seed is required\n{USAGE}"))?;

    for path in std::iter::once(&out_seed).chain(out_pub.as_ref()) {
        if path.exists() && !force {
            bail!("Refusing to overwrite existing file {path:?}. Use --force.");
        }
    }

    let mut seed = Seed([0u8; 32]);
    OsRng.fill_bytes(&mut seed.0);
    let verifying_key = SigningKey::from_bytes(&seed.0).verifying_key();

    let seed_b64 = Zeroizing::new(general_purpose::STANDARD.encode(seed.0));
    write_file(&out_seed, seed_b64.as_bytes(), 0o600)?;
    println!("Wrote signing seed (base64) to {out_seed:?}");

    let pub_b64 = general_purpose::STANDARD.encode(verifying_key.as_bytes());
    if let Some(path) = &out_pub {
        write_file(path, pub_b64.as_bytes(), 0o644)?;
        println!("Wrote public key (base64) to {path:?}");
    }
    println!("PUBKEY (base64)={pub_b64}");

    Ok(())
}

fn sign(args: &[String]) -> Result<()> {
    let mut model_dir: Option<PathBuf> = None;
    let mut key_file: Option<PathBuf> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--key-file" => key_file = Some(flag_value(args, &mut i)?),
            other if other.starts_with("--") => bail!("Unknown argument {other:?}\n{USAGE}"),
            other if model_dir.is_none() => model_dir = Some(PathBuf::from(other)),
            _ => bail!(USAGE),
        }
        i += 1;
    }
    let model_dir = model_dir.ok_or_else(|| anyhow!("sign expects a model directory\n{USAGE}"))?;
    let key_file = key_file.ok_or_else(|| anyhow!("--key-file is required\n{USAGE}"))?;

    let model_dir = if model_dir.is_file() {
        model_dir
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| anyhow!("Model path has no parent directory"))?
    } else {
        model_dir
    };

    let seed = read_seed(&key_file)?;
    let signing_key = SigningKey::from_bytes(&seed.0);

    // Refuse to sign something the app would not load.
    let artifact_path = model_dir.join(ARTIFACT_FILE);
    let bytes = fs::read(&artifact_path)
        .with_context(|| format!("Failed to read {artifact_path:?}"))?;
    let artifact: KnnArtifact = serde_json::from_slice(&bytes)
        .with_context(|| format!("{artifact_path:?} is not a kNN artifact"))?;
    KnnClassifier::from_artifact(artifact).context("Artifact failed validation; not signing")?;

    let manifest = ModelManifest::for_files(
        &model_dir,
        &[ARTIFACT_FILE],
        chrono::Utc::now().timestamp(),
    )?;
    let manifest_bytes = serde_json::to_vec_pretty(&manifest)?;

    let manifest_path = model_dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, &manifest_bytes)
        .with_context(|| format!("Failed to write {manifest_path:?}"))?;

    let sig_path = model_dir.join(SIGNATURE_FILE);
    fs::write(&sig_path, signing_key.sign(&manifest_bytes).to_bytes())
        .with_context(|| format!("Failed to write {sig_path:?}"))?;

    println!("Signed manifest: {manifest_path:?}");
    println!("Wrote signature: {sig_path:?}");
    println!(
        "PUBKEY (base64)={}",
        general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes())
    );
    Ok(())
}

fn inspect(args: &[String]) -> Result<()> {
    let [path] = args else {
        bail!("inspect expects one path\n{USAGE}");
    };

    let policy = Config::from_env().integrity_policy();
    let model = KnnClassifier::load(Path::new(path), &policy)?;
    let s = model.summary();

    println!("source:       {:?}", s.source);
    if !s.description.is_empty() {
        println!("description:  {}", s.description);
    }
    println!("n_neighbors:  {}", s.n_neighbors);
    println!("weights:      {}", s.weights);
    println!("p:            {}", s.p);
    println!("samples:      {}", s.n_samples);
    println!("features:     {}", s.n_features);
    println!("classes:      {:?}", s.classes);
    println!("scaler:       {}", if s.scaled { "present" } else { "none" });
    println!("verification: {:?}", s.verification);
    Ok(())
}

fn read_seed(path: &Path) -> Result<Seed> {
    let content = Zeroizing::new(
        fs::read_to_string(path).with_context(|| format!("Failed to read key file {path:?}"))?,
    );
    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(content.trim())
            .context("Invalid base64 in signing key")?,
    );
    let bytes: [u8; 32] = raw.as_slice().try_into().map_err(|_| {
        anyhow!(
            "Signing key seed must be 32 bytes after base64 decode (got {})",
            raw.len()
        )
    })?;
    Ok(Seed(bytes))
}

fn write_file(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let mut opts = fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    opts.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = opts
        .open(path)
        .with_context(|| format!("Failed to open {path:?}"))?;
    file.write_all(contents)?;
    file.write_all(b"\n")?;
    Ok(())
}
