//! Model artifact integrity: SHA-256 manifest and Ed25519 signature.
//!
//! Layout next to the artifact:
//! - `manifest.json`: `{ "version": 1, "created_at": <unix secs>, "files": { name: sha256_hex } }`
//! - `model.sig`: 64-byte Ed25519 signature over the exact manifest bytes
//!
//! Both are produced by `model_tool sign`. The verifying key is never embedded
//! in the binary; it is read from the file named by
//! `HEARTCHECK_MODEL_PUBKEY_B64_FILE`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Manifest file name.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Detached signature file name.
pub const SIGNATURE_FILE: &str = "model.sig";

const MANIFEST_VERSION: u32 = 1;

/// Errors from manifest or signature verification.
#[derive(Debug, thiserror::Error)]
pub enum IntegrityError {
    #[error("{0} is required but missing")]
    Missing(String),

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest: {0}")]
    Manifest(String),

    #[error("Manifest does not bind {0}")]
    Unbound(String),

    #[error("File hash mismatch for {0}")]
    HashMismatch(String),

    #[error("Invalid model signature")]
    BadSignature,

    #[error("Invalid verifying key: {0}")]
    Key(String),
}

/// Signed description of the files making up a model artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    pub version: u32,
    #[serde(default)]
    pub created_at: i64,
    pub files: BTreeMap<String, String>,
}

impl ModelManifest {
    /// Hash the named files inside `dir`.
    ///
    /// # Errors
    /// Returns `IntegrityError::Io` if a file cannot be read.
    pub fn for_files(dir: &Path, names: &[&str], created_at: i64) -> Result<Self, IntegrityError> {
        let mut files = BTreeMap::new();
        for name in names {
            let path = dir.join(name);
            let bytes = read(&path)?;
            files.insert((*name).to_string(), sha256_hex(&bytes));
        }
        Ok(Self {
            version: MANIFEST_VERSION,
            created_at,
            files,
        })
    }
}

/// How strictly artifacts are verified.
#[derive(Debug, Clone, Default)]
pub struct IntegrityPolicy {
    /// Refuse artifacts without a manifest and a valid signature.
    pub require_signature: bool,
    /// File holding the base64 Ed25519 verifying key.
    pub verifying_key_file: Option<PathBuf>,
}

impl IntegrityPolicy {
    fn verifying_key(&self) -> Result<Option<VerifyingKey>, IntegrityError> {
        match &self.verifying_key_file {
            Some(path) => {
                let b64 = fs::read_to_string(path).map_err(|source| IntegrityError::Io {
                    path: path.clone(),
                    source,
                })?;
                decode_verifying_key(&b64).map(Some)
            }
            None => Ok(None),
        }
    }
}

/// Outcome of a successful verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// No manifest present; loaded as-is.
    Unverified,
    /// Manifest hashes checked, signature not checked.
    HashesVerified,
    /// Manifest hashes and signature checked.
    Signed,
}

/// Verify the artifact at `artifact` against the manifest beside it.
///
/// # Errors
/// Returns `IntegrityError` if a required piece is missing, a hash differs,
/// or the signature does not verify.
pub fn verify_artifact(
    artifact: &Path,
    policy: &IntegrityPolicy,
) -> Result<Verification, IntegrityError> {
    let dir = artifact
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let artifact_name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| IntegrityError::Manifest(format!("{artifact:?} has no file name")))?;

    let manifest_path = dir.join(MANIFEST_FILE);
    let sig_path = dir.join(SIGNATURE_FILE);
    let key = policy.verifying_key()?;

    if policy.require_signature && key.is_none() {
        return Err(IntegrityError::Missing("model verifying key".into()));
    }

    if !manifest_path.exists() {
        if policy.require_signature {
            return Err(IntegrityError::Missing(MANIFEST_FILE.into()));
        }
        tracing::warn!("No {MANIFEST_FILE} next to model artifact; loading unverified");
        return Ok(Verification::Unverified);
    }

    let manifest_bytes = read(&manifest_path)?;

    let mut signed = false;
    if sig_path.exists() {
        match &key {
            Some(key) => {
                let sig_bytes = read(&sig_path)?;
                let sig: [u8; 64] = sig_bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| IntegrityError::BadSignature)?;
                key.verify(&manifest_bytes, &Signature::from_bytes(&sig))
                    .map_err(|_| IntegrityError::BadSignature)?;
                signed = true;
            }
            None => {
                tracing::warn!("{SIGNATURE_FILE} present but no verifying key configured; signature not checked");
            }
        }
    } else if policy.require_signature {
        return Err(IntegrityError::Missing(SIGNATURE_FILE.into()));
    }

    let manifest: ModelManifest = serde_json::from_slice(&manifest_bytes)
        .map_err(|e| IntegrityError::Manifest(e.to_string()))?;
    if manifest.version != MANIFEST_VERSION {
        return Err(IntegrityError::Manifest(format!(
            "unsupported version {}",
            manifest.version
        )));
    }
    if !manifest.files.contains_key(&artifact_name) {
        return Err(IntegrityError::Unbound(artifact_name));
    }

    for (rel, expected_hex) in &manifest.files {
        let escapes = Path::new(rel)
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(IntegrityError::Manifest(format!(
                "{rel} escapes the model directory"
            )));
        }
        let actual_hex = sha256_hex(&read(&dir.join(rel))?);
        if !constant_time_eq_str(&actual_hex, expected_hex) {
            return Err(IntegrityError::HashMismatch(rel.clone()));
        }
    }

    if signed {
        tracing::info!("Model manifest signature and hashes verified");
        Ok(Verification::Signed)
    } else {
        tracing::info!("Model manifest hashes verified");
        Ok(Verification::HashesVerified)
    }
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Decode a base64 Ed25519 verifying key.
///
/// # Errors
/// Returns `IntegrityError::Key` if the input is not 32 bytes of valid key.
pub fn decode_verifying_key(b64: &str) -> Result<VerifyingKey, IntegrityError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|e| IntegrityError::Key(format!("bad base64: {e}")))?;
    let bytes: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| IntegrityError::Key("expected 32 bytes".into()))?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| IntegrityError::Key(e.to_string()))
}

fn read(path: &Path) -> Result<Vec<u8>, IntegrityError> {
    fs::read(path).map_err(|source| IntegrityError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn constant_time_eq_str(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
