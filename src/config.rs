//! Runtime configuration from `HEARTCHECK_*` environment variables.

use std::path::PathBuf;

use crate::adapters::integrity::IntegrityPolicy;
use crate::adapters::sanitize::DEFAULT_SANITIZE_MAX_BYTES;

const DEFAULT_MODEL_PATH: &str = "models";
const DEFAULT_LOG_FILE: &str = "heartcheck.log";

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogMode {
    /// File when stdout is a terminal (so logs never draw over the TUI),
    /// stdout otherwise.
    #[default]
    Auto,
    File,
    Stdout,
}

impl LogMode {
    fn parse(value: &str) -> Self {
        match value {
            "file" => Self::File,
            "stdout" => Self::Stdout,
            _ => Self::Auto,
        }
    }

    /// Resolve `Auto` against whether stdout is interactive.
    #[must_use]
    pub fn use_file(self, interactive: bool) -> bool {
        match self {
            Self::File => true,
            Self::Stdout => false,
            Self::Auto => interactive,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Artifact file, or directory holding `knn_model.json`.
    pub model_path: PathBuf,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
    pub require_signed_model: bool,
    /// File holding the base64 Ed25519 verifying key.
    pub model_pubkey_file: Option<PathBuf>,
    /// Per-line cap for the log sanitizer.
    pub sanitize_max_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            log_mode: LogMode::Auto,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            require_signed_model: false,
            model_pubkey_file: None,
            sanitize_max_bytes: DEFAULT_SANITIZE_MAX_BYTES,
        }
    }
}

impl Config {
    /// Read configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            model_path: non_empty("HEARTCHECK_MODEL_PATH")
                .map_or(defaults.model_path, PathBuf::from),
            log_mode: non_empty("HEARTCHECK_LOG_MODE")
                .map_or(defaults.log_mode, |v| LogMode::parse(v.trim())),
            log_file: non_empty("HEARTCHECK_LOG_FILE").map_or(defaults.log_file, PathBuf::from),
            require_signed_model: non_empty("HEARTCHECK_REQUIRE_SIGNED_MODEL")
                .is_some_and(|v| parse_bool(&v)),
            model_pubkey_file: non_empty("HEARTCHECK_MODEL_PUBKEY_B64_FILE").map(PathBuf::from),
            sanitize_max_bytes: non_empty("HEARTCHECK_SANITIZE_MAX_BYTES")
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|&v| v > 0)
                .unwrap_or(defaults.sanitize_max_bytes),
        }
    }

    /// Integrity policy for loading the model artifact.
    #[must_use]
    pub fn integrity_policy(&self) -> IntegrityPolicy {
        IntegrityPolicy {
            require_signature: self.require_signed_model,
            verifying_key_file: self.model_pubkey_file.clone(),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE" | "yes" | "YES")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[]);
        assert_eq!(c, Config::default());
        assert_eq!(c.model_path, PathBuf::from("models"));
        assert_eq!(c.log_mode, LogMode::Auto);
        assert!(!c.require_signed_model);
        assert_eq!(c.sanitize_max_bytes, 16 * 1024);
    }

    #[test]
    fn test_reads_variables() {
        let c = config(&[
            ("HEARTCHECK_MODEL_PATH", "/opt/models/knn_model.json"),
            ("HEARTCHECK_LOG_MODE", "stdout"),
            ("HEARTCHECK_LOG_FILE", "/tmp/hc.log"),
            ("HEARTCHECK_REQUIRE_SIGNED_MODEL", "yes"),
            ("HEARTCHECK_MODEL_PUBKEY_B64_FILE", "/etc/heartcheck/pub.b64"),
            ("HEARTCHECK_SANITIZE_MAX_BYTES", "4096"),
        ]);
        assert_eq!(c.model_path, PathBuf::from("/opt/models/knn_model.json"));
        assert_eq!(c.log_mode, LogMode::Stdout);
        assert_eq!(c.log_file, PathBuf::from("/tmp/hc.log"));
        assert!(c.require_signed_model);
        assert_eq!(c.sanitize_max_bytes, 4096);

        let policy = c.integrity_policy();
        assert!(policy.require_signature);
        assert_eq!(
            policy.verifying_key_file,
            Some(PathBuf::from("/etc/heartcheck/pub.b64"))
        );
    }

    #[test]
    fn test_bool_parsing() {
        for value in ["1", "true", "TRUE", "yes", "YES", " true "] {
            assert!(parse_bool(value), "{value}");
        }
        for value in ["0", "false", "no", "True", ""] {
            assert!(!parse_bool(value), "{value}");
        }
    }

    #[test]
    fn test_empty_values_fall_back() {
        let c = config(&[("HEARTCHECK_MODEL_PATH", "  "), ("HEARTCHECK_LOG_MODE", "bogus")]);
        assert_eq!(c.model_path, PathBuf::from("models"));
        assert_eq!(c.log_mode, LogMode::Auto);

        for bad in ["0", "-5", "lots"] {
            let c = config(&[("HEARTCHECK_SANITIZE_MAX_BYTES", bad)]);
            assert_eq!(c.sanitize_max_bytes, DEFAULT_SANITIZE_MAX_BYTES, "{bad}");
        }
    }

    #[test]
    fn test_log_mode_resolution() {
        assert!(LogMode::Auto.use_file(true));
        assert!(!LogMode::Auto.use_file(false));
        assert!(LogMode::File.use_file(false));
        assert!(!LogMode::Stdout.use_file(true));
    }
}
