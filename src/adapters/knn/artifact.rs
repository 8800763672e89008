//! JSON export format of a fitted k-nearest-neighbors classifier.
//!
//! Produced by the training toolchain from a fitted scikit-learn
//! `KNeighborsClassifier` (optionally behind a `StandardScaler`). `fit_x` is
//! stored in the classifier's input space: when `scaler` is present the rows
//! are already standardized and only the query needs transforming.

use serde::{Deserialize, Serialize};

use super::ModelLoadError;

/// Expected value of the `format` field.
pub const ARTIFACT_FORMAT: &str = "knn";

/// Supported artifact version.
pub const ARTIFACT_VERSION: u32 = 1;

/// Neighbor vote weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weights {
    /// Every neighbor votes 1.
    Uniform,
    /// Neighbors vote by inverse distance.
    Distance,
}

impl std::fmt::Display for Weights {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uniform => write!(f, "uniform"),
            Self::Distance => write!(f, "distance"),
        }
    }
}

/// Per-feature standardization applied to queries: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// Serialized kNN model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnArtifact {
    pub format: String,
    pub version: u32,
    #[serde(default)]
    pub description: String,
    pub n_neighbors: usize,
    #[serde(default = "default_weights")]
    pub weights: Weights,
    /// Minkowski order (2 = Euclidean, 1 = Manhattan).
    #[serde(default = "default_p")]
    pub p: f64,
    pub feature_names: Vec<String>,
    /// Class values, strictly ascending.
    pub classes: Vec<i64>,
    #[serde(default)]
    pub scaler: Option<Scaler>,
    pub fit_x: Vec<Vec<f64>>,
    pub fit_y: Vec<i64>,
}

fn default_weights() -> Weights {
    Weights::Uniform
}

fn default_p() -> f64 {
    2.0
}

impl KnnArtifact {
    /// Structural checks; any failure means the artifact is unusable.
    ///
    /// # Errors
    /// Returns `ModelLoadError::Invalid` describing the first problem found.
    pub fn validate(&self) -> Result<(), ModelLoadError> {
        let invalid = |msg: String| Err(ModelLoadError::Invalid(msg));

        if self.format != ARTIFACT_FORMAT {
            return invalid(format!(
                "format must be \"{ARTIFACT_FORMAT}\", got \"{}\"",
                self.format
            ));
        }
        if self.version != ARTIFACT_VERSION {
            return invalid(format!("unsupported artifact version {}", self.version));
        }

        let n_features = self.feature_names.len();
        if n_features == 0 {
            return invalid("feature_names is empty".into());
        }

        let rows = self.fit_x.len();
        if rows == 0 {
            return invalid("fit_x holds no training rows".into());
        }
        if self.fit_y.len() != rows {
            return invalid(format!(
                "fit_y has {} labels for {rows} training rows",
                self.fit_y.len()
            ));
        }
        if self.n_neighbors == 0 || self.n_neighbors > rows {
            return invalid(format!(
                "n_neighbors must be in 1..={rows}, got {}",
                self.n_neighbors
            ));
        }
        if !(self.p.is_finite() && self.p >= 1.0) {
            return invalid(format!("p must be a finite value >= 1, got {}", self.p));
        }

        if self.classes.is_empty() {
            return invalid("classes is empty".into());
        }
        if self.classes.windows(2).any(|w| w[0] >= w[1]) {
            return invalid("classes must be strictly ascending".into());
        }

        for (i, row) in self.fit_x.iter().enumerate() {
            if row.len() != n_features {
                return invalid(format!(
                    "fit_x row {i} has {} values, expected {n_features}",
                    row.len()
                ));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return invalid(format!("fit_x row {i} holds a non-finite value"));
            }
        }
        if let Some((i, y)) = self
            .fit_y
            .iter()
            .enumerate()
            .find(|(_, y)| self.classes.binary_search(y).is_err())
        {
            return invalid(format!("fit_y[{i}] = {y} is not a declared class"));
        }

        if let Some(scaler) = &self.scaler {
            if scaler.mean.len() != n_features || scaler.scale.len() != n_features {
                return invalid("scaler length does not match feature_names".into());
            }
            if scaler.mean.iter().any(|v| !v.is_finite()) {
                return invalid("scaler mean holds a non-finite value".into());
            }
            if scaler.scale.iter().any(|v| !v.is_finite() || *v == 0.0) {
                return invalid("scaler scale must be finite and non-zero".into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact() -> KnnArtifact {
        KnnArtifact {
            format: ARTIFACT_FORMAT.into(),
            version: ARTIFACT_VERSION,
            description: String::new(),
            n_neighbors: 1,
            weights: Weights::Uniform,
            p: 2.0,
            feature_names: vec!["a".into(), "b".into()],
            classes: vec![0, 1],
            scaler: None,
            fit_x: vec![vec![0.0, 0.0], vec![1.0, 1.0]],
            fit_y: vec![0, 1],
        }
    }

    fn assert_invalid(a: KnnArtifact, needle: &str) {
        match a.validate() {
            Err(ModelLoadError::Invalid(msg)) => assert!(msg.contains(needle), "{msg}"),
            other => panic!("expected Invalid containing {needle:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_artifact() {
        assert!(artifact().validate().is_ok());
    }

    #[test]
    fn test_defaults_from_json() {
        let json = r#"{
            "format": "knn", "version": 1, "n_neighbors": 1,
            "feature_names": ["a"], "classes": [0, 1],
            "fit_x": [[0.0], [1.0]], "fit_y": [0, 1]
        }"#;
        let a: KnnArtifact = serde_json::from_str(json).expect("parse");
        assert_eq!(a.weights, Weights::Uniform);
        assert!((a.p - 2.0).abs() < f64::EPSILON);
        assert!(a.scaler.is_none());
    }

    #[test]
    fn test_rejects_bad_header() {
        let mut a = artifact();
        a.format = "svm".into();
        assert_invalid(a, "format");

        let mut a = artifact();
        a.version = 2;
        assert_invalid(a, "version");
    }

    #[test]
    fn test_rejects_bad_neighbors() {
        let mut a = artifact();
        a.n_neighbors = 0;
        assert_invalid(a, "n_neighbors");

        let mut a = artifact();
        a.n_neighbors = 3;
        assert_invalid(a, "n_neighbors");
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let mut a = artifact();
        a.fit_x[1].pop();
        assert_invalid(a, "row 1");
    }

    #[test]
    fn test_rejects_label_mismatch() {
        let mut a = artifact();
        a.fit_y.pop();
        assert_invalid(a, "labels");

        let mut a = artifact();
        a.fit_y[0] = 5;
        assert_invalid(a, "not a declared class");

        let mut a = artifact();
        a.classes = vec![1, 0];
        assert_invalid(a, "ascending");
    }

    #[test]
    fn test_rejects_bad_scaler_and_p() {
        let mut a = artifact();
        a.scaler = Some(Scaler {
            mean: vec![0.0, 0.0],
            scale: vec![1.0, 0.0],
        });
        assert_invalid(a, "non-zero");

        let mut a = artifact();
        a.p = 0.5;
        assert_invalid(a, "p must");
    }
}
