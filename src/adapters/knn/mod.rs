//! kNN adapter: Implementation of `Classifier` over an exported kNN model.
//!
//! Inference follows scikit-learn's brute-force `KNeighborsClassifier.predict`
//! and is fully deterministic. Where scikit-learn leaves the order of
//! equidistant neighbors unspecified, this crate breaks the tie by row index:
//!
//! 1. optional standardization of the query (`(x - mean) / scale`)
//! 2. Minkowski distance of order `p` to every training row
//! 3. the `k` nearest rows, equal distances broken by lower row index
//! 4. per-class vote, uniform or inverse-distance; with distance weights any
//!    exact match (`d == 0`) outvotes everything else
//! 5. highest vote wins, ties go to the class listed first in `classes`
//!
//! The model is immutable after `load`, so one instance can be shared across
//! threads behind an `Arc`.

mod artifact;

use std::path::{Path, PathBuf};

pub use artifact::{KnnArtifact, Scaler, Weights, ARTIFACT_FORMAT, ARTIFACT_VERSION};

use crate::adapters::integrity::{self, IntegrityError, IntegrityPolicy, Verification};
use crate::ports::{Classifier, ClassifierError};

/// Artifact file name looked up when the model path is a directory.
pub const ARTIFACT_FILE: &str = "knn_model.json";

/// Error type for model loading.
#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("Model artifact not found at {0:?}")]
    NotFound(PathBuf),

    #[error("Failed to read model artifact {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Model artifact is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid model artifact: {0}")]
    Invalid(String),

    #[error("Model integrity check failed: {0}")]
    Integrity(#[from] IntegrityError),
}

/// Display summary of a loaded model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSummary {
    pub source: PathBuf,
    pub description: String,
    pub n_neighbors: usize,
    pub weights: Weights,
    pub p: f64,
    pub n_samples: usize,
    pub n_features: usize,
    pub classes: Vec<i64>,
    pub scaled: bool,
    pub verification: Verification,
}

/// Loaded k-nearest-neighbors classifier.
#[derive(Debug, Clone)]
pub struct KnnClassifier {
    artifact: KnnArtifact,
    /// Index into `artifact.classes` for every training row.
    row_class: Vec<usize>,
    source: PathBuf,
    verification: Verification,
}

impl KnnClassifier {
    /// Load a model from a `knn_model.json` file or a directory holding one.
    ///
    /// Integrity is checked before the artifact is parsed.
    ///
    /// # Errors
    /// Returns `ModelLoadError` if the artifact is missing, unreadable,
    /// malformed, inconsistent, or fails the integrity policy.
    pub fn load(model_path: &Path, policy: &IntegrityPolicy) -> Result<Self, ModelLoadError> {
        let artifact_path = if model_path.is_dir() {
            model_path.join(ARTIFACT_FILE)
        } else {
            model_path.to_path_buf()
        };
        if !artifact_path.is_file() {
            return Err(ModelLoadError::NotFound(artifact_path));
        }

        let verification = integrity::verify_artifact(&artifact_path, policy)?;

        let bytes = std::fs::read(&artifact_path).map_err(|source| ModelLoadError::Io {
            path: artifact_path.clone(),
            source,
        })?;
        let artifact: KnnArtifact = serde_json::from_slice(&bytes)?;

        let mut classifier = Self::from_artifact(artifact)?;
        classifier.source = artifact_path;
        classifier.verification = verification;

        tracing::info!(
            "Loaded kNN model from {:?} (k={}, weights={}, p={}, samples={}, features={}, scaled={}, verification={:?})",
            classifier.source,
            classifier.artifact.n_neighbors,
            classifier.artifact.weights,
            classifier.artifact.p,
            classifier.artifact.fit_x.len(),
            classifier.artifact.feature_names.len(),
            classifier.artifact.scaler.is_some(),
            classifier.verification,
        );

        Ok(classifier)
    }

    /// Build a classifier from an in-memory artifact.
    ///
    /// # Errors
    /// Returns `ModelLoadError::Invalid` if the artifact fails validation.
    pub fn from_artifact(artifact: KnnArtifact) -> Result<Self, ModelLoadError> {
        artifact.validate()?;

        let row_class = artifact
            .fit_y
            .iter()
            .map(|y| artifact.classes.binary_search(y))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ModelLoadError::Invalid("fit_y references an undeclared class".into()))?;

        Ok(Self {
            artifact,
            row_class,
            source: PathBuf::new(),
            verification: Verification::Unverified,
        })
    }

    /// Summary for display and diagnostics.
    #[must_use]
    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            source: self.source.clone(),
            description: self.artifact.description.clone(),
            n_neighbors: self.artifact.n_neighbors,
            weights: self.artifact.weights,
            p: self.artifact.p,
            n_samples: self.artifact.fit_x.len(),
            n_features: self.artifact.feature_names.len(),
            classes: self.artifact.classes.clone(),
            scaled: self.artifact.scaler.is_some(),
            verification: self.verification,
        }
    }

    fn transform(&self, row: &[f64]) -> Vec<f64> {
        match &self.artifact.scaler {
            Some(scaler) => row
                .iter()
                .zip(scaler.mean.iter().zip(&scaler.scale))
                .map(|(x, (mean, scale))| (x - mean) / scale)
                .collect(),
            None => row.to_vec(),
        }
    }

    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        let p = self.artifact.p;
        let diffs = a.iter().zip(b).map(|(x, y)| (x - y).abs());
        if p == 1.0 {
            diffs.sum()
        } else if p == 2.0 {
            diffs.map(|d| d * d).sum::<f64>().sqrt()
        } else {
            diffs.map(|d| d.powf(p)).sum::<f64>().powf(1.0 / p)
        }
    }

    /// Indices and distances of the `k` nearest training rows, nearest first.
    fn neighbors(&self, query: &[f64]) -> Vec<(f64, usize)> {
        let mut distances: Vec<(f64, usize)> = self
            .artifact
            .fit_x
            .iter()
            .enumerate()
            .map(|(i, x)| (self.distance(query, x), i))
            .collect();
        distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        distances.truncate(self.artifact.n_neighbors);
        distances
    }

    fn vote(&self, neighbors: &[(f64, usize)]) -> Vec<f64> {
        let mut votes = vec![0.0; self.artifact.classes.len()];
        match self.artifact.weights {
            Weights::Uniform => {
                for &(_, i) in neighbors {
                    votes[self.row_class[i]] += 1.0;
                }
            }
            Weights::Distance => {
                let exact = neighbors.iter().any(|&(d, _)| d == 0.0);
                for &(d, i) in neighbors {
                    let weight = match (exact, d == 0.0) {
                        (true, true) => 1.0,
                        (true, false) => 0.0,
                        _ => 1.0 / d,
                    };
                    votes[self.row_class[i]] += weight;
                }
            }
        }
        votes
    }
}

impl Classifier for KnnClassifier {
    fn feature_names(&self) -> &[String] {
        &self.artifact.feature_names
    }

    fn classify(&self, row: &[f64]) -> Result<i64, ClassifierError> {
        let expected = self.artifact.feature_names.len();
        if row.len() != expected {
            return Err(ClassifierError::Dimension {
                expected,
                actual: row.len(),
            });
        }
        if let Some(index) = row.iter().position(|v| !v.is_finite()) {
            return Err(ClassifierError::NonFinite { index });
        }

        let query = self.transform(row);
        let neighbors = self.neighbors(&query);
        let votes = self.vote(&neighbors);

        let mut best = 0;
        for (j, &v) in votes.iter().enumerate().skip(1) {
            if v > votes[best] {
                best = j;
            }
        }

        tracing::debug!(
            "kNN vote over {} neighbors: {:?}",
            neighbors.len(),
            votes
        );

        Ok(self.artifact.classes[best])
    }
}
