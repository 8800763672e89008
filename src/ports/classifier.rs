//! Classifier port: Trait for the pre-trained risk model.
//!
//! This trait abstracts the model implementation (kNN export) from the
//! application logic.

/// Errors raised by a classifier's own input checks.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifierError {
    #[error("Classifier expects {expected} features, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("Feature {index} is not a finite number")]
    NonFinite { index: usize },
}

/// A loaded, immutable binary classifier.
///
/// Implementations are read-only after construction, so a single instance can
/// be shared behind an `Arc` without locking.
pub trait Classifier: Send + Sync {
    /// Feature names in the column order the model was fitted on.
    fn feature_names(&self) -> &[String];

    /// Classify one row and return the raw class value.
    ///
    /// # Errors
    /// Returns `ClassifierError` if the row has the wrong width or holds
    /// non-finite values.
    fn classify(&self, row: &[f64]) -> Result<i64, ClassifierError>;
}
