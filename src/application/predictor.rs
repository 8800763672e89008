//! Prediction service: Validates a row and runs it through the classifier.
//!
//! This service coordinates:
//! - Feature order check against the loaded model (once, at construction)
//! - Row length and field domain checks (every call)
//! - Classification and label mapping

use std::sync::Arc;

use crate::domain::{check_feature_order, FeatureVector, Prediction, RiskLabel, SchemaError};
use crate::ports::Classifier;
use crate::HeartcheckError;

/// Service wrapping the single classifier loaded at startup.
///
/// The classifier is shared read-only; the service holds no other state, so
/// it can be cloned freely and used from several threads.
pub struct PredictorService<C: Classifier> {
    classifier: Arc<C>,
}

impl<C: Classifier> Clone for PredictorService<C> {
    fn clone(&self) -> Self {
        Self {
            classifier: Arc::clone(&self.classifier),
        }
    }
}

impl<C: Classifier> PredictorService<C> {
    /// Wrap a loaded classifier.
    ///
    /// # Errors
    /// Returns `SchemaError` if the classifier's declared feature names are
    /// not the fixed 13-field order.
    pub fn new(classifier: Arc<C>) -> Result<Self, SchemaError> {
        check_feature_order(classifier.feature_names())?;
        Ok(Self { classifier })
    }

    /// Classify a collected feature vector.
    ///
    /// # Errors
    /// Returns `HeartcheckError::SchemaMismatch` if a field is outside its
    /// domain or the classifier answers with a class other than 0 or 1.
    pub fn classify(&self, features: &FeatureVector) -> Result<RiskLabel, HeartcheckError> {
        self.classify_row(&features.to_row())
    }

    /// Classify a raw row.
    ///
    /// Length and domains are checked before the classifier sees the row.
    ///
    /// # Errors
    /// Returns `HeartcheckError::SchemaMismatch` for a malformed row or an
    /// unknown class, `HeartcheckError::Classifier` if the model rejects it.
    pub fn classify_row(&self, row: &[f64]) -> Result<RiskLabel, HeartcheckError> {
        let features = FeatureVector::from_row(row)?;
        let class = self.classifier.classify(&features.to_row())?;
        Ok(RiskLabel::from_class(class)?)
    }

    /// Run one prediction for display.
    ///
    /// # Errors
    /// Same as [`Self::classify`].
    pub fn predict(&self, features: &FeatureVector) -> Result<Prediction, HeartcheckError> {
        tracing::info!("Running prediction...");
        let label = self.classify(features).map_err(|e| {
            tracing::error!("Prediction failed: {}", e);
            e
        })?;
        tracing::info!("Prediction complete");
        Ok(Prediction::new(label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sanitize::sanitize;
    use crate::domain::{FEATURE_COUNT, FEATURE_NAMES};
    use crate::ports::ClassifierError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers class 1 when cholesterol is above a threshold; counts calls.
    struct ThresholdClassifier {
        names: Vec<String>,
        calls: AtomicUsize,
        answer_override: Option<i64>,
    }

    impl ThresholdClassifier {
        fn new() -> Self {
            Self {
                names: FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect(),
                calls: AtomicUsize::new(0),
                answer_override: None,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Classifier for ThresholdClassifier {
        fn feature_names(&self) -> &[String] {
            &self.names
        }

        fn classify(&self, row: &[f64]) -> Result<i64, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if row.len() != FEATURE_COUNT {
                return Err(ClassifierError::Dimension {
                    expected: FEATURE_COUNT,
                    actual: row.len(),
                });
            }
            Ok(self
                .answer_override
                .unwrap_or(if row[4] > 240.0 { 1 } else { 0 }))
        }
    }

    fn service() -> (Arc<ThresholdClassifier>, PredictorService<ThresholdClassifier>) {
        let classifier = Arc::new(ThresholdClassifier::new());
        let service = PredictorService::new(Arc::clone(&classifier)).expect("order matches");
        (classifier, service)
    }

    #[test]
    fn test_classify_maps_labels() {
        let (_, service) = service();
        let high = FeatureVector::default();
        assert_eq!(service.classify(&high).expect("classify"), RiskLabel::Positive);

        let low = FeatureVector {
            cholesterol: 200,
            ..FeatureVector::default()
        };
        assert_eq!(service.classify(&low).expect("classify"), RiskLabel::Negative);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let (_, service) = service();
        let v = FeatureVector::default();
        let first = service.classify(&v).expect("classify");
        for _ in 0..10 {
            assert_eq!(service.classify(&v).expect("classify"), first);
        }
    }

    #[test]
    fn test_short_row_never_reaches_classifier() {
        let (classifier, service) = service();
        let row = FeatureVector::default().to_row();
        let err = service.classify_row(&row[..12]).expect_err("must fail");
        assert!(matches!(
            err,
            HeartcheckError::SchemaMismatch(SchemaError::Length {
                expected: 13,
                actual: 12
            })
        ));
        assert_eq!(classifier.calls(), 0);
    }

    #[test]
    fn test_out_of_domain_row_never_reaches_classifier() {
        let (classifier, service) = service();
        let mut row = FeatureVector::default().to_row();
        row[0] = 120.0;
        let err = service.classify_row(&row).expect_err("must fail");
        assert!(matches!(
            err,
            HeartcheckError::SchemaMismatch(SchemaError::OutOfDomain { field: "age", .. })
        ));
        assert_eq!(classifier.calls(), 0);
    }

    #[test]
    fn test_failure_log_line_omits_value() {
        let (_, service) = service();
        let v = FeatureVector {
            cholesterol: 612,
            ..FeatureVector::default()
        };
        let err = service.predict(&v).expect_err("must fail");
        let line = format!("Prediction failed: {err}");
        assert!(line.contains("cholesterol"));
        assert!(!line.contains("612"));
        assert!(!sanitize(&line).contains("612"));
    }

    #[test]
    fn test_wrong_feature_order_rejected() {
        let mut classifier = ThresholdClassifier::new();
        classifier.names.swap(3, 4);
        let err = PredictorService::new(Arc::new(classifier))
            .err()
            .expect("must fail");
        assert!(matches!(err, SchemaError::Order { position: 3, .. }));
    }

    #[test]
    fn test_unknown_class_is_schema_mismatch() {
        let mut classifier = ThresholdClassifier::new();
        classifier.answer_override = Some(2);
        let service = PredictorService::new(Arc::new(classifier)).expect("order matches");
        let err = service
            .classify(&FeatureVector::default())
            .expect_err("must fail");
        assert!(matches!(
            err,
            HeartcheckError::SchemaMismatch(SchemaError::UnknownLabel(2))
        ));
    }

    #[test]
    fn test_predict_wraps_label() {
        let (classifier, service) = service();
        let prediction = service
            .predict(&FeatureVector::default())
            .expect("predict");
        assert_eq!(prediction.label, RiskLabel::Positive);
        assert_eq!(classifier.calls(), 1);
    }

    #[test]
    fn test_shared_across_threads() {
        let (classifier, service) = service();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = service.clone();
                std::thread::spawn(move || service.classify(&FeatureVector::default()))
            })
            .collect();
        for handle in handles {
            let label = handle.join().expect("join").expect("classify");
            assert_eq!(label, RiskLabel::Positive);
        }
        assert_eq!(classifier.calls(), 4);
    }
}
