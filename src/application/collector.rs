//! Input collection: turns raw field values into a `FeatureVector`.
//!
//! The collector never fails. Whatever the source hands over is brought into
//! each field's domain the way its widget would (clamped, snapped to the step
//! grid or the nearest option), so the classifier always sees a complete,
//! in-domain row.

use crate::domain::{FeatureVector, FEATURE_COUNT, FIELDS};
use crate::ports::FeatureSource;

/// Reads the current field values from a [`FeatureSource`].
#[derive(Debug, Clone)]
pub struct InputCollector<S: FeatureSource> {
    source: S,
}

impl<S: FeatureSource> InputCollector<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Gather all 13 fields in column order.
    pub fn collect(&self) -> FeatureVector {
        let raw = self.source.feature_values();
        let mut row = [0.0; FEATURE_COUNT];

        for ((slot, spec), value) in row.iter_mut().zip(FIELDS.iter()).zip(raw) {
            *slot = spec.coerce(value);
            // Values are kept out of the log on purpose; the field name is enough.
            if !spec.domain.contains(value) {
                tracing::warn!(field = spec.name, "Input outside field domain; coerced");
            }
        }

        FeatureVector::from_domain_row(&row)
    }
}
