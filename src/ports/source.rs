//! Feature source port: where the collector reads raw field values from.
//!
//! The TUI form is the production source; tests plug in closures or fixed
//! vectors.

use crate::domain::{FeatureVector, FEATURE_COUNT};

/// Supplies the current value of every field, in column order.
pub trait FeatureSource {
    fn feature_values(&self) -> [f64; FEATURE_COUNT];
}

impl<F> FeatureSource for F
where
    F: Fn() -> [f64; FEATURE_COUNT],
{
    fn feature_values(&self) -> [f64; FEATURE_COUNT] {
        self()
    }
}

impl FeatureSource for FeatureVector {
    fn feature_values(&self) -> [f64; FEATURE_COUNT] {
        self.to_row()
    }
}
