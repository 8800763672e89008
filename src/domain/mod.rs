//! Domain layer: Core types for heart disease risk prediction.
//!
//! Pure data types with no I/O. The field table here is the single source
//! of truth for feature order, domains, widgets and defaults.

mod features;
mod label;

pub use features::{
    check_feature_order, default_values, Choice, FeatureVector, FieldDomain, FieldSpec,
    SchemaError, WidgetKind, FEATURE_COUNT, FEATURE_NAMES, FIELDS,
};
pub use label::{Prediction, RiskLabel};
