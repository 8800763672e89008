//! Clinical feature vector for heart disease risk prediction.
//!
//! Thirteen measurements in the column order the trained classifier was fitted
//! on. The classifier only ever sees a bare numeric row, so position is the
//! contract: reordering fields silently corrupts predictions.

use serde::{Deserialize, Serialize};

/// Number of features the classifier consumes.
pub const FEATURE_COUNT: usize = 13;

/// Feature names in classifier column order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "age",
    "sex",
    "chest_pain_type",
    "resting_bp",
    "cholesterol",
    "fasting_blood_sugar_flag",
    "resting_ecg",
    "max_heart_rate",
    "exercise_angina_flag",
    "st_depression",
    "st_slope",
    "vessels_colored",
    "thalassemia_type",
];

/// A row (or classifier) does not conform to the feature layout.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("Expected {expected} features, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("Feature order mismatch at position {position}: expected `{expected}`, found `{found}`")]
    Order {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("{field} is outside its allowed domain")]
    OutOfDomain { field: &'static str, value: f64 },

    #[error("Unknown class label {0} (expected 0 or 1)")]
    UnknownLabel(i64),
}

/// One option of an enumerated field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Choice {
    pub value: u8,
    pub label: &'static str,
}

/// Set of values a field may take.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDomain {
    /// Closed integer range.
    Integer { min: i64, max: i64 },
    /// Closed decimal range on a fixed step grid anchored at `min`.
    Decimal { min: f64, max: f64, step: f64 },
    /// Enumerated options, in display order.
    Choice(&'static [Choice]),
}

impl FieldDomain {
    /// Whether `value` is a member of the domain.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match *self {
            Self::Integer { min, max } => {
                value.fract() == 0.0 && value >= min as f64 && value <= max as f64
            }
            Self::Decimal { min, max, .. } => {
                value >= min && value <= max && (self.snap(value) - value).abs() < 1e-9
            }
            Self::Choice(options) => options.iter().any(|o| f64::from(o.value) == value),
        }
    }

    /// Lower and upper bound of the domain.
    #[must_use]
    pub fn bounds(&self) -> (f64, f64) {
        match *self {
            Self::Integer { min, max } => (min as f64, max as f64),
            Self::Decimal { min, max, .. } => (min, max),
            Self::Choice(options) => options.iter().fold((f64::MAX, f64::MIN), |(lo, hi), o| {
                let v = f64::from(o.value);
                (lo.min(v), hi.max(v))
            }),
        }
    }

    /// Map a finite value to the nearest member of the domain.
    ///
    /// Members are returned unchanged.
    #[must_use]
    pub fn snap(&self, value: f64) -> f64 {
        match *self {
            Self::Integer { min, max } => value.round().clamp(min as f64, max as f64),
            Self::Decimal { min, max, step } => {
                let steps = ((value - min) / step).round();
                let factor = 10f64.powi(step_decimals(step) as i32);
                let snapped = ((min + steps * step) * factor).round() / factor;
                snapped.clamp(min, max)
            }
            Self::Choice(options) => {
                let mut best = options.first().map_or(0.0, |o| f64::from(o.value));
                let mut best_dist = f64::MAX;
                for option in options {
                    let dist = (f64::from(option.value) - value).abs();
                    if dist < best_dist {
                        best = f64::from(option.value);
                        best_dist = dist;
                    }
                }
                best
            }
        }
    }

    /// Move `delta` steps (or options) away from `value`, stopping at the ends.
    #[must_use]
    pub fn step(&self, value: f64, delta: i32) -> f64 {
        match *self {
            Self::Integer { .. } => self.snap(value + f64::from(delta)),
            Self::Decimal { step, .. } => self.snap(value + f64::from(delta) * step),
            Self::Choice(options) => {
                let current = options
                    .iter()
                    .position(|o| f64::from(o.value) == self.snap(value))
                    .unwrap_or(0) as i64;
                let last = options.len().saturating_sub(1) as i64;
                let next = (current + i64::from(delta)).clamp(0, last) as usize;
                options.get(next).map_or(value, |o| f64::from(o.value))
            }
        }
    }

    /// Number of decimals used to display members of this domain.
    #[must_use]
    pub fn decimals(&self) -> usize {
        match *self {
            Self::Decimal { step, .. } => step_decimals(step),
            _ => 0,
        }
    }
}

fn step_decimals(step: f64) -> usize {
    if step <= 0.0 || step >= 1.0 {
        return 0;
    }
    (-step.log10()).ceil() as usize
}

/// Widget used to enter a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    NumberInput,
    Radio,
    SelectSlider,
    SelectBox,
    Slider,
}

/// Static description of one feature: label, domain, widget and default.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub help: &'static str,
    pub domain: FieldDomain,
    pub widget: WidgetKind,
    pub default: f64,
}

impl FieldSpec {
    /// Bring any input into the field's domain, the way its widget would.
    ///
    /// Non-finite input falls back to the default.
    #[must_use]
    pub fn coerce(&self, value: f64) -> f64 {
        if value.is_finite() {
            self.domain.snap(value)
        } else {
            self.default
        }
    }

    /// Display text for a member of the domain.
    #[must_use]
    pub fn format_value(&self, value: f64) -> String {
        match self.domain {
            FieldDomain::Choice(options) => options
                .iter()
                .find(|o| f64::from(o.value) == value)
                .map_or_else(|| format!("{value}"), |o| o.label.to_string()),
            domain => format!("{value:.*}", domain.decimals()),
        }
    }
}

const BINARY_YES_NO: &[Choice] = &[
    Choice { value: 1, label: "Yes" },
    Choice { value: 0, label: "No" },
];

const SEX: &[Choice] = &[
    Choice { value: 1, label: "Male" },
    Choice { value: 0, label: "Female" },
];

const CHEST_PAIN: &[Choice] = &[
    Choice { value: 0, label: "0" },
    Choice { value: 1, label: "1" },
    Choice { value: 2, label: "2" },
    Choice { value: 3, label: "3" },
];

const THREE_LEVELS: &[Choice] = &[
    Choice { value: 0, label: "0" },
    Choice { value: 1, label: "1" },
    Choice { value: 2, label: "2" },
];

const VESSELS: &[Choice] = &[
    Choice { value: 0, label: "0" },
    Choice { value: 1, label: "1" },
    Choice { value: 2, label: "2" },
    Choice { value: 3, label: "3" },
    Choice { value: 4, label: "4" },
];

const THALASSEMIA: &[Choice] = &[
    Choice { value: 0, label: "Normal" },
    Choice { value: 1, label: "Fixed Defect" },
    Choice { value: 2, label: "Reversible Defect" },
];

/// Field table in classifier column order.
pub static FIELDS: [FieldSpec; FEATURE_COUNT] = [
    FieldSpec {
        name: "age",
        label: "Age (Years)",
        help: "Age of the patient.",
        domain: FieldDomain::Integer { min: 29, max: 77 },
        widget: WidgetKind::NumberInput,
        default: 50.0,
    },
    FieldSpec {
        name: "sex",
        label: "Sex",
        help: "",
        domain: FieldDomain::Choice(SEX),
        widget: WidgetKind::Radio,
        default: 1.0,
    },
    FieldSpec {
        name: "chest_pain_type",
        label: "Chest Pain Type (0-3)",
        help: "Type of chest pain experienced.",
        domain: FieldDomain::Choice(CHEST_PAIN),
        widget: WidgetKind::SelectSlider,
        default: 1.0,
    },
    FieldSpec {
        name: "resting_bp",
        label: "Resting Blood Pressure (mm Hg)",
        help: "",
        domain: FieldDomain::Integer { min: 94, max: 200 },
        widget: WidgetKind::NumberInput,
        default: 120.0,
    },
    FieldSpec {
        name: "cholesterol",
        label: "Serum Cholesterol (mg/dl)",
        help: "",
        domain: FieldDomain::Integer { min: 126, max: 564 },
        widget: WidgetKind::NumberInput,
        default: 250.0,
    },
    FieldSpec {
        name: "fasting_blood_sugar_flag",
        label: "Fasting Blood Sugar > 120 mg/dl",
        help: "",
        domain: FieldDomain::Choice(BINARY_YES_NO),
        widget: WidgetKind::Radio,
        default: 0.0,
    },
    FieldSpec {
        name: "resting_ecg",
        label: "Resting ECG Results (0-2)",
        help: "ECG results classification.",
        domain: FieldDomain::Choice(THREE_LEVELS),
        widget: WidgetKind::SelectBox,
        default: 0.0,
    },
    FieldSpec {
        name: "max_heart_rate",
        label: "Maximum Heart Rate Achieved",
        help: "",
        domain: FieldDomain::Integer { min: 71, max: 202 },
        widget: WidgetKind::NumberInput,
        default: 150.0,
    },
    FieldSpec {
        name: "exercise_angina_flag",
        label: "Exercise Induced Angina",
        help: "",
        domain: FieldDomain::Choice(BINARY_YES_NO),
        widget: WidgetKind::Radio,
        default: 0.0,
    },
    FieldSpec {
        name: "st_depression",
        label: "ST Depression Induced by Exercise",
        help: "",
        domain: FieldDomain::Decimal {
            min: 0.0,
            max: 6.2,
            step: 0.1,
        },
        widget: WidgetKind::Slider,
        default: 1.0,
    },
    FieldSpec {
        name: "st_slope",
        label: "Slope of the Peak Exercise ST Segment",
        help: "Slope category.",
        domain: FieldDomain::Choice(THREE_LEVELS),
        widget: WidgetKind::SelectBox,
        default: 0.0,
    },
    FieldSpec {
        name: "vessels_colored",
        label: "Number of Major Vessels Colored by Fluoroscopy",
        help: "",
        domain: FieldDomain::Choice(VESSELS),
        widget: WidgetKind::SelectSlider,
        default: 0.0,
    },
    FieldSpec {
        name: "thalassemia_type",
        label: "Thalassemia Type",
        help: "",
        domain: FieldDomain::Choice(THALASSEMIA),
        widget: WidgetKind::SelectBox,
        default: 0.0,
    },
];

/// Default value of every field, in column order.
#[must_use]
pub fn default_values() -> [f64; FEATURE_COUNT] {
    FIELDS.map(|f| f.default)
}

/// Check that a classifier's declared feature names match [`FEATURE_NAMES`].
///
/// # Errors
/// Returns `SchemaError::Length` or `SchemaError::Order` on the first difference.
pub fn check_feature_order<S: AsRef<str>>(names: &[S]) -> Result<(), SchemaError> {
    if names.len() != FEATURE_COUNT {
        return Err(SchemaError::Length {
            expected: FEATURE_COUNT,
            actual: names.len(),
        });
    }
    for (position, (found, expected)) in names.iter().zip(FEATURE_NAMES).enumerate() {
        if found.as_ref() != expected {
            return Err(SchemaError::Order {
                position,
                expected: expected.to_string(),
                found: found.as_ref().to_string(),
            });
        }
    }
    Ok(())
}

/// Single-patient input row for the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Years, 29-77
    pub age: u8,
    /// 1 = male, 0 = female
    pub sex: u8,
    /// 0-3
    pub chest_pain_type: u8,
    /// mm Hg, 94-200
    pub resting_bp: u16,
    /// mg/dl, 126-564
    pub cholesterol: u16,
    /// 1 when fasting blood sugar > 120 mg/dl
    pub fasting_blood_sugar_flag: u8,
    /// 0-2
    pub resting_ecg: u8,
    /// bpm, 71-202
    pub max_heart_rate: u16,
    /// 1 when angina is exercise induced
    pub exercise_angina_flag: u8,
    /// 0.0-6.2 in steps of 0.1
    pub st_depression: f64,
    /// 0-2
    pub st_slope: u8,
    /// 0-4
    pub vessels_colored: u8,
    /// 0 = normal, 1 = fixed defect, 2 = reversible defect
    pub thalassemia_type: u8,
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self {
            age: 50,
            sex: 1,
            chest_pain_type: 1,
            resting_bp: 120,
            cholesterol: 250,
            fasting_blood_sugar_flag: 0,
            resting_ecg: 0,
            max_heart_rate: 150,
            exercise_angina_flag: 0,
            st_depression: 1.0,
            st_slope: 0,
            vessels_colored: 0,
            thalassemia_type: 0,
        }
    }
}

impl FeatureVector {
    /// Classifier input row in column order.
    #[must_use]
    pub fn to_row(&self) -> [f64; FEATURE_COUNT] {
        [
            f64::from(self.age),
            f64::from(self.sex),
            f64::from(self.chest_pain_type),
            f64::from(self.resting_bp),
            f64::from(self.cholesterol),
            f64::from(self.fasting_blood_sugar_flag),
            f64::from(self.resting_ecg),
            f64::from(self.max_heart_rate),
            f64::from(self.exercise_angina_flag),
            self.st_depression,
            f64::from(self.st_slope),
            f64::from(self.vessels_colored),
            f64::from(self.thalassemia_type),
        ]
    }

    /// Build a vector from a row, checking length and every field domain.
    ///
    /// # Errors
    /// Returns `SchemaError::Length` if the row is not 13 wide and
    /// `SchemaError::OutOfDomain` for the first value outside its field.
    pub fn from_row(row: &[f64]) -> Result<Self, SchemaError> {
        let row: &[f64; FEATURE_COUNT] = row.try_into().map_err(|_| SchemaError::Length {
            expected: FEATURE_COUNT,
            actual: row.len(),
        })?;
        check_domains(row)?;
        Ok(Self::from_domain_row(row))
    }

    /// Check every field against its domain.
    ///
    /// # Errors
    /// Returns `SchemaError::OutOfDomain` for the first offending field.
    pub fn validate(&self) -> Result<(), SchemaError> {
        check_domains(&self.to_row())
    }

    /// Build from a row whose values are already members of their domains.
    pub(crate) fn from_domain_row(row: &[f64; FEATURE_COUNT]) -> Self {
        Self {
            age: row[0] as u8,
            sex: row[1] as u8,
            chest_pain_type: row[2] as u8,
            resting_bp: row[3] as u16,
            cholesterol: row[4] as u16,
            fasting_blood_sugar_flag: row[5] as u8,
            resting_ecg: row[6] as u8,
            max_heart_rate: row[7] as u16,
            exercise_angina_flag: row[8] as u8,
            st_depression: row[9],
            st_slope: row[10] as u8,
            vessels_colored: row[11] as u8,
            thalassemia_type: row[12] as u8,
        }
    }
}

fn check_domains(row: &[f64; FEATURE_COUNT]) -> Result<(), SchemaError> {
    for (spec, &value) in FIELDS.iter().zip(row.iter()) {
        if !spec.domain.contains(value) {
            return Err(SchemaError::OutOfDomain {
                field: spec.name,
                value,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_table_matches_names() {
        for (spec, name) in FIELDS.iter().zip(FEATURE_NAMES) {
            assert_eq!(spec.name, name);
            assert!(spec.domain.contains(spec.default), "{} default", spec.name);
        }
    }

    #[test]
    fn test_default_vector_matches_field_defaults() {
        assert_eq!(FeatureVector::default().to_row(), default_values());
        assert!(FeatureVector::default().validate().is_ok());
    }

    #[test]
    fn test_row_order() {
        let v = FeatureVector {
            age: 63,
            sex: 0,
            chest_pain_type: 3,
            resting_bp: 145,
            cholesterol: 233,
            fasting_blood_sugar_flag: 1,
            resting_ecg: 2,
            max_heart_rate: 150,
            exercise_angina_flag: 1,
            st_depression: 2.3,
            st_slope: 1,
            vessels_colored: 4,
            thalassemia_type: 2,
        };
        let row = v.to_row();
        assert_eq!(row.len(), FEATURE_COUNT);
        assert_eq!(
            row,
            [63.0, 0.0, 3.0, 145.0, 233.0, 1.0, 2.0, 150.0, 1.0, 2.3, 1.0, 4.0, 2.0]
        );
        assert_eq!(FeatureVector::from_row(&row).expect("valid row"), v);
    }

    #[test]
    fn test_from_row_rejects_short_row() {
        let row = [50.0; 12];
        assert_eq!(
            FeatureVector::from_row(&row),
            Err(SchemaError::Length {
                expected: 13,
                actual: 12
            })
        );
    }

    #[test]
    fn test_from_row_rejects_out_of_domain() {
        let mut row = default_values();
        row[4] = 600.0;
        let err = FeatureVector::from_row(&row).expect_err("out of domain");
        assert!(matches!(
            err,
            SchemaError::OutOfDomain {
                field: "cholesterol",
                ..
            }
        ));
        assert_eq!(err.to_string(), "cholesterol is outside its allowed domain");

        let mut row = default_values();
        row[9] = 1.05;
        assert!(FeatureVector::from_row(&row).is_err());
    }

    #[test]
    fn test_boundaries_accepted() {
        let mut row = default_values();
        row[0] = 29.0;
        row[4] = 564.0;
        row[9] = 6.2;
        let v = FeatureVector::from_row(&row).expect("boundary values are valid");
        assert_eq!(v.age, 29);
        assert_eq!(v.cholesterol, 564);
        assert!((v.st_depression - 6.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_decimal_snap() {
        let domain = FIELDS[9].domain;
        assert!((domain.snap(1.04) - 1.0).abs() < f64::EPSILON);
        assert!((domain.snap(0.3) - 0.3).abs() < f64::EPSILON);
        assert!((domain.snap(9.0) - 6.2).abs() < f64::EPSILON);
        assert!(domain.contains(0.3));
        assert!(domain.contains(6.2));
        assert!(!domain.contains(6.3));
    }

    #[test]
    fn test_choice_step_follows_display_order() {
        // Radio options are listed [1, 0].
        let sex = FIELDS[1].domain;
        assert_eq!(sex.step(1.0, 1), 0.0);
        assert_eq!(sex.step(0.0, 1), 0.0);
        assert_eq!(sex.step(0.0, -1), 1.0);

        let vessels = FIELDS[11].domain;
        assert_eq!(vessels.step(4.0, 1), 4.0);
        assert_eq!(vessels.step(2.0, -1), 1.0);
    }

    #[test]
    fn test_coerce() {
        let age = &FIELDS[0];
        assert_eq!(age.coerce(10.0), 29.0);
        assert_eq!(age.coerce(80.4), 77.0);
        assert_eq!(age.coerce(f64::NAN), 50.0);
        assert_eq!(FIELDS[12].coerce(7.0), 2.0);
    }

    #[test]
    fn test_format_value() {
        assert_eq!(FIELDS[12].format_value(1.0), "Fixed Defect");
        assert_eq!(FIELDS[9].format_value(1.0), "1.0");
        assert_eq!(FIELDS[0].format_value(50.0), "50");
    }

    #[test]
    fn test_check_feature_order() {
        assert!(check_feature_order(&FEATURE_NAMES).is_ok());

        let mut swapped = FEATURE_NAMES;
        swapped.swap(3, 4);
        assert!(matches!(
            check_feature_order(&swapped),
            Err(SchemaError::Order { position: 3, .. })
        ));

        assert!(matches!(
            check_feature_order(&FEATURE_NAMES[..12]),
            Err(SchemaError::Length { actual: 12, .. })
        ));
    }
}
