//! Prediction output types.
//!
//! The classifier is binary; no probability or confidence is exposed.

use super::features::SchemaError;

/// Binary heart disease risk label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLabel {
    /// Class 1: heart disease likely
    Positive,
    /// Class 0: heart disease unlikely
    Negative,
}

impl RiskLabel {
    /// Map a raw classifier class to a label.
    ///
    /// # Errors
    /// Returns `SchemaError::UnknownLabel` for anything other than 0 or 1.
    pub fn from_class(class: i64) -> Result<Self, SchemaError> {
        match class {
            1 => Ok(Self::Positive),
            0 => Ok(Self::Negative),
            other => Err(SchemaError::UnknownLabel(other)),
        }
    }

    /// Raw class value.
    #[must_use]
    pub fn class(&self) -> u8 {
        match self {
            Self::Positive => 1,
            Self::Negative => 0,
        }
    }

    /// Full sentence shown to the user.
    #[must_use]
    pub fn headline(&self) -> &'static str {
        match self {
            Self::Positive => "The patient is likely to have heart disease.",
            Self::Negative => "The patient is unlikely to have heart disease.",
        }
    }

    /// Associated color for TUI display (RGB).
    #[must_use]
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Self::Positive => (244, 63, 94),  // Rose (#F43F5E)
            Self::Negative => (16, 185, 129), // Emerald (#10B981)
        }
    }
}

impl std::fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Positive => write!(f, "POSITIVE"),
            Self::Negative => write!(f, "NEGATIVE"),
        }
    }
}

/// A computed prediction. Ephemeral: shown once and never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: RiskLabel,
    pub predicted_at: chrono::DateTime<chrono::Utc>,
}

impl Prediction {
    #[must_use]
    pub fn new(label: RiskLabel) -> Self {
        Self {
            label,
            predicted_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_from_class() {
        assert_eq!(RiskLabel::from_class(1), Ok(RiskLabel::Positive));
        assert_eq!(RiskLabel::from_class(0), Ok(RiskLabel::Negative));
        assert_eq!(RiskLabel::from_class(2), Err(SchemaError::UnknownLabel(2)));
        assert_eq!(RiskLabel::from_class(-1), Err(SchemaError::UnknownLabel(-1)));
    }

    #[test]
    fn test_headlines() {
        assert_eq!(
            RiskLabel::Positive.headline(),
            "The patient is likely to have heart disease."
        );
        assert_eq!(
            RiskLabel::Negative.headline(),
            "The patient is unlikely to have heart disease."
        );
    }

    #[test]
    fn test_class_roundtrip() {
        for label in [RiskLabel::Positive, RiskLabel::Negative] {
            assert_eq!(RiskLabel::from_class(i64::from(label.class())), Ok(label));
        }
    }
}
