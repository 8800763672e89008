//! # Heartcheck
//!
//! Heart disease risk prediction form backed by a pre-trained
//! k-nearest-neighbors classifier.
//!
//! This crate provides:
//! - A 13-field clinical input form with bounded widgets
//! - Validated, deterministic kNN inference over an exported model
//! - Optional SHA-256 / Ed25519 integrity checks on the model artifact
//! - Terminal UI for local use
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (FeatureVector, field table, RiskLabel)
//! - `ports`: Trait definitions (Classifier, FeatureSource)
//! - `adapters`: Concrete implementations (kNN, integrity, log sanitizer)
//! - `application`: Use cases (InputCollector, PredictorService)
//! - `tui`: Terminal user interface
//! - `config`: Environment-driven settings

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

pub use domain::{FeatureVector, Prediction, RiskLabel, SchemaError};

/// Result type for Heartcheck operations
pub type Result<T> = std::result::Result<T, HeartcheckError>;

/// Main error type for Heartcheck
#[derive(Debug, thiserror::Error)]
pub enum HeartcheckError {
    #[error("Model could not be loaded: {0}")]
    ModelLoad(#[from] adapters::ModelLoadError),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(#[from] domain::SchemaError),

    #[error("Classifier rejected input: {0}")]
    Classifier(#[from] ports::ClassifierError),
}
