//! Adapters layer: Concrete implementations of ports.
//!
//! - `knn`: k-nearest-neighbors classifier loaded from a JSON export
//! - `integrity`: SHA-256 manifest and Ed25519 signature checks for model files
//! - `sanitize`: redaction filter for log output

pub mod integrity;
pub mod knn;
pub mod sanitize;

pub use knn::ModelLoadError;
