//! Ports layer: Trait definitions for external collaborators.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and the model implementation and input surface.

mod classifier;
mod source;

pub use classifier::{Classifier, ClassifierError};
pub use source::FeatureSource;
