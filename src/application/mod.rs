//! Application layer: Use cases and services.
//!
//! One interaction is collect, then classify, then display. These services
//! cover the first two; the TUI handles display.

mod collector;
mod predictor;

pub use collector::InputCollector;
pub use predictor::PredictorService;
