//! TUI module: Terminal User Interface using Ratatui.
//!
//! One screen: the patient details form, the prediction panel and the model
//! footer.

mod app;
mod styles;
mod ui;

pub use app::App;
pub use styles::MedicalTheme;
pub use ui::form::FormState;
pub use ui::result::PredictionState;
