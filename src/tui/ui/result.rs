//! Prediction panel.

use ratatui::{
    layout::{Alignment, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::domain::{FeatureVector, Prediction};
use crate::tui::styles::MedicalTheme;

/// What the prediction panel shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PredictionState {
    /// Inputs collected, no prediction requested
    #[default]
    Idle,
    /// Prediction computed for the current inputs
    Predicted { prediction: Prediction },
    /// The last predict cycle failed
    Error { message: String },
}

/// Render the prediction panel.
///
/// `features` is the vector collected for this frame; it is what a Predict
/// action would classify.
pub fn render_prediction(
    f: &mut Frame,
    area: Rect,
    state: &PredictionState,
    features: &FeatureVector,
) {
    let (lines, border_style) = match state {
        PredictionState::Idle => (
            vec![
                Line::from(""),
                Line::from(Span::styled(
                    "Press [Enter] to predict the likelihood of heart disease",
                    MedicalTheme::text_secondary(),
                )),
                Line::from(Span::styled(
                    "based on the provided inputs.",
                    MedicalTheme::text_secondary(),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    format!("{} inputs ready", features.to_row().len()),
                    MedicalTheme::text_muted(),
                )),
            ],
            MedicalTheme::border(),
        ),
        PredictionState::Predicted { prediction } => {
            let style = MedicalTheme::risk_label(prediction.label);
            (
                vec![
                    Line::from(Span::styled("Prediction Result", MedicalTheme::title())),
                    Line::from(""),
                    Line::from(Span::styled(prediction.label.headline(), style)),
                    Line::from(""),
                    Line::from(Span::styled(
                        format!(
                            "Computed {}",
                            prediction.predicted_at.format("%Y-%m-%d %H:%M:%S UTC")
                        ),
                        MedicalTheme::text_muted(),
                    )),
                ],
                style,
            )
        }
        PredictionState::Error { message } => (
            vec![
                Line::from(Span::styled("! Error", MedicalTheme::danger())),
                Line::from(""),
                Line::from(Span::styled(message.clone(), MedicalTheme::text())),
            ],
            MedicalTheme::danger(),
        ),
    };

    let content = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(Span::styled(" Prediction ", MedicalTheme::subtitle()))
                .borders(Borders::ALL)
                .border_style(border_style),
        );

    f.render_widget(content, area);
}
