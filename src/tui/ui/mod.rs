//! UI module: View components for the TUI.

pub mod form;
pub mod result;

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::adapters::integrity::Verification;
use crate::adapters::knn::ModelSummary;
use crate::domain::FieldSpec;
use crate::tui::styles::MedicalTheme;

pub fn render_header(f: &mut Frame, area: Rect, model: &ModelSummary) {
    let (status, status_style) = match model.verification {
        Verification::Signed => ("signed", MedicalTheme::text_secondary()),
        Verification::HashesVerified => ("hash verified", MedicalTheme::text_secondary()),
        Verification::Unverified => ("unverified", MedicalTheme::warning()),
    };

    let text = vec![
        Line::from(vec![
            Span::styled(" Heart Disease Prediction ", MedicalTheme::header()),
            Span::styled(
                " Provide the patient's medical information below.",
                MedicalTheme::text_secondary(),
            ),
        ]),
        Line::from(vec![
            Span::styled(
                format!(
                    " kNN k={} weights={} p={} | {} samples | ",
                    model.n_neighbors, model.weights, model.p, model.n_samples
                ),
                MedicalTheme::text_muted(),
            ),
            Span::styled(status, status_style),
        ]),
    ];

    let header = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(MedicalTheme::border()),
    );
    f.render_widget(header, area);
}

pub fn render_key_hints(f: &mut Frame, area: Rect, field: &FieldSpec) {
    let hints = Line::from(vec![
        Span::styled("[↑↓] ", MedicalTheme::key_hint()),
        Span::styled("Field ", MedicalTheme::key_desc()),
        Span::styled("[←→] ", MedicalTheme::key_hint()),
        Span::styled("Adjust ", MedicalTheme::key_desc()),
        Span::styled("[0-9] ", MedicalTheme::key_hint()),
        Span::styled("Type ", MedicalTheme::key_desc()),
        Span::styled("[Enter] ", MedicalTheme::key_hint()),
        Span::styled("Predict ", MedicalTheme::key_desc()),
        Span::styled("[R] ", MedicalTheme::key_hint()),
        Span::styled("Reset ", MedicalTheme::key_desc()),
        Span::styled("[Q] ", MedicalTheme::key_hint()),
        Span::styled("Quit", MedicalTheme::key_desc()),
    ]);

    let help = if field.help.is_empty() {
        Line::from("")
    } else {
        Line::from(Span::styled(
            format!("{}: {}", field.label, field.help),
            MedicalTheme::text_muted(),
        ))
    };

    let footer = Paragraph::new(vec![hints, help]).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(MedicalTheme::border()),
    );
    f.render_widget(footer, area);
}

pub fn render_disclaimer(f: &mut Frame, area: Rect) {
    let text = vec![
        Line::from(Span::styled(
            "Model: predicts the likelihood of heart disease using a KNN model",
            MedicalTheme::text_secondary(),
        )),
        Line::from(Span::styled(
            "DISCLAIMER: Indicative only; does not replace professional medical evaluation.",
            MedicalTheme::text_muted(),
        )),
    ];

    let p = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(MedicalTheme::border()),
        )
        .wrap(Wrap { trim: true });

    f.render_widget(p, area);
}
