//! Main TUI application state machine.
//!
//! Handles:
//! - Form navigation and editing
//! - The Idle / Predicted / Error cycle
//! - Terminal setup and teardown

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};

use crate::adapters::knn::{KnnClassifier, ModelSummary};
use crate::application::{InputCollector, PredictorService};

use super::ui::{
    form::{render_form, FormState},
    render_disclaimer, render_header, render_key_hints,
    result::{render_prediction, PredictionState},
};

/// Main application state
pub struct App {
    predictor: PredictorService<KnnClassifier>,

    /// Form widgets, read through the collector
    collector: InputCollector<FormState>,

    prediction: PredictionState,

    model: ModelSummary,

    should_quit: bool,
}

impl App {
    /// Create the application around an already loaded model.
    pub fn new(predictor: PredictorService<KnnClassifier>, model: ModelSummary) -> Self {
        Self {
            predictor,
            collector: InputCollector::new(FormState::default()),
            prediction: PredictionState::Idle,
            model,
            should_quit: false,
        }
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        // Restore terminal
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    fn render(&self, f: &mut Frame) {
        // A fresh vector every frame, from the current widget state.
        let features = self.collector.collect();

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Form + prediction
                Constraint::Length(3), // Key hints
                Constraint::Length(3), // Disclaimer
            ])
            .split(f.area());

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(rows[1]);

        let form = self.collector.source();
        render_header(f, rows[0], &self.model);
        render_form(f, body[0], form);
        render_prediction(f, body[1], &self.prediction, &features);
        render_key_hints(f, rows[2], form.selected_spec());
        render_disclaimer(f, rows[3]);
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        // Ctrl-Q quits; other Ctrl chords are ignored.
        if modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit |= key == KeyCode::Char('q');
            return;
        }

        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
                return;
            }
            KeyCode::Enter | KeyCode::Char('p') | KeyCode::Char('P') => {
                self.predict();
                return;
            }
            _ => {}
        }

        let form = self.collector.source_mut();
        let changed = match key {
            KeyCode::Up | KeyCode::BackTab => form.prev_field(),
            KeyCode::Down | KeyCode::Tab => form.next_field(),
            KeyCode::Left => form.step(-1),
            KeyCode::Right => form.step(1),
            KeyCode::Backspace => form.delete_char(),
            KeyCode::Char('r') | KeyCode::Char('R') => form.reset(),
            KeyCode::Char(c) => form.input_char(c),
            _ => false,
        };

        if changed {
            self.prediction = PredictionState::Idle;
        }
    }

    fn predict(&mut self) {
        self.collector.source_mut().commit_edit();
        let features = self.collector.collect();

        self.prediction = match self.predictor.predict(&features) {
            Ok(prediction) => PredictionState::Predicted { prediction },
            Err(e) => PredictionState::Error {
                message: e.to_string(),
            },
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::knn::{KnnArtifact, Weights, ARTIFACT_FORMAT, ARTIFACT_VERSION};
    use crate::domain::{default_values, RiskLabel, FEATURE_NAMES};
    use std::sync::Arc;

    /// Two training rows differing only in cholesterol.
    fn app() -> App {
        let mut low = default_values().to_vec();
        low[4] = 200.0;
        let mut high = default_values().to_vec();
        high[4] = 400.0;

        let artifact = KnnArtifact {
            format: ARTIFACT_FORMAT.into(),
            version: ARTIFACT_VERSION,
            description: String::new(),
            n_neighbors: 1,
            weights: Weights::Uniform,
            p: 2.0,
            feature_names: FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect(),
            classes: vec![0, 1],
            scaler: None,
            fit_x: vec![low, high],
            fit_y: vec![0, 1],
        };
        let knn = KnnClassifier::from_artifact(artifact).expect("valid artifact");
        let summary = knn.summary();
        let predictor = PredictorService::new(Arc::new(knn)).expect("feature order");
        App::new(predictor, summary)
    }

    fn press(app: &mut App, key: KeyCode) {
        app.handle_key(key, KeyModifiers::NONE);
    }

    fn label(app: &App) -> Option<RiskLabel> {
        match &app.prediction {
            PredictionState::Predicted { prediction } => Some(prediction.label),
            _ => None,
        }
    }

    #[test]
    fn test_starts_idle() {
        let app = app();
        assert_eq!(app.prediction, PredictionState::Idle);
        assert!(!app.should_quit);
    }

    #[test]
    fn test_predict_defaults() {
        let mut app = app();
        press(&mut app, KeyCode::Enter);
        // Default cholesterol 250 is nearest the 200 row.
        assert_eq!(label(&app), Some(RiskLabel::Negative));
    }

    #[test]
    fn test_predict_is_idempotent() {
        let mut app = app();
        press(&mut app, KeyCode::Char('p'));
        let first = label(&app);
        press(&mut app, KeyCode::Char('p'));
        assert_eq!(label(&app), first);
    }

    #[test]
    fn test_input_change_returns_to_idle() {
        let mut app = app();
        press(&mut app, KeyCode::Enter);
        assert!(label(&app).is_some());
        press(&mut app, KeyCode::Right);
        assert_eq!(app.prediction, PredictionState::Idle);
    }

    #[test]
    fn test_navigation_keeps_prediction() {
        let mut app = app();
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Down);
        assert!(label(&app).is_some());
    }

    #[test]
    fn test_typed_value_committed_on_predict() {
        let mut app = app();
        for _ in 0..4 {
            press(&mut app, KeyCode::Down);
        }
        for _ in 0..3 {
            press(&mut app, KeyCode::Backspace);
        }
        for c in "390".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.collector.collect().cholesterol, 390);
        assert_eq!(label(&app), Some(RiskLabel::Positive));
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut app = app();
        press(&mut app, KeyCode::Right);
        assert_eq!(app.collector.collect().age, 51);
        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.collector.collect().age, 50);
    }

    #[test]
    fn test_quit_keys() {
        for key in [KeyCode::Char('q'), KeyCode::Esc] {
            let mut app = app();
            press(&mut app, key);
            assert!(app.should_quit);
        }

        let mut app = app();
        app.handle_key(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert!(app.should_quit);
    }
}
