//! Patient details form: 13 bounded widgets.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::domain::{default_values, FieldDomain, FieldSpec, WidgetKind, FEATURE_COUNT, FIELDS};
use crate::ports::FeatureSource;
use crate::tui::styles::MedicalTheme;

const SLIDER_WIDTH: usize = 24;

/// Widget state for every field.
///
/// Values are always members of their field's domain. Typed digits live in
/// `edit_buffer` until the field loses focus or a prediction is requested.
#[derive(Debug, Clone)]
pub struct FormState {
    values: [f64; FEATURE_COUNT],
    selected: usize,
    edit_buffer: Option<String>,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            values: default_values(),
            selected: 0,
            edit_buffer: None,
        }
    }
}

impl FeatureSource for FormState {
    fn feature_values(&self) -> [f64; FEATURE_COUNT] {
        self.values
    }
}

impl FormState {
    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_spec(&self) -> &'static FieldSpec {
        &FIELDS[self.selected]
    }

    pub fn value(&self, index: usize) -> f64 {
        self.values[index]
    }

    pub fn is_editing(&self) -> bool {
        self.edit_buffer.is_some()
    }

    /// Move to the next field. Returns true if a pending edit changed a value.
    pub fn next_field(&mut self) -> bool {
        let changed = self.commit_edit();
        self.selected = (self.selected + 1) % FEATURE_COUNT;
        changed
    }

    /// Move to the previous field. Returns true if a pending edit changed a value.
    pub fn prev_field(&mut self) -> bool {
        let changed = self.commit_edit();
        self.selected = self.selected.checked_sub(1).unwrap_or(FEATURE_COUNT - 1);
        changed
    }

    /// Step the selected value by `delta` steps or options.
    pub fn step(&mut self, delta: i32) -> bool {
        self.commit_edit();
        let i = self.selected;
        let next = FIELDS[i].domain.step(self.values[i], delta);
        self.set(i, next)
    }

    /// Type into the selected numeric field.
    pub fn input_char(&mut self, c: char) -> bool {
        let accepted = match self.selected_spec().domain {
            FieldDomain::Integer { .. } => c.is_ascii_digit(),
            FieldDomain::Decimal { .. } => {
                c.is_ascii_digit()
                    || (c == '.' && !self.edit_buffer.as_deref().unwrap_or("").contains('.'))
            }
            FieldDomain::Choice(_) => false,
        };
        if accepted {
            let buffer = self.edit_buffer.get_or_insert_with(String::new);
            if buffer.len() < 8 {
                buffer.push(c);
            }
        }
        accepted
    }

    /// Delete the last typed character; starts editing from the current value.
    pub fn delete_char(&mut self) -> bool {
        if matches!(self.selected_spec().domain, FieldDomain::Choice(_)) {
            return false;
        }
        let current = self.selected_spec().format_value(self.values[self.selected]);
        let buffer = self.edit_buffer.get_or_insert(current);
        buffer.pop().is_some()
    }

    /// Apply the pending edit, if any, coerced into the field's domain.
    ///
    /// Empty or unparsable input leaves the value unchanged.
    pub fn commit_edit(&mut self) -> bool {
        let Some(buffer) = self.edit_buffer.take() else {
            return false;
        };
        match buffer.parse::<f64>() {
            Ok(value) => {
                let i = self.selected;
                self.set(i, FIELDS[i].coerce(value))
            }
            Err(_) => false,
        }
    }

    /// Restore every field to its default.
    pub fn reset(&mut self) -> bool {
        let changed = self.values != default_values() || self.edit_buffer.is_some();
        *self = Self {
            selected: self.selected,
            ..Self::default()
        };
        changed
    }

    fn set(&mut self, index: usize, value: f64) -> bool {
        let changed = self.values[index] != value;
        self.values[index] = value;
        changed
    }

    fn display_text(&self, index: usize) -> String {
        match (&self.edit_buffer, index == self.selected) {
            (Some(buffer), true) => buffer.clone(),
            _ => FIELDS[index].format_value(self.values[index]),
        }
    }
}

/// Render the form as two columns of bordered fields.
pub fn render_form(f: &mut Frame, area: Rect, state: &FormState) {
    let block = Block::default()
        .title(Span::styled(" Patient Details ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(inner);

    let mid = (FEATURE_COUNT + 1) / 2;
    render_column(f, columns[0], state, 0..mid);
    render_column(f, columns[1], state, mid..FEATURE_COUNT);
}

fn render_column(f: &mut Frame, area: Rect, state: &FormState, range: std::ops::Range<usize>) {
    let constraints: Vec<Constraint> = range
        .clone()
        .map(|_| Constraint::Length(3))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (slot, index) in range.enumerate() {
        render_field(f, chunks[slot], state, index);
    }
}

fn render_field(f: &mut Frame, area: Rect, state: &FormState, index: usize) {
    let spec = &FIELDS[index];
    let is_selected = index == state.selected;

    let (border_style, title_style) = if is_selected {
        (MedicalTheme::border_focused(), MedicalTheme::focused())
    } else {
        (MedicalTheme::border(), MedicalTheme::text_secondary())
    };

    let block = Block::default()
        .title(Span::styled(format!(" {} ", spec.label), title_style))
        .borders(Borders::ALL)
        .border_style(border_style);

    let mut spans = vec![Span::raw(" ")];
    spans.extend(widget_spans(spec, state.values[index], &state.display_text(index)));
    if is_selected && state.is_editing() {
        spans.push(Span::styled("▌", MedicalTheme::cursor()));
    }

    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn widget_spans(spec: &FieldSpec, value: f64, text: &str) -> Vec<Span<'static>> {
    match (spec.widget, spec.domain) {
        (WidgetKind::Radio, FieldDomain::Choice(options)) => options
            .iter()
            .flat_map(|o| {
                let on = f64::from(o.value) == value;
                let mark = if on { "(•) " } else { "( ) " };
                let style = if on {
                    MedicalTheme::text()
                } else {
                    MedicalTheme::text_muted()
                };
                [Span::styled(format!("{mark}{}", o.label), style), Span::raw("  ")]
            })
            .collect(),
        (WidgetKind::SelectSlider, FieldDomain::Choice(options)) => {
            let mut spans = Vec::new();
            for (i, o) in options.iter().enumerate() {
                if i > 0 {
                    spans.push(Span::styled("─", MedicalTheme::text_muted()));
                }
                if f64::from(o.value) == value {
                    spans.push(Span::styled(format!("[{}]", o.label), MedicalTheme::focused()));
                } else {
                    spans.push(Span::styled(format!(" {} ", o.label), MedicalTheme::text_muted()));
                }
            }
            spans
        }
        (WidgetKind::Slider, domain) => {
            let (lo, hi) = domain.bounds();
            let ratio = if hi > lo { (value - lo) / (hi - lo) } else { 0.0 };
            let filled = ((ratio * SLIDER_WIDTH as f64).round() as usize).min(SLIDER_WIDTH);
            vec![
                Span::styled("━".repeat(filled), MedicalTheme::focused()),
                Span::styled("●", MedicalTheme::text()),
                Span::styled("─".repeat(SLIDER_WIDTH - filled), MedicalTheme::text_muted()),
                Span::styled(format!(" {text}"), MedicalTheme::text()),
            ]
        }
        (WidgetKind::SelectBox, _) => vec![
            Span::styled(text.to_string(), MedicalTheme::text()),
            Span::styled("  ▾", MedicalTheme::text_muted()),
        ],
        _ => {
            let (lo, hi) = spec.domain.bounds();
            vec![
                Span::styled(text.to_string(), MedicalTheme::text()),
                Span::styled(
                    format!("  ({lo:.0}-{hi:.0})"),
                    MedicalTheme::text_muted(),
                ),
            ]
        }
    }
}
