//! Create/edit task popup.

use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use super::theme;
use crate::app::App;
use crate::tasks::{FormField, FormMode, TaskForm};

/// Render `form` as a popup centered in `area`.
pub fn render(frame: &mut Frame, area: Rect, app: &App, form: &TaskForm) {
    let palette = theme::palette(app.dark_mode);
    let popup = centered(area, 60, 15);

    let title = match form.mode() {
        FormMode::Create => "Add New Task",
        FormMode::Edit(_) => "Edit Task",
    };

    let mut lines = Vec::with_capacity(FormField::ALL.len() * 2 + 2);
    for field in FormField::ALL {
        let focused = form.focus() == field;
        let label_style = if focused {
            palette.highlighted()
        } else {
            palette.dimmed()
        };
        lines.push(Line::from(Span::styled(field.label(), label_style)));

        let value = match field {
            FormField::Priority if focused => format!("◀ {} ▶", form.value(field)),
            FormField::Priority => form.value(field).to_string(),
            FormField::DueDate if form.value(field).is_empty() && !focused => {
                "YYYY-MM-DD".to_string()
            }
            _ => theme::input_text(form.value(field), focused),
        };
        let value_style = match field {
            FormField::Priority => palette.panel_title(palette.priority(form.priority())),
            _ => palette.normal(),
        };
        lines.push(Line::from(Span::styled(format!("  {value}"), value_style)));
    }
    lines.push(Line::raw(""));
    let submit = match form.mode() {
        FormMode::Create => "Add Task",
        FormMode::Edit(_) => "Update Task",
    };
    lines.push(Line::from(vec![
        Span::styled(format!("Enter: {submit}"), palette.bold()),
        Span::styled("  Tab: next field  ←→: priority  Esc: cancel", palette.dimmed()),
    ]));

    let block = Block::default()
        .title(Span::styled(title, palette.panel_title(palette.accent)))
        .borders(Borders::ALL)
        .border_style(palette.highlighted())
        .style(palette.normal());

    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

/// A `width` x `height` rectangle centered in `area`, clipped to it.
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .areas(row);
    cell
}
