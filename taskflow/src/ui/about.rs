//! Static about screen.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use super::theme;
use crate::app::App;

const FEATURES: [(&str, &str); 6] = [
    (
        "Priority Management",
        "Organize tasks by priority levels with visual indicators to focus on what matters most.",
    ),
    (
        "Due Date Tracking",
        "Never miss deadlines with due dates and overdue task highlighting.",
    ),
    (
        "Real-time Updates",
        "Instant task status updates and progress tracking.",
    ),
    (
        "Data Security",
        "Your tasks are stored per account and only visible to you.",
    ),
    (
        "User-Friendly",
        "Keyboard-driven interface designed for productivity with minimal learning curve.",
    ),
    (
        "Task Categories",
        "Organize tasks into custom categories for better project management.",
    ),
];

/// Render the about screen.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let palette = theme::palette(app.dark_mode);

    let mut lines = vec![
        Line::from(Span::styled(
            "TaskFlow is a task management tool that helps you organize, prioritize, \
             and complete your work efficiently.",
            palette.normal(),
        )),
        Line::raw(""),
    ];
    for (title, description) in FEATURES {
        lines.push(Line::from(Span::styled(
            format!("• {title}"),
            palette.panel_title(palette.accent),
        )));
        lines.push(Line::from(Span::styled(format!("  {description}"), palette.dimmed())));
    }
    lines.push(Line::raw(""));
    let cta = if app.auth.is_signed_in() {
        "F1: Open your dashboard"
    } else {
        "Ready to get started? F4: Create an account"
    };
    lines.push(Line::from(Span::styled(cta, palette.bold())));

    let block = Block::default()
        .title(Span::styled("About TaskFlow", palette.panel_title(palette.accent)))
        .borders(Borders::ALL)
        .border_style(palette.normal());
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: true }).block(block),
        area,
    );
}
