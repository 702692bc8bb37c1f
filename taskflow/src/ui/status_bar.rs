//! Status bar rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::theme;
use crate::app::{App, DashboardFocus};
use crate::session::Route;

/// Key hints for the current screen.
#[must_use]
pub fn help_text(app: &App) -> &'static str {
    match app.route() {
        Route::Home | Route::Dashboard if app.form.is_some() => {
            "Enter: save | Tab: next field | ←→: priority | Esc: cancel"
        }
        Route::Home | Route::Dashboard if app.focus == DashboardFocus::Search => {
            "Type to search | Enter/Esc: done"
        }
        Route::Home | Route::Dashboard if app.auth.is_signed_in() => {
            "n: new | e: edit | d: delete | Enter: next status | 1-3: set status | f: filter | /: search | r: refresh | Esc: quit"
        }
        Route::Home | Route::Dashboard => "F3: login | F4: sign up | Esc: quit",
        Route::Login if app.forgot_email.is_some() => "Enter: send | Esc: back",
        Route::Login | Route::Signup | Route::ResetPassword => {
            "Tab: switch field | Enter: submit | ^B: back | Esc: quit"
        }
        Route::About | Route::VerifyEmail | Route::NotFound(_) => "^B: back | Esc: quit",
    }
}

/// Render the status bar at the bottom of the screen.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let palette = theme::palette(app.dark_mode);

    let (dot_color, status_text) = if app.busy {
        (palette.warning, "Working...")
    } else if app.loading {
        (palette.warning, "Loading tasks...")
    } else if app.auth.is_signed_in() {
        (palette.success, "Signed in")
    } else {
        (palette.fg_dim, "Signed out")
    };

    let mut spans = vec![
        Span::styled(app.route().path(), palette.bold()),
        Span::raw(" | "),
        Span::styled("●", palette.bar().fg(dot_color)),
        Span::raw(format!(" {status_text}")),
        Span::raw(" | "),
    ];
    match &app.notice {
        Some(notice) => spans.push(Span::styled(
            notice.text.as_str(),
            palette.panel_title(palette.tone(notice.tone)),
        )),
        None => spans.push(Span::styled(help_text(app), palette.dimmed())),
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(palette.bar());
    frame.render_widget(paragraph, area);
}
