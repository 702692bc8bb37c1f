//! Top navigation bar.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::theme;
use crate::app::App;
use crate::session::Route;

/// Render the navbar: brand, screen links, account area and mode toggle.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let palette = theme::palette(app.dark_mode);
    let current = app.route();

    let link = |key: &'static str, label: &'static str, route: &Route| {
        let style = if current == route {
            palette.highlighted()
        } else {
            palette.bar()
        };
        [
            Span::styled(key, palette.dimmed()),
            Span::styled(format!(" {label}  "), style),
        ]
    };

    let mut spans = vec![Span::styled(" ☑ Todo Manager ", palette.bold()), Span::raw("  ")];
    spans.extend(link("F1", "Dashboard", &Route::Dashboard));
    spans.extend(link("F2", "About", &Route::About));

    match app.auth.email() {
        Some(email) => {
            spans.push(Span::styled(format!("{email}  "), palette.bar()));
            spans.extend(link("F3", "Logout", &Route::Login));
        }
        None if app.auth.is_signed_in() => {
            spans.extend(link("F3", "Logout", &Route::Login));
        }
        None => {
            spans.extend(link("F3", "Login", &Route::Login));
            spans.extend(link("F4", "Sign Up", &Route::Signup));
        }
    }

    let mode = if app.dark_mode { "☀ light" } else { "☾ dark" };
    spans.push(Span::styled("^D", palette.dimmed()));
    spans.push(Span::styled(format!(" {mode}"), palette.bar()));

    let paragraph = Paragraph::new(Line::from(spans)).style(palette.bar());
    frame.render_widget(paragraph, area);
}
