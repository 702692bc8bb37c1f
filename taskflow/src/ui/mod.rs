//! Terminal UI rendering.

pub mod about;
pub mod auth_screens;
pub mod dashboard;
pub mod navbar;
pub mod status_bar;
pub mod task_form;
pub mod theme;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Paragraph},
};

use crate::app::App;
use crate::session::Route;

/// Main draw function for the entire UI.
pub fn draw(frame: &mut Frame, app: &App) {
    let palette = theme::palette(app.dark_mode);
    frame.render_widget(Block::default().style(palette.normal()), frame.area());

    // Navbar on top, status bar at bottom
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    navbar::render(frame, chunks[0], app);
    match app.route() {
        Route::Home | Route::Dashboard => dashboard::render(frame, chunks[1], app),
        Route::About => about::render(frame, chunks[1], app),
        Route::Login => auth_screens::render_credentials(frame, chunks[1], app, false),
        Route::Signup => auth_screens::render_credentials(frame, chunks[1], app, true),
        Route::VerifyEmail => auth_screens::render_verify(frame, chunks[1], app),
        Route::ResetPassword => auth_screens::render_reset(frame, chunks[1], app),
        Route::NotFound(path) => render_not_found(frame, chunks[1], app, path),
    }
    status_bar::render(frame, chunks[2], app);
}

fn render_not_found(frame: &mut Frame, area: Rect, app: &App, path: &str) {
    let palette = theme::palette(app.dark_mode);
    let lines = vec![
        Line::from(Span::styled("Page not found", palette.panel_title(palette.error))),
        Line::from(Span::styled(format!("Nothing lives at {path}"), palette.dimmed())),
        Line::from(Span::styled("F1: Dashboard", palette.bold())),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}
