//! Login, signup, password-reset and email-verification screens.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use super::task_form::centered;
use super::theme::{self, Palette};
use crate::app::{App, PairField, PairForm, VerifyStatus};

const CARD_WIDTH: u16 = 56;

fn card<'a>(palette: &Palette, title: &'a str) -> Block<'a> {
    Block::default()
        .title(Span::styled(title, palette.panel_title(palette.accent)))
        .borders(Borders::ALL)
        .border_style(palette.highlighted())
        .style(palette.normal())
}

fn field_lines<'a>(
    palette: &Palette,
    label: &'a str,
    value: String,
    focused: bool,
) -> [Line<'a>; 2] {
    let label_style = if focused {
        palette.highlighted()
    } else {
        palette.dimmed()
    };
    [
        Line::from(Span::styled(label, label_style)),
        Line::from(Span::styled(format!("  {value}"), palette.normal())),
    ]
}

fn pair_lines<'a>(
    palette: &Palette,
    form: &PairForm,
    labels: [&'a str; 2],
    first_masked: bool,
) -> Vec<Line<'a>> {
    let first = if first_masked {
        theme::masked(&form.first)
    } else {
        form.first.clone()
    };
    let first_focused = form.focus == PairField::First;
    let mut lines = Vec::with_capacity(4);
    lines.extend(field_lines(
        palette,
        labels[0],
        theme::input_text(&first, first_focused),
        first_focused,
    ));
    lines.extend(field_lines(
        palette,
        labels[1],
        theme::input_text(&theme::masked(&form.second), !first_focused),
        !first_focused,
    ));
    lines
}

/// Login (`signup == false`) or signup screen.
pub fn render_credentials(frame: &mut Frame, area: Rect, app: &App, signup: bool) {
    let palette = theme::palette(app.dark_mode);

    if !signup && let Some(email) = &app.forgot_email {
        render_forgot(frame, area, app, email);
        return;
    }

    let (title, action, busy_label) = if signup {
        ("Create Account", "Sign Up", "Creating account...")
    } else {
        ("Welcome Back", "Sign In", "Signing in...")
    };

    let mut lines = pair_lines(palette, &app.credentials, ["Email", "Password"], false);
    lines.push(Line::raw(""));
    let action = if app.busy { busy_label } else { action };
    lines.push(Line::from(Span::styled(format!("Enter: {action}"), palette.bold())));
    lines.push(Line::raw(""));
    if signup {
        lines.push(Line::from(Span::styled(
            "Already have an account? F3: Sign in",
            palette.dimmed(),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "New user? F4: Sign up",
            palette.dimmed(),
        )));
        lines.push(Line::from(Span::styled(
            "Forgot your password? F5: Reset it here",
            palette.dimmed(),
        )));
    }

    let popup = centered(area, CARD_WIDTH, 12);
    frame.render_widget(Paragraph::new(lines).block(card(palette, title)), popup);
}

fn render_forgot(frame: &mut Frame, area: Rect, app: &App, email: &str) {
    let palette = theme::palette(app.dark_mode);
    let mut lines = vec![
        Line::from(Span::styled(
            "Enter your email and we'll send you a reset link.",
            palette.dimmed(),
        )),
        Line::raw(""),
    ];
    lines.extend(field_lines(palette, "Email", theme::input_text(email, true), true));
    lines.push(Line::raw(""));
    let action = if app.busy { "Sending..." } else { "Send Reset Link" };
    lines.push(Line::from(vec![
        Span::styled(format!("Enter: {action}"), palette.bold()),
        Span::styled("  Esc: back to login", palette.dimmed()),
    ]));

    let popup = centered(area, CARD_WIDTH, 9);
    frame.render_widget(
        Paragraph::new(lines).block(card(palette, "Reset Password")),
        popup,
    );
}

/// New-password screen reached from a reset link.
pub fn render_reset(frame: &mut Frame, area: Rect, app: &App) {
    let palette = theme::palette(app.dark_mode);

    let lines = if app.reset_ready {
        let mut lines = vec![
            Line::from(Span::styled("Enter your new password below.", palette.dimmed())),
            Line::raw(""),
        ];
        lines.extend(pair_lines(
            palette,
            &app.reset,
            ["New Password", "Confirm New Password"],
            true,
        ));
        lines.push(Line::raw(""));
        let action = if app.busy { "Updating..." } else { "Update Password" };
        lines.push(Line::from(Span::styled(format!("Enter: {action}"), palette.bold())));
        lines
    } else if app.busy {
        vec![Line::from(Span::styled("Checking reset link...", palette.dimmed()))]
    } else {
        vec![Line::from(Span::styled(
            "This reset link cannot be used.",
            palette.panel_title(palette.error),
        ))]
    };

    let popup = centered(area, CARD_WIDTH, 11);
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(card(palette, "Set New Password")),
        popup,
    );
}

/// Email-verification progress screen.
pub fn render_verify(frame: &mut Frame, area: Rect, app: &App) {
    let palette = theme::palette(app.dark_mode);

    let (title, lines) = match app.verify {
        VerifyStatus::Idle | VerifyStatus::Verifying => (
            "Verifying your email...",
            vec![Line::from(Span::styled(
                "Please wait while we confirm your email address.",
                palette.dimmed(),
            ))],
        ),
        VerifyStatus::Verified => (
            "Email Verified!",
            vec![
                Line::from(Span::styled(
                    "Your email address has been confirmed. You can now sign in to your account.",
                    palette.normal(),
                )),
                Line::raw(""),
                Line::from(Span::styled(
                    "You will be automatically redirected to the dashboard in a few seconds...",
                    palette.dimmed(),
                )),
            ],
        ),
        VerifyStatus::Failed => (
            "Verification Failed",
            vec![
                Line::from(Span::styled(
                    app.notice
                        .as_ref()
                        .map_or("There was an error verifying your email address.", |n| {
                            n.text.as_str()
                        })
                        .to_string(),
                    palette.panel_title(palette.error),
                )),
                Line::raw(""),
                Line::from(Span::styled(
                    "F4: Try signing up again   F3: Go to login",
                    palette.dimmed(),
                )),
            ],
        ),
    };

    let popup = centered(area, CARD_WIDTH + 8, 8);
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(card(palette, title)),
        popup,
    );
}
