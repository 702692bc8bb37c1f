//! Theme and styling for the TUI.
//!
//! Two palettes are available; the user toggles between them and the
//! choice is persisted by [`crate::storage::LocalStore`].

use ratatui::style::{Color, Modifier, Style};

use taskflow_proto::task::{Priority, TaskStatus};

use crate::auth::Tone;

/// Colors for one appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Primary foreground.
    pub fg: Color,
    /// Secondary foreground (metadata, hints).
    pub fg_dim: Color,
    /// Background.
    pub bg: Color,
    /// Focus and accent color.
    pub accent: Color,
    /// Success color.
    pub success: Color,
    /// Warning color.
    pub warning: Color,
    /// Error color.
    pub error: Color,
    /// Navbar and status bar background.
    pub bar_bg: Color,
}

/// Dark appearance.
pub const DARK: Palette = Palette {
    fg: Color::White,
    fg_dim: Color::Gray,
    bg: Color::Rgb(17, 24, 39),
    accent: Color::Cyan,
    success: Color::Green,
    warning: Color::Yellow,
    error: Color::Red,
    bar_bg: Color::Rgb(30, 30, 50),
};

/// Light appearance.
pub const LIGHT: Palette = Palette {
    fg: Color::Black,
    fg_dim: Color::DarkGray,
    bg: Color::Rgb(243, 244, 246),
    accent: Color::Blue,
    success: Color::Rgb(22, 128, 61),
    warning: Color::Rgb(180, 83, 9),
    error: Color::Rgb(185, 28, 28),
    bar_bg: Color::Rgb(209, 213, 219),
};

/// Palette for the given mode.
#[must_use]
pub const fn palette(dark_mode: bool) -> &'static Palette {
    if dark_mode { &DARK } else { &LIGHT }
}

impl Palette {
    /// Normal text style.
    #[must_use]
    pub fn normal(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    /// Dimmed text style.
    #[must_use]
    pub fn dimmed(&self) -> Style {
        Style::default().fg(self.fg_dim)
    }

    /// Bold text style.
    #[must_use]
    pub fn bold(&self) -> Style {
        Style::default().fg(self.fg).add_modifier(Modifier::BOLD)
    }

    /// Focused borders and active labels.
    #[must_use]
    pub fn highlighted(&self) -> Style {
        Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
    }

    /// Selected list row.
    #[must_use]
    pub fn selected(&self) -> Style {
        Style::default()
            .fg(self.bg)
            .bg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    /// Navbar and status bar background.
    #[must_use]
    pub fn bar(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bar_bg)
    }

    /// Panel title in `color`.
    #[must_use]
    pub fn panel_title(&self, color: Color) -> Style {
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    /// Badge color for a priority.
    #[must_use]
    pub const fn priority(&self, priority: Priority) -> Color {
        match priority {
            Priority::High => self.error,
            Priority::Medium => self.warning,
            Priority::Low => self.success,
        }
    }

    /// Badge color for a status.
    #[must_use]
    pub const fn status(&self, status: TaskStatus) -> Color {
        match status {
            TaskStatus::Todo => self.fg_dim,
            TaskStatus::InProgress => self.accent,
            TaskStatus::Completed => self.success,
        }
    }

    /// Color for a notice.
    #[must_use]
    pub const fn tone(&self, tone: Tone) -> Color {
        match tone {
            Tone::Info => self.accent,
            Tone::Success => self.success,
            Tone::Error => self.error,
        }
    }
}

/// Input text followed by the cursor glyph when focused.
#[must_use]
pub fn input_text(value: &str, focused: bool) -> String {
    if focused {
        format!("{value}█")
    } else {
        value.to_string()
    }
}

/// Bullets standing in for a secret of `value`'s length.
#[must_use]
pub fn masked(value: &str) -> String {
    "•".repeat(value.chars().count())
}
