//! Dashboard rendering: header, stats, filter/search row and task list.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph},
};

use taskflow_proto::task::Task;

use super::{task_form, theme};
use crate::app::{App, DashboardFocus};
use crate::tasks::StatusFilter;

/// Render the dashboard into `area`.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Stats
            Constraint::Length(3), // Filter + search
            Constraint::Min(3),    // Tasks
        ])
        .split(area);

    render_header(frame, chunks[0], app);
    render_stats(frame, chunks[1], app);
    render_controls(frame, chunks[2], app);
    render_tasks(frame, chunks[3], app);

    if let Some(form) = &app.form {
        task_form::render(frame, area, app, form);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let palette = theme::palette(app.dark_mode);
    let stats = app.view().stats;

    let summary = if app.auth.is_signed_in() {
        format!("{} tasks • {} completed", stats.total, stats.completed)
    } else {
        "Login to start managing your tasks".to_string()
    };

    let lines = vec![
        Line::from(vec![
            Span::styled("Task Dashboard", palette.panel_title(palette.accent)),
            Span::raw("  "),
            Span::styled(app.today.format("%B %-d, %A").to_string(), palette.bold()),
        ]),
        Line::from(Span::styled(
            "Manage and track your tasks efficiently",
            palette.dimmed(),
        )),
        Line::from(Span::styled(summary, palette.normal())),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_stats(frame: &mut Frame, area: Rect, app: &App) {
    let palette = theme::palette(app.dark_mode);
    let stats = app.view().stats;

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(17),
            Constraint::Percentage(17),
            Constraint::Percentage(17),
            Constraint::Percentage(17),
            Constraint::Percentage(32),
        ])
        .split(area);

    let cards = [
        ("Total Tasks", stats.total, palette.fg),
        ("Completed", stats.completed, palette.success),
        ("In Progress", stats.in_progress, palette.accent),
        ("To Do", stats.todo, palette.warning),
    ];
    for (slot, (label, count, color)) in columns.iter().zip(cards) {
        let block = Block::default()
            .title(Span::styled(label, palette.dimmed()))
            .borders(Borders::ALL)
            .border_style(palette.dimmed());
        let value = Paragraph::new(Span::styled(count.to_string(), palette.panel_title(color)))
            .block(block);
        frame.render_widget(value, *slot);
    }

    let rate = stats.completion_rate();
    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(Span::styled("Completion Rate", palette.dimmed()))
                .borders(Borders::ALL)
                .border_style(palette.dimmed()),
        )
        .gauge_style(palette.panel_title(palette.success))
        .percent(u16::try_from(rate).unwrap_or(100))
        .label(format!("{rate}%"));
    frame.render_widget(gauge, columns[4]);
}

fn render_controls(frame: &mut Frame, area: Rect, app: &App) {
    let palette = theme::palette(app.dark_mode);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let mut chips = Vec::new();
    for filter in StatusFilter::ALL {
        let style = if filter == app.filter {
            palette.selected()
        } else {
            palette.normal()
        };
        chips.push(Span::styled(format!(" {} ", filter.label()), style));
        chips.push(Span::raw(" "));
    }
    let filter_block = Block::default()
        .title(Span::styled("Filter (f)", palette.dimmed()))
        .borders(Borders::ALL)
        .border_style(palette.dimmed());
    frame.render_widget(Paragraph::new(Line::from(chips)).block(filter_block), columns[0]);

    let focused = app.focus == DashboardFocus::Search && app.form.is_none();
    let search_text = if app.search.is_empty() && !focused {
        Span::styled("Search tasks...", palette.dimmed())
    } else {
        Span::styled(theme::input_text(&app.search, focused), palette.normal())
    };
    let border = if focused {
        palette.highlighted()
    } else {
        palette.dimmed()
    };
    let search_block = Block::default()
        .title(Span::styled("Search (/)", palette.dimmed()))
        .borders(Borders::ALL)
        .border_style(border);
    frame.render_widget(Paragraph::new(search_text).block(search_block), columns[1]);
}

fn render_tasks(frame: &mut Frame, area: Rect, app: &App) {
    let palette = theme::palette(app.dark_mode);
    let view = app.view();

    let border = if app.focus == DashboardFocus::Tasks && app.form.is_none() {
        palette.highlighted()
    } else {
        palette.normal()
    };
    let block = Block::default()
        .title(Span::styled(
            format!("Tasks ({})", view.visible.len()),
            palette.panel_title(palette.accent),
        ))
        .borders(Borders::ALL)
        .border_style(border);

    if view.visible.is_empty() {
        let message = if app.loading {
            "Loading tasks..."
        } else if !app.auth.is_signed_in() {
            "Sign in (F3) to see your tasks"
        } else if view.stats.total == 0 {
            "No tasks yet. Press n to add one"
        } else {
            "No tasks match the current filter"
        };
        frame.render_widget(
            Paragraph::new(Span::styled(message, palette.dimmed())).block(block),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = view
        .visible
        .iter()
        .map(|task| ListItem::new(task_line(task, app)))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(palette.selected())
        .highlight_symbol("▶ ");
    let mut state = ListState::default().with_selected(Some(app.selected));
    frame.render_stateful_widget(list, area, &mut state);
}

fn task_line<'a>(task: &'a Task, app: &App) -> Line<'a> {
    let palette = theme::palette(app.dark_mode);
    let overdue = task.is_overdue(app.today);

    let mut spans = vec![
        Span::styled(
            format!("[{}]", task.status.label()),
            palette.panel_title(palette.status(task.status)),
        ),
        Span::raw(" "),
        Span::styled(task.title.as_str(), palette.bold()),
        Span::raw("  "),
        Span::styled(
            task.priority.label(),
            palette.panel_title(palette.priority(task.priority)),
        ),
    ];

    if let Some(due) = task.due_date {
        let style = if overdue {
            palette.panel_title(palette.error)
        } else {
            palette.dimmed()
        };
        let label = if overdue { "overdue" } else { "due" };
        spans.push(Span::styled(format!("  {label} {}", due.format("%b %-d, %Y")), style));
    }
    if let Some(category) = &task.category {
        spans.push(Span::styled(format!("  #{category}"), palette.dimmed()));
    }
    if !task.description.is_empty() {
        spans.push(Span::styled(format!("  {}", task.description), palette.dimmed()));
    }
    Line::from(spans)
}
