//! `TaskFlow` — terminal task manager.
//!
//! Launches the TUI against a hosted auth + row service. Configuration via
//! CLI flags, environment variables, or config file
//! (`~/.config/taskflow/config.toml`).
//!
//! ```bash
//! # Offline demo with an in-memory backend
//! cargo run --bin taskflow -- --offline
//!
//! # Against a hosted project
//! TASKFLOW_URL=https://xyz.supabase.co TASKFLOW_ANON_KEY=... cargo run
//!
//! # Open an emailed link on startup
//! cargo run -- --link 'http://localhost:5173/verify-email?token=...&type=signup'
//! ```

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use taskflow::app::App;
use taskflow::auth::Tone;
use taskflow::backend::memory::MemoryBackend;
use taskflow::backend::rest::RestBackend;
use taskflow::backend::{Backend, Unconfigured};
use taskflow::config::{CliArgs, ClientConfig};
use taskflow::net::{self, NetCommand};
use taskflow::ui;
use taskflow_proto::task::{Priority, TaskDraft, TaskStatus};

const DEMO_EMAIL: &str = "demo@taskflow.local";
const DEMO_PASSWORD: &str = "demo123";

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());
    let config = ClientConfig::load(&cli).unwrap_or_else(|e| {
        eprintln!("taskflow: ignoring settings file: {e}");
        tracing::warn!(error = %e, "settings file ignored, using flags and defaults");
        ClientConfig::from_cli(&cli)
    });

    tracing::info!("taskflow starting");

    // Set up terminal.
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app against whichever backend the config selects.
    let link = cli.link.as_deref();
    let result = if config.offline {
        run_app(&mut terminal, demo_backend(), &config, link, Some(demo_hint())).await
    } else if let Some(rest_config) = config.to_rest_config() {
        match RestBackend::new(&rest_config) {
            Ok(rest) => {
                let rest = match config.local_store() {
                    Some(store) => rest.with_store(store),
                    None => rest,
                };
                run_app(&mut terminal, Arc::new(rest), &config, link, None).await
            }
            Err(e) => {
                tracing::error!(error = %e, "invalid backend configuration");
                let hint = format!("Backend unavailable: {e}");
                run_app(&mut terminal, Arc::new(Unconfigured::new()), &config, link, Some(hint))
                    .await
            }
        }
    } else {
        tracing::error!("backend URL or anon key missing; running signed out");
        let hint = "Backend not configured: set TASKFLOW_URL and TASKFLOW_ANON_KEY, or use --offline"
            .to_string();
        run_app(&mut terminal, Arc::new(Unconfigured::new()), &config, link, Some(hint)).await
    };

    // Restore terminal.
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!("taskflow exiting");
    result
}

/// Sends tracing output to a file; the terminal belongs to the TUI.
///
/// The returned guard flushes buffered lines when dropped, so it lives
/// until `main` returns.
fn init_logging(filter: &str, path: Option<&Path>) -> Option<WorkerGuard> {
    let path = path.map_or_else(|| std::env::temp_dir().join("taskflow.log"), Path::to_path_buf);
    let (dir, name) = (path.parent()?, path.file_name()?);

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// In-memory backend with one account and a few tasks.
fn demo_backend() -> Arc<MemoryBackend> {
    let backend = MemoryBackend::new();
    let owner = backend.add_account(DEMO_EMAIL, DEMO_PASSWORD);
    let today = chrono::Local::now().date_naive();

    let seeds = [
        ("Design homepage layout", Priority::High, TaskStatus::InProgress, Some("Design"), 2),
        ("Write documentation", Priority::Medium, TaskStatus::Todo, Some("Docs"), -1),
        ("Review pull requests", Priority::Low, TaskStatus::Completed, None, 0),
    ];
    for (title, priority, status, category, due_in_days) in seeds {
        backend.seed_task(
            owner,
            TaskDraft {
                title: title.to_string(),
                description: String::new(),
                priority,
                status,
                due_date: today.checked_add_signed(chrono::Duration::days(due_in_days)),
                category: category.map(str::to_string),
                user_id: Some(owner),
            },
        );
    }
    Arc::new(backend)
}

fn demo_hint() -> String {
    format!("Offline demo: sign in (F3) as {DEMO_EMAIL} / {DEMO_PASSWORD}")
}

/// Main application loop.
async fn run_app<B: Backend>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    backend: Arc<B>,
    config: &ClientConfig,
    link: Option<&str>,
    hint: Option<String>,
) -> io::Result<()> {
    let mut app = App::new(chrono::Local::now().date_naive());
    if let Some(store) = config.local_store() {
        app = app.with_store(store);
    }
    if let Some(hint) = hint {
        app.notify(Tone::Info, hint);
    }

    let (cmd_tx, mut evt_rx) =
        net::spawn_net(backend, config.site_url.clone(), config.channel_capacity);

    send(&mut app, &cmd_tx, NetCommand::RestoreSession);
    if let Some(link) = link
        && let Some(cmd) = app.open_link(link)
    {
        send(&mut app, &cmd_tx, cmd);
    }

    loop {
        terminal.draw(|frame| ui::draw(frame, &app))?;

        while let Ok(event) = evt_rx.try_recv() {
            if let Some(cmd) = app.apply_net_event(event, Instant::now()) {
                send(&mut app, &cmd_tx, cmd);
            }
        }
        if let Some(cmd) = app.tick(Instant::now()) {
            send(&mut app, &cmd_tx, cmd);
        }

        if event::poll(config.poll_timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && let Some(cmd) = app.handle_key_event(key)
        {
            send(&mut app, &cmd_tx, cmd);
        }

        if app.should_quit {
            let _ = cmd_tx.try_send(NetCommand::Shutdown);
            return Ok(());
        }
    }
}

/// Hands `cmd` to the worker, reporting a full or closed channel.
fn send(app: &mut App, tx: &mpsc::Sender<NetCommand>, cmd: NetCommand) {
    match tx.try_send(cmd) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            app.command_dropped("Busy, try again");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            app.command_dropped("Background worker stopped");
        }
    }
}
