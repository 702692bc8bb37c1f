//! Application state and event handling.
//!
//! `App` is driven from the TUI loop by three inputs: key presses
//! ([`App::handle_key_event`]), worker results ([`App::apply_net_event`]),
//! and clock ticks ([`App::tick`]). Each may return a [`NetCommand`] for
//! the caller to hand to the background worker.

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use taskflow_proto::task::{Task, TaskStatus};

use crate::auth::{Feedback, LinkParams, Tone};
use crate::net::{NetCommand, NetEvent};
use crate::session::route::protected_redirect;
use crate::session::{AuthState, History, Navigator, Route, Transition, apply_session_policy};
use crate::storage::LocalStore;
use crate::tasks::{FormField, FormMode, StatusFilter, TaskForm, TaskManager, TaskView, derive_view};

/// How long a notice stays on screen.
const NOTICE_TTL: Duration = Duration::from_secs(5);

/// Which dashboard element receives typed keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DashboardFocus {
    /// Task list (default).
    #[default]
    Tasks,
    /// Search box.
    Search,
}

/// A transient message shown in the status bar.
#[derive(Debug, Clone)]
pub struct Notice {
    /// Presentation.
    pub tone: Tone,
    /// Text.
    pub text: String,
    shown_at: Instant,
}

/// Field of a two-field text form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PairField {
    /// First field (email, or new password).
    #[default]
    First,
    /// Second field (password, or confirmation).
    Second,
}

impl PairField {
    const fn toggle(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

/// Two text inputs with one focused; backs the login, signup and reset screens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairForm {
    /// First input.
    pub first: String,
    /// Second input (masked when rendered).
    pub second: String,
    /// Focused input.
    pub focus: PairField,
}

impl PairForm {
    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            PairField::First => &mut self.first,
            PairField::Second => &mut self.second,
        }
    }

    fn edit(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.focus = self.focus.toggle();
            }
            KeyCode::Backspace => {
                self.focused_mut().pop();
            }
            KeyCode::Char(c) => self.focused_mut().push(c),
            _ => {}
        }
    }
}

/// Progress of the email-verification screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VerifyStatus {
    /// No link opened.
    #[default]
    Idle,
    /// Waiting for the backend.
    Verifying,
    /// Confirmed.
    Verified,
    /// Rejected.
    Failed,
}

/// Main application state.
pub struct App {
    /// Navigation history; the last entry is the screen shown.
    pub history: History,
    /// Session as last reported by the backend.
    pub auth: AuthState,
    /// Cached tasks of the signed-in user.
    pub tasks: TaskManager,
    /// Dashboard status filter.
    pub filter: StatusFilter,
    /// Dashboard search text.
    pub search: String,
    /// Dashboard focus.
    pub focus: DashboardFocus,
    /// Index into the visible task list.
    pub selected: usize,
    /// Open create/edit form.
    pub form: Option<TaskForm>,
    /// Login/signup inputs (email, password).
    pub credentials: PairForm,
    /// Email typed into the forgot-password panel, when open.
    pub forgot_email: Option<String>,
    /// New-password inputs (password, confirmation).
    pub reset: PairForm,
    /// Whether the reset screen accepted its link or session.
    pub reset_ready: bool,
    /// Email-verification progress.
    pub verify: VerifyStatus,
    /// A task fetch is in flight.
    pub loading: bool,
    /// An account flow is in flight.
    pub busy: bool,
    /// Dark palette selected.
    pub dark_mode: bool,
    /// Current notice.
    pub notice: Option<Notice>,
    /// Local date used for overdue highlighting.
    pub today: NaiveDate,
    /// Whether the app should quit.
    pub should_quit: bool,
    pending_redirect: Option<(Route, Instant)>,
    store: Option<LocalStore>,
}

impl App {
    /// Creates the app on the home screen, signed out.
    #[must_use]
    pub fn new(today: NaiveDate) -> Self {
        Self {
            history: History::default(),
            auth: AuthState::new(),
            tasks: TaskManager::new(),
            filter: StatusFilter::All,
            search: String::new(),
            focus: DashboardFocus::Tasks,
            selected: 0,
            form: None,
            credentials: PairForm::default(),
            forgot_email: None,
            reset: PairForm::default(),
            reset_ready: false,
            verify: VerifyStatus::Idle,
            loading: false,
            busy: false,
            dark_mode: false,
            notice: None,
            today,
            should_quit: false,
            pending_redirect: None,
            store: None,
        }
    }

    /// Persists preferences in `store` and applies the saved dark-mode flag.
    #[must_use]
    pub fn with_store(mut self, store: LocalStore) -> Self {
        self.dark_mode = store.load_dark_mode();
        self.store = Some(store);
        self
    }

    /// Screen currently shown.
    #[must_use]
    pub fn route(&self) -> &Route {
        self.history.current()
    }

    /// What the dashboard shows: visible tasks and stats.
    #[must_use]
    pub fn view(&self) -> TaskView<'_> {
        derive_view(self.tasks.tasks(), self.filter, &self.search)
    }

    /// Task under the selection cursor.
    #[must_use]
    pub fn selected_task(&self) -> Option<&Task> {
        self.view().visible.get(self.selected).copied()
    }

    /// Shows a notice.
    pub fn notify(&mut self, tone: Tone, text: impl Into<String>) {
        self.notice = Some(Notice {
            tone,
            text: text.into(),
            shown_at: Instant::now(),
        });
    }

    /// Undoes the pending state of a command that never reached the worker.
    pub fn command_dropped(&mut self, reason: &str) {
        self.busy = false;
        self.loading = false;
        self.notify(Tone::Error, reason);
    }

    /// Flips the palette and saves the choice.
    pub fn toggle_dark_mode(&mut self) {
        self.dark_mode = !self.dark_mode;
        if let Some(store) = &self.store
            && let Err(e) = store.save_dark_mode(self.dark_mode)
        {
            tracing::warn!(error = %e, "could not save dark mode");
        }
    }

    /// Opens `route` as a new history entry and runs its entry actions.
    ///
    /// Anonymous users asking for a protected screen get the login screen
    /// instead; nothing is pushed when that is already showing.
    pub fn navigate(&mut self, route: Route) -> Option<NetCommand> {
        let route = protected_redirect(self.auth.is_signed_in(), &route).unwrap_or(route);
        if self.history.current() != &route {
            self.history.push(route);
        }
        self.enter_route()
    }

    /// Opens an emailed verification or reset link.
    pub fn open_link(&mut self, link: &str) -> Option<NetCommand> {
        let params = match LinkParams::parse(link) {
            Ok(p) => p,
            Err(e) => {
                self.notify(Tone::Error, e.to_string());
                return None;
            }
        };

        let route = params.route().clone();
        if !matches!(route, Route::VerifyEmail | Route::ResetPassword) {
            return self.navigate(route);
        }
        if self.history.current() != &route {
            self.history.push(route.clone());
        }
        match route {
            Route::VerifyEmail => {
                self.verify = VerifyStatus::Verifying;
                self.begin(NetCommand::VerifyEmail(params))
            }
            Route::ResetPassword => {
                self.reset = PairForm::default();
                self.reset_ready = false;
                self.begin(NetCommand::OpenResetLink(Some(params)))
            }
            _ => self.enter_route(),
        }
    }

    fn enter_route(&mut self) -> Option<NetCommand> {
        match self.history.current() {
            Route::ResetPassword => {
                self.reset = PairForm::default();
                self.reset_ready = false;
                self.begin(NetCommand::OpenResetLink(None))
            }
            _ => None,
        }
    }

    fn go_back(&mut self) {
        if self.history.back()
            && let Some(to) = protected_redirect(self.auth.is_signed_in(), self.history.current())
        {
            self.history.replace(to);
        }
    }

    fn begin(&mut self, cmd: NetCommand) -> Option<NetCommand> {
        self.busy = true;
        Some(cmd)
    }

    fn show_feedback(&mut self, feedback: Feedback, now: Instant) -> Option<NetCommand> {
        self.notify(feedback.tone, feedback.message);
        let redirect = feedback.redirect?;
        if redirect.after.is_zero() {
            self.navigate(redirect.to)
        } else {
            self.pending_redirect = Some((redirect.to, now + redirect.after));
            None
        }
    }

    /// Route a scheduled redirect will open, if any.
    #[must_use]
    pub fn pending_redirect(&self) -> Option<&Route> {
        self.pending_redirect.as_ref().map(|(to, _)| to)
    }

    /// Expires old notices and fires due redirects.
    pub fn tick(&mut self, now: Instant) -> Option<NetCommand> {
        if self
            .notice
            .as_ref()
            .is_some_and(|n| now.saturating_duration_since(n.shown_at) >= NOTICE_TTL)
        {
            self.notice = None;
        }

        match self.pending_redirect.take() {
            Some((to, due)) if due <= now => self.navigate(to),
            other => {
                self.pending_redirect = other;
                None
            }
        }
    }

    /// Applies a result from the background worker.
    pub fn apply_net_event(&mut self, event: NetEvent, now: Instant) -> Option<NetCommand> {
        match event {
            NetEvent::Session(change) => {
                let transition = self.auth.apply(&change);
                apply_session_policy(&mut self.history, self.auth.is_signed_in());
                match transition {
                    Transition::SignedIn => {
                        let owner = self.auth.user_id()?;
                        self.tasks.replace_all(owner, Vec::new());
                        self.loading = true;
                        Some(NetCommand::FetchTasks { owner })
                    }
                    Transition::SignedOut => {
                        self.tasks.clear();
                        self.form = None;
                        self.selected = 0;
                        self.loading = false;
                        None
                    }
                    Transition::Unchanged => None,
                }
            }
            NetEvent::Auth(feedback) => {
                self.busy = false;
                if self.verify == VerifyStatus::Verifying {
                    self.verify = if feedback.is_error() {
                        VerifyStatus::Failed
                    } else {
                        VerifyStatus::Verified
                    };
                }
                if !feedback.is_error() {
                    self.forgot_email = None;
                }
                self.show_feedback(feedback, now)
            }
            NetEvent::ResetLinkChecked(feedback) => {
                self.busy = false;
                match feedback {
                    None => {
                        self.reset_ready = true;
                        None
                    }
                    Some(feedback) => self.show_feedback(feedback, now),
                }
            }
            NetEvent::TasksLoaded { owner, tasks } => {
                self.loading = false;
                if self.auth.user_id() == Some(owner) {
                    self.tasks.replace_all(owner, tasks);
                    self.clamp_selection();
                } else {
                    tracing::debug!(%owner, "dropping tasks fetched for a previous session");
                }
                None
            }
            NetEvent::TaskInserted(task) => {
                if matches!(self.form.as_ref().map(TaskForm::mode), Some(FormMode::Create)) {
                    self.form = None;
                }
                self.tasks.apply_inserted(task);
                None
            }
            NetEvent::TaskUpdated(task) => {
                if matches!(self.form.as_ref().map(TaskForm::mode), Some(FormMode::Edit(id)) if *id == task.id)
                {
                    self.form = None;
                }
                self.tasks.apply_updated(task);
                None
            }
            NetEvent::TaskDeleted(id) => {
                self.tasks.apply_deleted(&id);
                self.clamp_selection();
                None
            }
            NetEvent::TaskFailed { action, message } => {
                if action == "fetch tasks" {
                    self.loading = false;
                }
                self.notify(Tone::Error, format!("Could not {action}: {message}"));
                None
            }
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.view().visible.len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    /// Handle a key event.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Option<NetCommand> {
        // Global shortcuts
        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
                self.should_quit = true;
                return None;
            }
            (KeyCode::Char('d'), KeyModifiers::CONTROL) => {
                self.toggle_dark_mode();
                return None;
            }
            (KeyCode::Char('b'), KeyModifiers::CONTROL) => {
                self.go_back();
                return None;
            }
            (KeyCode::F(1), _) => return self.navigate(Route::Dashboard),
            (KeyCode::F(2), _) => return self.navigate(Route::About),
            (KeyCode::F(3), _) if self.auth.is_signed_in() => {
                return self.begin(NetCommand::SignOut);
            }
            (KeyCode::F(3), _) => return self.navigate(Route::Login),
            (KeyCode::F(4), _) if !self.auth.is_signed_in() => {
                return self.navigate(Route::Signup);
            }
            (KeyCode::F(6), _) => return self.navigate(Route::ResetPassword),
            _ => {}
        }

        // Screen-specific keys
        match self.history.current() {
            Route::Home | Route::Dashboard => self.handle_dashboard_key(key),
            Route::Login => self.handle_credentials_key(key, false),
            Route::Signup => self.handle_credentials_key(key, true),
            Route::ResetPassword => self.handle_reset_key(key),
            Route::About | Route::VerifyEmail | Route::NotFound(_) => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Char('q')) {
                    self.should_quit = true;
                }
                None
            }
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyEvent) -> Option<NetCommand> {
        if self.form.is_some() {
            return self.handle_form_key(key);
        }

        if self.focus == DashboardFocus::Search {
            match key.code {
                KeyCode::Char(c) => self.search.push(c),
                KeyCode::Backspace => {
                    self.search.pop();
                }
                KeyCode::Enter | KeyCode::Esc | KeyCode::Tab => self.focus = DashboardFocus::Tasks,
                _ => {}
            }
            self.selected = 0;
            return None;
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.should_quit = true;
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.view().visible.len() {
                    self.selected += 1;
                }
                None
            }
            KeyCode::Char('/') | KeyCode::Tab => {
                self.focus = DashboardFocus::Search;
                None
            }
            KeyCode::Char('f') => {
                self.filter = self.filter.next();
                self.selected = 0;
                None
            }
            KeyCode::Char('n') => {
                if self.auth.is_signed_in() {
                    self.form = Some(TaskForm::create());
                } else {
                    self.notify(Tone::Info, "Sign in to add tasks");
                }
                None
            }
            KeyCode::Char('e') => {
                self.form = self.selected_task().map(TaskForm::edit);
                None
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                let id = self.selected_task()?.id.clone();
                Some(NetCommand::DeleteTask(id))
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                let task = self.selected_task()?;
                let (id, status) = (task.id.clone(), task.status.next());
                Some(NetCommand::SetStatus { id, status })
            }
            KeyCode::Char(c @ '1'..='3') => {
                let index = usize::from(c as u8 - b'1');
                let status = TaskStatus::ALL[index];
                let id = self.selected_task()?.id.clone();
                Some(NetCommand::SetStatus { id, status })
            }
            KeyCode::Char('r') => {
                let owner = self.auth.user_id()?;
                self.loading = true;
                Some(NetCommand::FetchTasks { owner })
            }
            _ => None,
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Option<NetCommand> {
        let form = self.form.as_mut()?;
        match key.code {
            KeyCode::Esc => self.form = None,
            KeyCode::Tab => form.focus_next(),
            KeyCode::BackTab => form.focus_prev(),
            KeyCode::Left | KeyCode::Right if form.focus() == FormField::Priority => {
                form.cycle_priority();
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Char(c) => form.insert_char(c),
            KeyCode::Enter => return self.submit_form(),
            _ => {}
        }
        None
    }

    fn submit_form(&mut self) -> Option<NetCommand> {
        let form = self.form.as_ref()?;
        let result = form.submit().and_then(|fields| match form.mode() {
            FormMode::Create => self.tasks.build_insert(fields).map(NetCommand::CreateTask),
            FormMode::Edit(id) => {
                self.tasks
                    .build_update(id, fields)
                    .map(|draft| NetCommand::UpdateTask {
                        id: id.clone(),
                        draft,
                    })
            }
        });

        match result {
            // The form closes once the backend returns the stored row.
            Ok(cmd) => Some(cmd),
            Err(e) => {
                self.notify(Tone::Error, e.to_string());
                None
            }
        }
    }

    fn handle_credentials_key(&mut self, key: KeyEvent, signup: bool) -> Option<NetCommand> {
        if let Some(email) = self.forgot_email.as_mut() {
            match key.code {
                KeyCode::Esc => self.forgot_email = None,
                KeyCode::Backspace => {
                    email.pop();
                }
                KeyCode::Char(c) => email.push(c),
                KeyCode::Enter if !self.busy => {
                    let email = email.clone();
                    return self.begin(NetCommand::RequestPasswordReset { email });
                }
                _ => {}
            }
            return None;
        }

        match key.code {
            KeyCode::Esc => {
                self.should_quit = true;
                None
            }
            KeyCode::F(5) if !signup => {
                self.forgot_email = Some(self.credentials.first.clone());
                None
            }
            KeyCode::Enter if !self.busy => {
                let email = self.credentials.first.clone();
                let password = std::mem::take(&mut self.credentials.second);
                self.credentials.focus = PairField::Second;
                let cmd = if signup {
                    NetCommand::SignUp { email, password }
                } else {
                    NetCommand::SignIn { email, password }
                };
                self.begin(cmd)
            }
            _ => {
                self.credentials.edit(key);
                None
            }
        }
    }

    fn handle_reset_key(&mut self, key: KeyEvent) -> Option<NetCommand> {
        match key.code {
            KeyCode::Esc => {
                self.should_quit = true;
                None
            }
            KeyCode::Enter if !self.busy => {
                let password = self.reset.first.clone();
                let confirmation = self.reset.second.clone();
                self.begin(NetCommand::UpdatePassword {
                    password,
                    confirmation,
                })
            }
            _ => {
                self.reset.edit(key);
                None
            }
        }
    }
}
