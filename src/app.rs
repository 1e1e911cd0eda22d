//! Interactive state machine and event loop
//!
//! All UI state lives in [`AppState`]; keystrokes and task completions arrive
//! as [`Msg`] values through one channel and are applied one at a time, so
//! the loop is the sole writer. Handlers return [`Command`]s describing the
//! async work to start; [`dispatch`] turns each command into a spawned task
//! that reports back with exactly one message.

use std::io;
use std::thread;

use anyhow::Result;
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::completer::{expand_home, PathCompleter};
use crate::profiles::ProfileStore;
use crate::render;
use crate::theme::{self, Theme};
use crate::vpn::{self, Session, SessionStats};

/// The two top-level views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Profiles,
    Sessions,
}

/// Modal input sub-machine for the two-step add-profile flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    None,
    AwaitingPath,
    AwaitingName,
}

/// One discrete event applied to the state machine.
#[derive(Debug)]
pub enum Msg {
    Terminal(TermEvent),
    SessionsRefreshed(Result<Vec<Session>, String>),
    StatsFetched(Result<SessionStats, String>),
    Connected(Result<(), String>),
    Disconnected(Result<(), String>),
    ThemeChanged,
}

/// Async work scheduled by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    RefreshSessions,
    FetchStats(String),
    Connect(String),
    Disconnect(String),
    WatchTheme,
}

/// The single mutable UI aggregate.
pub struct AppState {
    pub view: View,
    pub profile_cursor: usize,
    pub session_cursor: usize,
    pub store: ProfileStore,
    pub profile_valid: Vec<bool>,
    pub sessions: Vec<Session>,
    pub selected_stats: Option<SessionStats>,
    pub loading: bool,
    pub loading_label: String,
    pub status: Option<String>,
    pub error: Option<String>,
    pub input_mode: InputMode,
    pub input: String,
    pub pending_path: Option<String>,
    pub completer: PathCompleter,
    pub theme: Theme,
    pub should_quit: bool,
}

impl AppState {
    pub fn new(store: ProfileStore, theme: Theme) -> Self {
        let profile_valid = store.validate();
        Self {
            view: View::Profiles,
            profile_cursor: 0,
            session_cursor: 0,
            store,
            profile_valid,
            sessions: Vec::new(),
            selected_stats: None,
            loading: true,
            loading_label: "Fetching sessions...".into(),
            status: None,
            error: None,
            input_mode: InputMode::None,
            input: String::new(),
            pending_path: None,
            completer: PathCompleter::new(),
            theme,
            should_quit: false,
        }
    }

    /// Work to kick off before the first event arrives.
    pub fn init_commands(&self) -> Vec<Command> {
        vec![Command::RefreshSessions, Command::WatchTheme]
    }

    /// Applies one event and returns the async work it scheduled.
    pub fn update(&mut self, msg: Msg) -> Vec<Command> {
        match msg {
            Msg::Terminal(TermEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                self.handle_key(key)
            }
            Msg::Terminal(_) => Vec::new(),
            Msg::SessionsRefreshed(result) => self.on_sessions_refreshed(result),
            Msg::StatsFetched(result) => self.on_stats_fetched(result),
            Msg::Connected(result) => self.on_connected(result),
            Msg::Disconnected(result) => self.on_disconnected(result),
            Msg::ThemeChanged => {
                self.theme = Theme::load();
                vec![Command::WatchTheme]
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Command> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return Vec::new();
        }
        if self.input_mode != InputMode::None {
            return self.handle_input_key(key);
        }

        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                Vec::new()
            }
            KeyCode::Tab => {
                self.view = match self.view {
                    View::Profiles => View::Sessions,
                    View::Sessions => View::Profiles,
                };
                self.clear_messages();
                Vec::new()
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_cursor_up();
                Vec::new()
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_cursor_down();
                Vec::new()
            }
            KeyCode::Enter => self.handle_activate(),
            KeyCode::Char('a') if self.view == View::Profiles => {
                self.start_add_profile();
                Vec::new()
            }
            KeyCode::Char('d') | KeyCode::Delete => self.handle_delete(),
            KeyCode::Char('r') => {
                self.clear_messages();
                self.begin_loading("Refreshing sessions...");
                vec![Command::RefreshSessions]
            }
            KeyCode::Char('s') if self.view == View::Sessions => self.fetch_stats_under_cursor(),
            _ => Vec::new(),
        }
    }

    /// Enter: connect in the Profiles view, fetch stats in the Sessions view.
    fn handle_activate(&mut self) -> Vec<Command> {
        match self.view {
            View::Profiles => {
                self.clear_messages();
                if self.store.profiles.is_empty() {
                    return Vec::new();
                }
                if !self
                    .profile_valid
                    .get(self.profile_cursor)
                    .copied()
                    .unwrap_or(false)
                {
                    self.set_error("Config file not found");
                    return Vec::new();
                }
                let profile = self.store.profiles[self.profile_cursor].clone();
                if self.is_profile_connected(&profile.path) {
                    self.set_error(format!("'{}' is already connected", profile.name));
                    return Vec::new();
                }
                // An outstanding task already owns the loading indicator;
                // don't start a second connect under it.
                if self.loading {
                    return Vec::new();
                }
                self.set_status(format!("Connecting to {}...", profile.name));
                self.begin_loading("Connecting...");
                vec![Command::Connect(profile.path)]
            }
            View::Sessions => self.fetch_stats_under_cursor(),
        }
    }

    fn fetch_stats_under_cursor(&mut self) -> Vec<Command> {
        let Some(session) = self.sessions.get(self.session_cursor) else {
            return Vec::new();
        };
        let path = session.path.clone();
        self.clear_messages();
        self.begin_loading("Fetching stats...");
        vec![Command::FetchStats(path)]
    }

    /// `d`/Delete: remove the profile under the cursor, or disconnect the
    /// session under the cursor.
    fn handle_delete(&mut self) -> Vec<Command> {
        self.clear_messages();
        match self.view {
            View::Profiles => {
                if self.store.profiles.is_empty() {
                    return Vec::new();
                }
                let name = self.store.profiles[self.profile_cursor].name.clone();
                self.store.remove_at(self.profile_cursor);
                match self.store.save() {
                    Ok(()) => self.set_status(format!("Removed profile: {name}")),
                    Err(err) => self.set_error(format!("Failed to save profiles: {err:#}")),
                }
                self.profile_valid = self.store.validate();
                self.clamp_cursors();
                Vec::new()
            }
            View::Sessions => {
                if self.loading {
                    return Vec::new();
                }
                let Some(session) = self.sessions.get(self.session_cursor) else {
                    return Vec::new();
                };
                let path = session.path.clone();
                self.set_status("Disconnecting...");
                vec![Command::Disconnect(path)]
            }
        }
    }

    fn start_add_profile(&mut self) {
        self.clear_messages();
        self.input_mode = InputMode::AwaitingPath;
        self.input.clear();
        self.pending_path = None;
        self.completer.clear();
    }

    fn handle_input_key(&mut self, key: KeyEvent) -> Vec<Command> {
        match key.code {
            KeyCode::Esc => {
                self.input_mode = InputMode::None;
                self.input.clear();
                self.pending_path = None;
                self.completer.clear();
            }
            KeyCode::Tab => self.cycle_suggestion(true),
            KeyCode::BackTab => self.cycle_suggestion(false),
            KeyCode::Enter => self.submit_input(),
            KeyCode::Backspace => {
                self.input.pop();
                self.refresh_suggestions();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.input.push(c);
                self.refresh_suggestions();
            }
            _ => {}
        }
        Vec::new()
    }

    fn cycle_suggestion(&mut self, forward: bool) {
        if self.input_mode != InputMode::AwaitingPath || !self.completer.has_suggestions() {
            return;
        }
        if forward {
            self.completer.select_next();
        } else {
            self.completer.select_prev();
        }
        if let Some(selected) = self.completer.selected().map(str::to_owned) {
            self.input = selected;
            self.completer.update(&self.input);
        }
    }

    fn refresh_suggestions(&mut self) {
        if self.input_mode == InputMode::AwaitingPath {
            self.completer.update(&self.input);
        }
    }

    fn submit_input(&mut self) {
        let value = self.input.trim().to_string();
        if value.is_empty() {
            return;
        }

        match self.input_mode {
            InputMode::AwaitingPath => {
                self.pending_path = Some(expand_home(&value));
                self.input_mode = InputMode::AwaitingName;
                self.input.clear();
                self.completer.clear();
            }
            InputMode::AwaitingName => {
                if let Some(path) = self.pending_path.take() {
                    self.store.add(value.clone(), path);
                    match self.store.save() {
                        Ok(()) => self.set_status(format!("Added profile: {value}")),
                        Err(err) => self.set_error(format!("Failed to save profiles: {err:#}")),
                    }
                    self.profile_valid = self.store.validate();
                }
                self.input_mode = InputMode::None;
                self.input.clear();
            }
            InputMode::None => {}
        }
    }

    fn on_sessions_refreshed(&mut self, result: Result<Vec<Session>, String>) -> Vec<Command> {
        self.loading = false;
        match result {
            Ok(sessions) => {
                self.sessions = sessions;
                self.clamp_cursors();
            }
            Err(err) => self.set_error(format!("Failed to fetch sessions: {err}")),
        }
        Vec::new()
    }

    fn on_stats_fetched(&mut self, result: Result<SessionStats, String>) -> Vec<Command> {
        self.loading = false;
        match result {
            Ok(stats) => self.selected_stats = Some(stats),
            Err(err) => self.set_error(format!("Failed to fetch stats: {err}")),
        }
        Vec::new()
    }

    /// A successful connect chains a session refresh; a failed one reports
    /// the error and chains nothing.
    fn on_connected(&mut self, result: Result<(), String>) -> Vec<Command> {
        self.loading = false;
        match result {
            Ok(()) => {
                self.set_status("Connected successfully!");
                self.begin_loading("Refreshing sessions...");
                vec![Command::RefreshSessions]
            }
            Err(err) => {
                self.set_error(format!("Connection failed: {err}"));
                Vec::new()
            }
        }
    }

    fn on_disconnected(&mut self, result: Result<(), String>) -> Vec<Command> {
        self.loading = false;
        match result {
            Ok(()) => {
                self.set_status("Disconnected successfully!");
                self.selected_stats = None;
                self.begin_loading("Refreshing sessions...");
                vec![Command::RefreshSessions]
            }
            Err(err) => {
                self.set_error(format!("Disconnect failed: {err}"));
                Vec::new()
            }
        }
    }

    /// A profile counts as connected when its bare config name matches any
    /// current session's config name.
    pub fn is_profile_connected(&self, profile_path: &str) -> bool {
        let name = vpn::config_display_name(profile_path);
        self.sessions.iter().any(|s| s.config_name == name)
    }

    fn move_cursor_up(&mut self) {
        match self.view {
            View::Profiles => self.profile_cursor = self.profile_cursor.saturating_sub(1),
            View::Sessions => self.session_cursor = self.session_cursor.saturating_sub(1),
        }
        // Stats belong to the row they were fetched for.
        self.selected_stats = None;
    }

    fn move_cursor_down(&mut self) {
        match self.view {
            View::Profiles => {
                if self.profile_cursor + 1 < self.store.profiles.len() {
                    self.profile_cursor += 1;
                }
            }
            View::Sessions => {
                if self.session_cursor + 1 < self.sessions.len() {
                    self.session_cursor += 1;
                }
            }
        }
        self.selected_stats = None;
    }

    fn clamp_cursors(&mut self) {
        if self.profile_cursor >= self.store.profiles.len() {
            self.profile_cursor = self.store.profiles.len().saturating_sub(1);
        }
        if self.session_cursor >= self.sessions.len() {
            self.session_cursor = self.sessions.len().saturating_sub(1);
        }
    }

    fn begin_loading(&mut self, label: &str) {
        self.loading = true;
        self.loading_label = label.to_string();
    }

    fn set_status(&mut self, msg: impl Into<String>) {
        self.status = Some(msg.into());
        self.error = None;
    }

    fn set_error(&mut self, msg: impl Into<String>) {
        self.error = Some(msg.into());
        self.status = None;
    }

    fn clear_messages(&mut self) {
        self.status = None;
        self.error = None;
    }
}

/// Spawns the task for one command. Every task sends exactly one message
/// back; errors cross the channel as display strings.
pub fn dispatch(cmd: Command, tx: UnboundedSender<Msg>) {
    match cmd {
        Command::RefreshSessions => {
            tokio::spawn(async move {
                let result = vpn::list_sessions().await.map_err(|e| format!("{e:#}"));
                let _ = tx.send(Msg::SessionsRefreshed(result));
            });
        }
        Command::FetchStats(path) => {
            tokio::spawn(async move {
                let result = vpn::get_session_stats(&path)
                    .await
                    .map_err(|e| format!("{e:#}"));
                let _ = tx.send(Msg::StatsFetched(result));
            });
        }
        Command::Connect(path) => {
            tokio::spawn(async move {
                let result = vpn::connect(&path).await.map_err(|e| format!("{e:#}"));
                let _ = tx.send(Msg::Connected(result));
            });
        }
        Command::Disconnect(path) => {
            tokio::spawn(async move {
                let result = vpn::disconnect(&path).await.map_err(|e| format!("{e:#}"));
                let _ = tx.send(Msg::Disconnected(result));
            });
        }
        Command::WatchTheme => {
            tokio::task::spawn_blocking(move || {
                if theme::watch_theme().is_some() {
                    let _ = tx.send(Msg::ThemeChanged);
                }
            });
        }
    }
}

/// Runs the interactive TUI until the user quits.
pub async fn run() -> Result<()> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    let result = event_loop(&mut terminal).await;

    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn event_loop<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut app = AppState::new(ProfileStore::load(), Theme::load());

    for cmd in app.init_commands() {
        dispatch(cmd, tx.clone());
    }
    spawn_input_thread(tx.clone());

    terminal.draw(|frame| render::draw(frame, &app))?;
    while let Some(msg) = rx.recv().await {
        for cmd in app.update(msg) {
            dispatch(cmd, tx.clone());
        }
        if app.should_quit {
            break;
        }
        terminal.draw(|frame| render::draw(frame, &app))?;
    }

    Ok(())
}

/// Forwards terminal events into the message channel so keystrokes and task
/// completions are applied in one stream, strictly in arrival order.
fn spawn_input_thread(tx: UnboundedSender<Msg>) {
    thread::spawn(move || loop {
        match event::read() {
            Ok(ev) => {
                if tx.send(Msg::Terminal(ev)).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}
