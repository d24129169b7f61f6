//! Library entry point for the IntelliSphere TUI.
//!
//! Provides a reusable [`run`] function that drives a [`SessionController`]
//! from a Ratatui terminal UI. Network calls that the user may race against
//! (history fetches, chat replies) run on spawned tasks and come back as
//! events; create and delete run between frames.

mod app;
mod event;
mod markdown;
mod ui;

use anyhow::anyhow;
use app::{App, Focus};
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event as CrosstermEvent, KeyCode, KeyEvent,
    KeyModifiers, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use event::AppEvent;
use intellisphere_core::{
    ClientError, Command, FetchTicket, PendingTurn, SessionController, SessionService, error_text,
};
use intellisphere_protocol::Domain;
use log::{debug, info, warn};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Supported slash commands in the TUI input box.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SlashCommand {
    New,
    Sessions,
    Select(usize),
    Delete(usize),
}

/// Configuration for the IntelliSphere TUI session.
#[derive(Debug, Clone, Default)]
pub struct TuiConfig {
    /// Login status shown in the header, e.g. `Welcome, ada@example.com!`.
    pub greeting: Option<String>,
}

/// Launch the TUI around a controller for the active domain.
///
/// The caller is responsible for initializing logging before calling `run`;
/// with no log file configured, log output lands behind the alternate screen.
///
/// # Errors
/// Returns an error if terminal setup or the event loop fails. Backend
/// failures are shown in the transcript and status bar instead.
pub async fn run(controller: SessionController, config: TuiConfig) -> anyhow::Result<()> {
    info!("starting tui (domain={})", controller.domain());
    let mut app = App::new(controller, config.greeting);

    let mut terminal = setup_terminal()?;
    let (tx, mut rx) = mpsc::channel(256);
    spawn_input_handler(tx.clone());
    spawn_tick(tx.clone());

    let outcome = event_loop(&mut terminal, &mut app, &tx, &mut rx).await;
    restore_terminal(&mut terminal)?;
    outcome
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    sender: &mpsc::Sender<AppEvent>,
    receiver: &mut mpsc::Receiver<AppEvent>,
) -> anyhow::Result<()> {
    app.push_status("loading");
    app.controller.transcript_mut().set_loading(true);
    terminal.draw(|frame| ui::draw(frame, app))?;
    match app.controller.ensure_active().await {
        Ok(()) => app.push_status("idle"),
        Err(err) => {
            warn!("failed to open a session (error={err})");
            app.controller.transcript_mut().set_loading(false);
            app.push_status(format!("no active session: {}", error_text(&err)));
        }
    }
    app.refresh_sessions();

    loop {
        terminal.draw(|frame| ui::draw(frame, app))?;
        if let Some(command) = app.take_command() {
            perform(app, command, sender).await;
            continue;
        }
        let event = receiver
            .recv()
            .await
            .ok_or_else(|| anyhow!("event channel closed unexpectedly"))?;
        if handle_app_event(event, app) {
            break;
        }
    }
    Ok(())
}

/// Dispatch a UI event and return true when the app should exit.
fn handle_app_event(event: AppEvent, app: &mut App) -> bool {
    match event {
        AppEvent::Input(key) => handle_input(key, app),
        AppEvent::Scroll(delta) => {
            if delta < 0 {
                app.scroll_up(delta.unsigned_abs());
            } else if delta > 0 {
                app.scroll_down(delta.unsigned_abs());
            }
            false
        }
        AppEvent::Tick => {
            app.tick();
            false
        }
        AppEvent::HistoryLoaded { ticket, result } => {
            match app.controller.finish_select(ticket, result) {
                Ok(()) => app.push_status("idle"),
                Err(err) => app.push_status(format!("load failed: {}", error_text(&err))),
            }
            app.refresh_sessions();
            false
        }
        AppEvent::ChatReplied { pending, result } => {
            match app.controller.finish_submit(pending, result) {
                Ok(()) => app.push_status("idle"),
                Err(err) => app.push_status(format!("chat failed: {}", error_text(&err))),
            }
            app.refresh_sessions();
            false
        }
    }
}

/// Run a queued lifecycle command against the controller.
async fn perform(app: &mut App, command: Command, sender: &mpsc::Sender<AppEvent>) {
    debug!("performing command ({command:?})");
    match command {
        Command::CreateSession => match app.controller.create().await {
            Ok(id) => app.push_status(format!("session created ({})", id.short())),
            Err(err) => app.push_status(format!("create failed: {}", error_text(&err))),
        },
        Command::SelectSession(id) => {
            let ticket = app.controller.begin_select(id);
            spawn_fetch_history(
                app.controller.service(),
                app.controller.domain(),
                ticket,
                sender.clone(),
            );
        }
        Command::DeleteSession(id) => match app.controller.delete(&id).await {
            Ok(()) => app.push_status("session deleted"),
            Err(err) => app.push_status(format!("delete failed: {}", error_text(&err))),
        },
        Command::Submit(query) => match app.controller.prepare_submit(&query).await {
            Ok(pending) => {
                info!(
                    "sending message (session_id={}, query_len={})",
                    pending.session_id,
                    pending.query.len()
                );
                spawn_chat(
                    app.controller.service(),
                    app.controller.domain(),
                    pending,
                    sender.clone(),
                );
            }
            Err(ClientError::Validation(errors)) => app.push_status(errors.join("; ")),
            Err(err) => app.push_status(format!("send failed: {}", error_text(&err))),
        },
    }
    app.refresh_sessions();
}

/// Handle keyboard input and dispatch actions.
fn handle_input(key: KeyEvent, app: &mut App) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }
    if key.code == KeyCode::Esc {
        if app.menu_open {
            app.close_menu();
            return false;
        }
        if app.show_slash_commands {
            app.show_slash_commands = false;
            app.input.clear();
            return false;
        }
        if app.focus == Focus::Sessions {
            app.toggle_focus();
            return false;
        }
        return true;
    }

    match key.code {
        KeyCode::Tab | KeyCode::BackTab => {
            app.toggle_focus();
            return false;
        }
        KeyCode::Char('n') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.queue(Command::CreateSession);
            return false;
        }
        KeyCode::PageUp => {
            app.scroll_up(5);
            return false;
        }
        KeyCode::PageDown => {
            app.scroll_down(5);
            return false;
        }
        _ => {}
    }

    match app.focus {
        Focus::Sessions => handle_session_input(key, app),
        Focus::Input => handle_default_input(key, app),
    }
    false
}

/// Handle keyboard input while the session list has focus.
fn handle_session_input(key: KeyEvent, app: &mut App) {
    if app.menu_open {
        if matches!(key.code, KeyCode::Char('d') | KeyCode::Delete | KeyCode::Enter)
            && let Some(row) = app.selected_session()
        {
            let id = row.id.clone();
            app.queue(Command::DeleteSession(id));
        }
        app.close_menu();
        return;
    }
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.select_previous_row(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next_row(),
        KeyCode::Right | KeyCode::Char('m') | KeyCode::Char('d') | KeyCode::Delete => {
            app.open_menu()
        }
        KeyCode::Enter => {
            if let Some(row) = app.selected_session() {
                let id = row.id.clone();
                app.queue(Command::SelectSession(id));
                app.toggle_focus();
            }
        }
        _ => {}
    }
}

/// Handle keyboard input while the message box has focus.
fn handle_default_input(key: KeyEvent, app: &mut App) {
    match key.code {
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::End => app.enable_auto_scroll(),
        KeyCode::Enter => {
            let input = std::mem::take(&mut app.input);
            app.show_slash_commands = false;
            if input.trim_start().starts_with('/') {
                if let Err(err) = handle_slash_command(app, &input) {
                    app.push_status(err);
                }
            } else {
                app.queue(Command::Submit(input));
            }
        }
        KeyCode::Backspace => {
            app.input.pop();
            app.show_slash_commands = app.input.trim_start().starts_with('/');
        }
        KeyCode::Char(ch) => {
            if !key.modifiers.contains(KeyModifiers::CONTROL) {
                app.input.push(ch);
                app.show_slash_commands = app.input.trim_start().starts_with('/');
            }
        }
        _ => {}
    }
}

/// Handle slash commands entered in the input box.
fn handle_slash_command(app: &mut App, input: &str) -> Result<(), String> {
    let Some(command) = parse_slash_command(input)? else {
        return Ok(());
    };
    debug!("handling slash command ({command:?})");
    match command {
        SlashCommand::New => app.queue(Command::CreateSession),
        SlashCommand::Sessions => {
            app.refresh_sessions();
            app.focus = Focus::Sessions;
        }
        SlashCommand::Select(number) => {
            let row = app
                .sessions
                .by_number(number)
                .ok_or_else(|| format!("no Session {number}"))?;
            let id = row.id.clone();
            app.queue(Command::SelectSession(id));
        }
        SlashCommand::Delete(number) => {
            let row = app
                .sessions
                .by_number(number)
                .ok_or_else(|| format!("no Session {number}"))?;
            let id = row.id.clone();
            app.queue(Command::DeleteSession(id));
        }
    }
    Ok(())
}

/// Parse a slash command from the input line.
fn parse_slash_command(input: &str) -> Result<Option<SlashCommand>, String> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return Ok(None);
    }
    let mut parts = trimmed.trim_start_matches('/').split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(None);
    };
    let number = |usage: &str, value: Option<&str>| -> Result<usize, String> {
        value
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|number| *number > 0)
            .ok_or_else(|| format!("usage: {usage}"))
    };
    match command.to_lowercase().as_str() {
        "new" => Ok(Some(SlashCommand::New)),
        "sessions" => Ok(Some(SlashCommand::Sessions)),
        "select" => number("/select <n>", parts.next()).map(|n| Some(SlashCommand::Select(n))),
        "delete" => number("/delete <n>", parts.next()).map(|n| Some(SlashCommand::Delete(n))),
        _ => Err(format!("unknown command: {command}")),
    }
}

/// Spawn a task to fetch history for a selected session.
fn spawn_fetch_history(
    service: Arc<dyn SessionService>,
    domain: Domain,
    ticket: FetchTicket,
    sender: mpsc::Sender<AppEvent>,
) {
    tokio::spawn(async move {
        let result = service.fetch_history(domain, &ticket.session_id).await;
        let _ = sender.send(AppEvent::HistoryLoaded { ticket, result }).await;
    });
}

/// Spawn a task to send a chat query.
fn spawn_chat(
    service: Arc<dyn SessionService>,
    domain: Domain,
    pending: PendingTurn,
    sender: mpsc::Sender<AppEvent>,
) {
    tokio::spawn(async move {
        let result = service
            .chat(domain, &pending.session_id, &pending.query)
            .await;
        let _ = sender.send(AppEvent::ChatReplied { pending, result }).await;
    });
}

/// Spawn a task to poll for input events.
fn spawn_input_handler(sender: mpsc::Sender<AppEvent>) {
    tokio::spawn(async move {
        const MOUSE_SCROLL_LINES: i16 = 3;
        loop {
            if matches!(crossterm::event::poll(Duration::from_millis(30)), Ok(true)) {
                while matches!(crossterm::event::poll(Duration::from_millis(0)), Ok(true)) {
                    let event = match crossterm::event::read() {
                        Ok(event) => event,
                        Err(_) => break,
                    };
                    let sent = match event {
                        CrosstermEvent::Key(key) => sender.send(AppEvent::Input(key)).await,
                        CrosstermEvent::Mouse(mouse) => {
                            let lines = if mouse.modifiers.contains(KeyModifiers::SHIFT) {
                                MOUSE_SCROLL_LINES.saturating_mul(2)
                            } else {
                                MOUSE_SCROLL_LINES
                            };
                            match mouse.kind {
                                MouseEventKind::ScrollUp => {
                                    sender.send(AppEvent::Scroll(-lines)).await
                                }
                                MouseEventKind::ScrollDown => {
                                    sender.send(AppEvent::Scroll(lines)).await
                                }
                                _ => Ok(()),
                            }
                        }
                        _ => Ok(()),
                    };
                    if sent.is_err() {
                        return;
                    }
                }
            }
        }
    });
}

/// Spawn a periodic tick event generator.
fn spawn_tick(sender: mpsc::Sender<AppEvent>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(250));
        loop {
            interval.tick().await;
            if sender.send(AppEvent::Tick).await.is_err() {
                return;
            }
        }
    });
}

/// Configure terminal in raw mode with alternate screen.
fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    debug!("setting up terminal");
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore terminal state on exit.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    debug!("restoring terminal");
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use intellisphere_core::{LocalSessionCache, MemoryStore, SessionMeta};
    use intellisphere_protocol::SessionId;
    use intellisphere_test_utils::ScriptedSessionService;
    use pretty_assertions::assert_eq;

    fn app() -> App {
        let cache = LocalSessionCache::new(Arc::new(MemoryStore::new()), Domain::Finance);
        cache
            .insert(&SessionId::new("old"), SessionMeta::new(1))
            .expect("insert");
        cache
            .insert(&SessionId::new("new"), SessionMeta::new(2))
            .expect("insert");
        let controller =
            SessionController::new(Arc::new(ScriptedSessionService::new()), cache)
                .expect("controller");
        App::new(controller, None)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_line(app: &mut App, text: &str) {
        for ch in text.chars() {
            handle_input(key(KeyCode::Char(ch)), app);
        }
        handle_input(key(KeyCode::Enter), app);
    }

    #[test]
    fn parses_known_commands() {
        assert_eq!(parse_slash_command("/new"), Ok(Some(SlashCommand::New)));
        assert_eq!(
            parse_slash_command("  /Sessions "),
            Ok(Some(SlashCommand::Sessions))
        );
        assert_eq!(
            parse_slash_command("/select 2"),
            Ok(Some(SlashCommand::Select(2)))
        );
        assert_eq!(
            parse_slash_command("/delete 1"),
            Ok(Some(SlashCommand::Delete(1)))
        );
        assert_eq!(parse_slash_command("hello"), Ok(None));
        assert_eq!(parse_slash_command("/"), Ok(None));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert_eq!(
            parse_slash_command("/select"),
            Err("usage: /select <n>".to_string())
        );
        assert_eq!(
            parse_slash_command("/delete 0"),
            Err("usage: /delete <n>".to_string())
        );
        assert_eq!(
            parse_slash_command("/join 3"),
            Err("unknown command: join".to_string())
        );
    }

    #[test]
    fn select_command_queues_row_by_number() {
        let mut app = app();
        type_line(&mut app, "/select 2");
        assert_eq!(
            app.take_command(),
            Some(Command::SelectSession(SessionId::new("old")))
        );
        type_line(&mut app, "/select 3");
        assert_eq!(app.take_command(), None);
        assert_eq!(app.status, "no Session 3");
    }

    #[test]
    fn typed_text_queues_submit() {
        let mut app = app();
        type_line(&mut app, "what is an ETF?");
        assert_eq!(
            app.take_command(),
            Some(Command::Submit("what is an ETF?".to_string()))
        );
        assert!(app.input.is_empty());
    }

    #[test]
    fn delete_goes_through_row_menu() {
        let mut app = app();
        handle_input(key(KeyCode::Tab), &mut app);
        handle_input(key(KeyCode::Down), &mut app);
        handle_input(key(KeyCode::Char('d')), &mut app);
        assert!(app.menu_open);
        assert_eq!(app.take_command(), None);

        handle_input(key(KeyCode::Char('d')), &mut app);
        assert!(!app.menu_open);
        assert_eq!(
            app.take_command(),
            Some(Command::DeleteSession(SessionId::new("old")))
        );
    }

    #[test]
    fn escape_closes_menu_before_quitting() {
        let mut app = app();
        handle_input(key(KeyCode::Tab), &mut app);
        handle_input(key(KeyCode::Char('m')), &mut app);
        assert!(!handle_input(key(KeyCode::Esc), &mut app));
        assert!(!app.menu_open);
        assert!(!handle_input(key(KeyCode::Esc), &mut app));
        assert_eq!(app.focus, Focus::Input);
        assert!(handle_input(key(KeyCode::Esc), &mut app));
    }
}
