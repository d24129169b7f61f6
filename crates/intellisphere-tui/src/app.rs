//! Application state for the IntelliSphere TUI.

use crate::markdown;
use intellisphere_core::{Block, Command, SessionController, SessionListView, SessionRow};
use log::{debug, warn};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use std::cmp::min;

const SPINNER: [&str; 4] = ["⠋", "⠙", "⠸", "⠴"];

/// Which pane receives keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// The message input box.
    Input,
    /// The session list in the sidebar.
    Sessions,
}

/// Top-level application state for the TUI.
pub struct App {
    /// Session lifecycle for the active domain.
    pub controller: SessionController,
    /// Derived session list, refreshed after every lifecycle operation.
    pub sessions: SessionListView,
    /// Pane receiving keyboard input.
    pub focus: Focus,
    /// Index of the highlighted row in the session list.
    pub selected_row: usize,
    /// Whether the row context menu is open.
    pub menu_open: bool,
    /// Login status line, if a user is recorded.
    pub greeting: Option<String>,
    /// Current input buffer.
    pub input: String,
    /// Whether to show the slash command palette.
    pub show_slash_commands: bool,
    /// Status line text.
    pub status: String,
    /// Current scroll offset.
    pub scroll: u16,
    /// Whether to auto-scroll to the bottom.
    pub auto_scroll: bool,
    /// Maximum scroll offset for the chat view.
    pub chat_max_scroll: u16,
    queued: Option<Command>,
    spinner: usize,
}

impl App {
    /// Create application state around a controller.
    pub fn new(controller: SessionController, greeting: Option<String>) -> Self {
        let mut app = Self {
            controller,
            sessions: SessionListView::default(),
            focus: Focus::Input,
            selected_row: 0,
            menu_open: false,
            greeting,
            input: String::new(),
            show_slash_commands: false,
            status: "idle".to_string(),
            scroll: 0,
            auto_scroll: true,
            chat_max_scroll: 0,
            queued: None,
            spinner: 0,
        };
        app.refresh_sessions();
        app
    }

    /// Header title for the active domain.
    pub fn domain_title(&self) -> String {
        self.controller.domain().title()
    }

    /// Label of the active session as shown in the list.
    ///
    /// A session that has not been cached yet shows as `New session`.
    pub fn active_label(&self) -> Option<String> {
        let current = self.controller.current()?;
        Some(
            self.sessions
                .active()
                .map(|row| row.label.clone())
                .unwrap_or_else(|| format!("New session ({})", current.short())),
        )
    }

    /// Re-derive the session list and move the highlight to the active row.
    pub fn refresh_sessions(&mut self) {
        match self.controller.sessions() {
            Ok(view) => {
                debug!("set sessions (count={})", view.len());
                self.selected_row = view.active_index().unwrap_or(0);
                self.sessions = view;
            }
            Err(err) => {
                warn!("failed to read cached sessions (error={err})");
                self.push_status(format!("could not read sessions: {err}"));
            }
        }
        if self.selected_row >= self.sessions.len() {
            self.selected_row = self.sessions.len().saturating_sub(1);
        }
    }

    /// Row under the list highlight.
    pub fn selected_session(&self) -> Option<&SessionRow> {
        self.sessions.rows().get(self.selected_row)
    }

    pub fn select_previous_row(&mut self) {
        self.selected_row = self.selected_row.saturating_sub(1);
    }

    pub fn select_next_row(&mut self) {
        if self.selected_row + 1 < self.sessions.len() {
            self.selected_row += 1;
        }
    }

    /// Switch focus between the input box and the session list.
    pub fn toggle_focus(&mut self) {
        self.menu_open = false;
        self.focus = match self.focus {
            Focus::Input => Focus::Sessions,
            Focus::Sessions => Focus::Input,
        };
    }

    /// Open the context menu for the highlighted row.
    pub fn open_menu(&mut self) {
        if self.selected_session().is_some() {
            self.menu_open = true;
        }
    }

    pub fn close_menu(&mut self) {
        self.menu_open = false;
    }

    /// Queue a lifecycle command to run after the next frame is drawn.
    ///
    /// A newer command replaces one that has not started yet.
    pub fn queue(&mut self, command: Command) {
        self.push_status(match command {
            Command::Submit(_) => "waiting for reply",
            _ => "loading",
        });
        self.queued = Some(command);
    }

    pub fn take_command(&mut self) -> Option<Command> {
        self.queued.take()
    }

    /// Update the status line.
    pub fn push_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Advance the loading spinner.
    pub fn tick(&mut self) {
        if self.controller.transcript().is_loading() {
            self.spinner = (self.spinner + 1) % SPINNER.len();
        }
    }

    /// Pin the view to the bottom when the transcript asked for it.
    pub fn sync_scroll(&mut self) {
        if self.controller.transcript_mut().take_scroll_request() {
            self.enable_auto_scroll();
        }
    }

    /// Scroll the chat view upward by a number of lines.
    pub fn scroll_up(&mut self, lines: u16) {
        self.auto_scroll = false;
        self.scroll = self.scroll.saturating_sub(lines);
    }

    /// Scroll the chat view downward by a number of lines.
    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = min(self.scroll.saturating_add(lines), self.chat_max_scroll);
        if self.scroll >= self.chat_max_scroll {
            self.auto_scroll = true;
        }
    }

    /// Enable auto-scrolling to the bottom.
    pub fn enable_auto_scroll(&mut self) {
        self.auto_scroll = true;
        self.scroll = self.chat_max_scroll;
    }

    /// Update scroll bounds after layout changes.
    ///
    /// Snaps to the new bottom only while auto-scroll is on or the view was
    /// already at the bottom.
    pub fn update_scroll_bounds(&mut self, max_scroll: u16) {
        let was_at_bottom = self.scroll >= self.chat_max_scroll;
        self.chat_max_scroll = max_scroll;
        if self.auto_scroll || was_at_bottom {
            self.scroll = max_scroll;
            self.auto_scroll = true;
        } else {
            self.scroll = self.scroll.min(max_scroll);
        }
    }

    /// Render transcript blocks into styled lines for the UI.
    pub fn render_lines(&self) -> Vec<Line<'static>> {
        let transcript = self.controller.transcript();
        let mut lines = Vec::new();

        if transcript.is_empty() && !transcript.is_loading() {
            lines.push(Line::from(Span::styled(
                " No messages yet. Ask a question below to start.",
                Style::default().fg(Color::Rgb(128, 128, 128)),
            )));
            return lines;
        }

        let blocks = transcript.blocks();
        for (idx, block) in blocks.iter().enumerate() {
            let (badge, badge_bg) = match block {
                Block::User(_) => (" you ", Color::Rgb(107, 161, 230)),
                Block::Bot(_) => (" intellisphere ", Color::Rgb(238, 121, 72)),
                Block::Error(_) => (" error ", Color::Rgb(255, 110, 110)),
            };
            lines.push(Line::from(Span::styled(
                badge,
                Style::default()
                    .fg(Color::Rgb(10, 10, 10))
                    .bg(badge_bg)
                    .add_modifier(Modifier::BOLD),
            )));

            match block {
                Block::User(text) => {
                    let style = Style::default().fg(Color::Rgb(238, 238, 238));
                    for line in text.lines() {
                        lines.push(Line::from(Span::styled(format!(" {line}"), style)));
                    }
                }
                Block::Bot(text) => {
                    let style = Style::default().fg(Color::Rgb(238, 238, 238));
                    lines.extend(markdown::to_lines(text, style, " "));
                }
                Block::Error(text) => {
                    let style = Style::default().fg(Color::Rgb(255, 110, 110));
                    for line in text.lines() {
                        lines.push(Line::from(Span::styled(format!(" {line}"), style)));
                    }
                }
            }

            if idx + 1 < blocks.len() {
                lines.push(Line::from(Span::raw("")));
            }
        }

        if transcript.is_loading() {
            if !blocks.is_empty() {
                lines.push(Line::from(Span::raw("")));
            }
            lines.push(Line::from(Span::styled(
                format!(" {} thinking...", SPINNER[self.spinner]),
                Style::default().fg(Color::Rgb(255, 210, 90)),
            )));
        }

        // Trailing padding keeps the last block reachable when wrapped-line
        // counting comes up short.
        lines.push(Line::from(Span::raw("")));

        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intellisphere_core::{LocalSessionCache, MemoryStore, SessionMeta};
    use intellisphere_protocol::{Domain, SessionId};
    use intellisphere_test_utils::ScriptedSessionService;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn app_with(sessions: &[(&str, i64)], pointer: Option<&str>) -> App {
        let cache = LocalSessionCache::new(Arc::new(MemoryStore::new()), Domain::Law);
        for (id, at) in sessions {
            cache
                .insert(&SessionId::new(*id), SessionMeta::new(*at))
                .expect("insert");
        }
        if let Some(pointer) = pointer {
            cache.set_pointer(&SessionId::new(pointer)).expect("pointer");
        }
        let controller =
            SessionController::new(Arc::new(ScriptedSessionService::new()), cache)
                .expect("controller");
        App::new(controller, None)
    }

    fn text(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn highlight_starts_on_active_row() {
        let app = app_with(&[("a", 1), ("b", 3), ("c", 2)], Some("c"));
        assert_eq!(app.selected_row, 1);
        assert_eq!(app.active_label().as_deref(), Some("Session 2"));
        assert_eq!(app.domain_title(), "Law");
    }

    #[test]
    fn row_navigation_stays_in_bounds() {
        let mut app = app_with(&[("a", 1), ("b", 2)], None);
        app.select_previous_row();
        assert_eq!(app.selected_row, 0);
        app.select_next_row();
        app.select_next_row();
        assert_eq!(app.selected_row, 1);
        assert_eq!(app.selected_session().map(|row| row.id.as_str()), Some("a"));
    }

    #[test]
    fn uncached_pointer_reads_as_new_session() {
        let app = app_with(&[], Some("1700000000000_abcdef"));
        assert_eq!(
            app.active_label().as_deref(),
            Some("New session (abcdef)")
        );
    }

    #[test]
    fn empty_transcript_shows_placeholder() {
        let app = app_with(&[], None);
        assert_eq!(
            text(&app.render_lines()),
            vec![" No messages yet. Ask a question below to start."]
        );
    }

    #[test]
    fn blocks_render_with_badges() {
        let mut app = app_with(&[], None);
        let transcript = app.controller.transcript_mut();
        transcript.push_user("hi");
        transcript.push_error("Please log in to continue");
        assert_eq!(
            text(&app.render_lines()),
            vec![
                " you ",
                " hi",
                "",
                " error ",
                " Please log in to continue",
                "",
            ]
        );
    }

    #[test]
    fn menu_needs_a_row() {
        let mut app = app_with(&[], None);
        app.toggle_focus();
        app.open_menu();
        assert!(!app.menu_open);
        assert_eq!(app.focus, Focus::Sessions);
    }
}
