//! TUI event types for input and backend completions.

use crossterm::event::KeyEvent;
use intellisphere_core::{ClientError, FetchTicket, PendingTurn};
use intellisphere_protocol::Message;

/// Application event emitted by input handlers or background requests.
#[derive(Debug)]
pub enum AppEvent {
    /// Keyboard input event.
    Input(KeyEvent),
    /// Periodic tick event.
    Tick,
    /// Scroll event in the chat view.
    Scroll(i16),
    /// History fetch finished for a selected session.
    HistoryLoaded {
        ticket: FetchTicket,
        result: Result<Vec<Message>, ClientError>,
    },
    /// Chat request finished for a submitted turn.
    ChatReplied {
        pending: PendingTurn,
        result: Result<Vec<Message>, ClientError>,
    },
}
