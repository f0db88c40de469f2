//! TUI event types for input and session updates.

use crossterm::event::KeyEvent;

/// Application event emitted by input handlers or session tasks.
#[derive(Debug)]
pub enum AppEvent {
    /// Keyboard input event.
    Input(KeyEvent),
    /// Periodic tick event.
    Tick,
    /// A session action finished and the transcript may have changed.
    SessionUpdated,
    /// A form submission finished, successfully or not.
    FormSettled,
    /// Error from a session action.
    ActionError(String),
    /// Scroll event in the transcript view.
    Scroll(i16),
}
