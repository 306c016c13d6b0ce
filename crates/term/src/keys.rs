//! Key mapping from terminal events to host actions.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::types::QueueId;

/// What the terminal host should do in response to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    /// Draw the next color for one lane.
    Advance(QueueId),
    AdvanceAll,
    ResetAll,
    Quit,
}

/// Map a key press for a host showing `lanes` lanes (queues `0..lanes`).
///
/// Digit `n` advances lane `n`, i.e. queue `n - 1`; digits past the lane
/// count are ignored.
pub fn map_key(key: KeyEvent, lanes: u32) -> Option<HostAction> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(HostAction::Quit);
    }

    match key.code {
        KeyCode::Char(ch @ '1'..='9') => {
            let queue = ch.to_digit(10)? - 1;
            (queue < lanes).then_some(HostAction::Advance(queue))
        }
        KeyCode::Char(' ') | KeyCode::Enter => Some(HostAction::AdvanceAll),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(HostAction::ResetAll),
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(HostAction::Quit),
        _ => None,
    }
}
