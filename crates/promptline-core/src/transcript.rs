//! Ordered, append-only list of turns for one conversation.

use crate::types::Turn;

/// Conversation transcript.
///
/// Turns are never edited once appended. The only removals are a full
/// [`Transcript::clear`] and [`Transcript::reseed`].
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop every turn.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Replace the transcript with a single welcome turn.
    pub fn reseed(&mut self, welcome: Turn) {
        self.turns.clear();
        self.turns.push(welcome);
    }
}
