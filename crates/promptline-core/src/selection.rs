//! Selected entity carried into later requests.

use log::debug;

/// At most one selected entity id.
///
/// Set only by the user picking an entity; read by every later request that
/// does not pass its own context.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SelectionContext {
    current: Option<i64>,
}

impl SelectionContext {
    /// Select an entity. Selecting the current entity again is a no-op.
    pub fn select(&mut self, entity_id: i64) {
        if self.current != Some(entity_id) {
            debug!("selection changed (from={:?}, to={})", self.current, entity_id);
        }
        self.current = Some(entity_id);
    }

    pub fn current(&self) -> Option<i64> {
        self.current
    }

    /// Context for a request: the explicit override, else the live selection.
    pub fn resolve(&self, explicit: Option<i64>) -> Option<i64> {
        explicit.or(self.current)
    }
}
