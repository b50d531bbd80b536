//! Holder of the current and previous round.
//!
//! The node keeps exactly two rounds in memory: the one being forged and the
//! settled one before it (needed for rollback). Older rounds live only in the
//! round store.

use crate::round::Round;

#[derive(Default)]
pub struct RoundRepository {
    current: Option<Round>,
    previous: Option<Round>,
}

impl RoundRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Round> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut Round> {
        self.current.as_mut()
    }

    pub fn previous(&self) -> Option<&Round> {
        self.previous.as_ref()
    }

    pub fn set_current(&mut self, round: Round) {
        self.current = Some(round);
    }

    /// Seed the previous slot directly. Warm-up only; the live path moves
    /// rounds through [`demote_current`](Self::demote_current).
    pub fn set_previous(&mut self, round: Round) {
        self.previous = Some(round);
    }

    /// Move the current round into the previous slot, dropping whatever was
    /// there. Leaves no current round.
    pub fn demote_current(&mut self) {
        if let Some(round) = self.current.take() {
            self.previous = Some(round);
        }
    }

    /// Move the previous round back into the current slot, discarding the
    /// round that was current. Returns the discarded round so callers can
    /// erase it from persistence.
    pub fn promote_previous(&mut self) -> Option<Round> {
        let discarded = self.current.take();
        self.current = self.previous.take();
        discarded
    }
}
