//! A single forging round.

use rota_types::{Height, PublicKey, Slot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One round of the forge schedule.
///
/// `start_height` is the height of the first block forged inside this round,
/// one past the block the round was generated from. `end_height` stays `None`
/// while the round is open and is filled in when the next round supersedes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub start_height: Height,
    pub end_height: Option<Height>,
    pub slots: BTreeMap<PublicKey, Slot>,
}

impl Round {
    pub fn new(start_height: Height, slots: BTreeMap<PublicKey, Slot>) -> Self {
        Self {
            start_height,
            end_height: None,
            slots,
        }
    }

    /// Number of delegates scheduled in this round.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Slot assigned to `key`, if the delegate forges this round.
    pub fn slot_of(&self, key: &PublicKey) -> Option<Slot> {
        self.slots.get(key).copied()
    }

    /// Earliest slot in the round.
    pub fn first_slot(&self) -> Option<Slot> {
        self.slots.values().copied().min()
    }

    /// Latest slot in the round.
    pub fn last_slot(&self) -> Option<Slot> {
        self.slots.values().copied().max()
    }
}
