//! The slot clock: pure arithmetic between timestamps and forging slots.

use rota_types::{ChainParams, Slot, Timestamp};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in Unix milliseconds.
///
/// Saturates to zero on clocks set before the Unix epoch rather than
/// panicking; the node is useless on such a clock but must not crash.
pub fn wall_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Maps chain time onto the slot grid and back, and anchors both to the
/// wall clock via the chain epoch.
#[derive(Clone, Copy, Debug)]
pub struct SlotClock {
    interval_ms: u64,
    epoch_ms: u64,
}

impl SlotClock {
    pub fn new(params: &ChainParams) -> Self {
        Self {
            interval_ms: params.slot_interval_ms,
            epoch_ms: params.epoch_ms,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// The slot containing `timestamp`.
    pub fn slot_number(&self, timestamp: Timestamp) -> Slot {
        Slot::new(timestamp.as_millis() / self.interval_ms)
    }

    /// The chain time at which `slot` opens.
    pub fn slot_time(&self, slot: Slot) -> Timestamp {
        Timestamp::new(slot.as_u64().saturating_mul(self.interval_ms))
    }

    /// The wall-clock Unix milliseconds at which `slot` opens.
    pub fn slot_real_time(&self, slot: Slot) -> u64 {
        self.epoch_ms
            .saturating_add(self.slot_time(slot).as_millis())
    }

    /// Chain time corresponding to a wall-clock reading.
    pub fn chain_now(&self, wall_ms: u64) -> Timestamp {
        Timestamp::new(wall_ms.saturating_sub(self.epoch_ms))
    }

    /// Current chain time.
    pub fn now(&self) -> Timestamp {
        self.chain_now(wall_now_ms())
    }

    /// The slot open right now.
    pub fn current_slot(&self) -> Slot {
        self.slot_number(self.now())
    }

    /// The first slot of the `round_len`-wide grid round containing `slot`.
    pub fn first_slot_of_round(&self, slot: Slot, round_len: usize) -> Slot {
        let len = round_len.max(1) as u64;
        Slot::new(slot.as_u64() - slot.as_u64() % len)
    }
}
