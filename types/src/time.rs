//! Chain time: millisecond timestamps relative to the chain epoch, and the
//! discrete forging slots they fall into.
//!
//! A `Timestamp` counts milliseconds since the chain epoch, not since the
//! Unix epoch; `ChainParams::epoch_ms` anchors it to wall-clock time. The
//! conversions between the two live in the slot clock, which owns the
//! epoch offset.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// Milliseconds since the chain epoch (UTC).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The chain epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn new(ms: u64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn saturating_add(&self, ms: u64) -> Self {
        Self(self.0.saturating_add(ms))
    }

    pub fn saturating_sub(&self, ms: u64) -> Self {
        Self(self.0.saturating_sub(ms))
    }

    /// Milliseconds elapsed since this timestamp (relative to `now`).
    pub fn elapsed_since(&self, now: Timestamp) -> u64 {
        now.0.saturating_sub(self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// A discrete forging slot: the index of a fixed-width time window since the
/// chain epoch. At most one active delegate forges per slot.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Slot(u64);

impl Slot {
    pub fn new(n: u64) -> Self {
        Self(n)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// The slot immediately after this one.
    pub fn next(&self) -> Slot {
        Self(self.0.saturating_add(1))
    }
}

impl Add<u64> for Slot {
    type Output = Slot;

    fn add(self, rhs: u64) -> Slot {
        Slot(self.0.saturating_add(rhs))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
