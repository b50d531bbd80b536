//! Consensus parameters shared by every node on a rota network.

use serde::{Deserialize, Serialize};

/// The timing and consensus constants every node must agree on.
///
/// `slot_interval_ms` and `active_delegates` define the round grid: a round
/// is one pass over all active delegates, spanning
/// `active_delegates * slot_interval_ms` milliseconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParams {
    // ── Timing ───────────────────────────────────────────────────────────
    /// Width of one forging slot in milliseconds.
    pub slot_interval_ms: u64,

    /// Wall-clock Unix milliseconds of the chain epoch.
    /// Mainnet: 2020-01-01T00:00:00Z.
    pub epoch_ms: u64,

    /// How many milliseconds late a node may still fire its own forge slot.
    /// Any later and the slot is skipped rather than forged out of turn.
    pub forge_lateness_ms: u64,

    // ── Consensus ────────────────────────────────────────────────────────
    /// Number of delegates assigned a slot each round.
    pub active_delegates: usize,

    /// Minimum percentage of unbanned peers that must report our height
    /// before the node considers itself consistent with the network.
    pub min_consensus_pct: u8,

    /// Minimum percentage of unbanned peers that must back the plurality
    /// height before that height is treated as authoritative.
    pub height_quorum_pct: u8,
}

impl ChainParams {
    /// Mainnet configuration.
    pub fn mainnet() -> Self {
        Self {
            slot_interval_ms: 10_000,
            epoch_ms: 1_577_836_800_000, // 2020-01-01T00:00:00Z
            forge_lateness_ms: 500,
            active_delegates: 11,
            min_consensus_pct: 51,
            height_quorum_pct: 34,
        }
    }

    /// Full round span in milliseconds.
    pub fn round_duration_ms(&self) -> u64 {
        self.slot_interval_ms * self.active_delegates as u64
    }
}

impl Default for ChainParams {
    fn default() -> Self {
        Self::mainnet()
    }
}
