//! The node's own gossip headers and sync status flags.

use rota_chain::repository::BlockRepository;
use rota_messages::{PeerHeaders, RECENT_BLOCK_IDS};

/// Mutable node-level state: the headers this node gossips about itself,
/// whether a sync cycle is running, and when the last one started (for the
/// sync rate limit).
#[derive(Debug, Default)]
pub struct SystemState {
    headers: PeerHeaders,
    synchronizing: bool,
    last_sync_started_ms: Option<u64>,
}

impl SystemState {
    pub fn headers(&self) -> &PeerHeaders {
        &self.headers
    }

    pub fn synchronizing(&self) -> bool {
        self.synchronizing
    }

    /// Recompute our headers from the chain: broadhash and height from the
    /// tip, plus the most recent block-id claims.
    pub fn refresh_headers(&mut self, blocks: &BlockRepository) {
        let mut headers = PeerHeaders::default();
        for (height, id) in blocks.recent_ids(RECENT_BLOCK_IDS) {
            headers.record_block(height, id);
        }
        self.headers = headers;
    }

    /// Try to enter a sync cycle at wall time `now_ms`. Refused while a
    /// cycle is running or within `timeout_ms` of the previous start.
    pub fn begin_sync(&mut self, now_ms: u64, timeout_ms: u64) -> bool {
        if self.synchronizing {
            return false;
        }
        if let Some(started) = self.last_sync_started_ms {
            if now_ms.saturating_sub(started) < timeout_ms {
                return false;
            }
        }
        self.synchronizing = true;
        self.last_sync_started_ms = Some(now_ms);
        true
    }

    pub fn end_sync(&mut self) {
        self.synchronizing = false;
    }
}
