//! Task identity keys, the dispatched action set, and the adapter that
//! lets the round engine drive the node's scheduler.
//!
//! Every delayed or deferred piece of work in the node is an [`Action`];
//! the dispatch loop in `node.rs` is the single match over them. Scheduled
//! actions carry a [`TaskKey`] so rescheduling replaces the pending entry
//! and rollback can cancel by key.

use rota_chain::Block;
use rota_messages::PeerAddress;
use rota_rounds::RoundScheduler;
use rota_tasks::SchedulerHandle;
use rota_types::Timestamp;
use std::time::Duration;

/// Identity of a scheduled task. One pending instance per key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskKey {
    /// This node's own forge slot.
    BlockGenerate,
    /// Round boundary: settle and generate the next round.
    RoundFinish,
    /// Kick off a sync cycle.
    StartSync,
}

/// Work the dispatch loop executes.
#[derive(Clone, Debug)]
pub enum Action {
    /// Forge a block with `timestamp` as its slot-aligned creation time.
    ForgeBlock { timestamp: Timestamp },
    /// Settle the ending round and generate the next one, anchored at
    /// `timestamp` (the first slot past the finished round).
    FinishRound { timestamp: Timestamp },
    /// Enter the sync loop.
    StartSync,
    /// A peer gossiped a freshly forged block.
    PeerLastBlock { from: PeerAddress, block: Block },
}

/// [`RoundScheduler`] implementation over the node's task scheduler.
///
/// The round engine talks in (delay, chain timestamp) pairs; this adapter
/// turns them into keyed [`Action`] entries.
pub struct NodeRoundScheduler {
    handle: SchedulerHandle<TaskKey, Action>,
}

impl NodeRoundScheduler {
    pub fn new(handle: SchedulerHandle<TaskKey, Action>) -> Self {
        Self { handle }
    }
}

impl RoundScheduler for NodeRoundScheduler {
    fn schedule_forge(&self, delay_ms: u64, timestamp: Timestamp) {
        self.handle.schedule(
            TaskKey::BlockGenerate,
            Duration::from_millis(delay_ms),
            Action::ForgeBlock { timestamp },
        );
    }

    fn cancel_forge(&self) {
        self.handle.cancel(TaskKey::BlockGenerate);
    }

    fn schedule_round_finish(&self, delay_ms: u64, timestamp: Timestamp) {
        self.handle.schedule(
            TaskKey::RoundFinish,
            Duration::from_millis(delay_ms),
            Action::FinishRound { timestamp },
        );
    }

    fn cancel_round_finish(&self) {
        self.handle.cancel(TaskKey::RoundFinish);
    }
}
