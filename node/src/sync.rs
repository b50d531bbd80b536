//! Chain synchronization.
//!
//! A sync cycle freezes the transaction pool, anchors round state at the
//! frozen chain tip, and then walks toward the network: probe a random
//! worthy peer for our tip, download forward when it is on the peer's
//! chain, roll back one block (banning the peer that fed us the orphan)
//! when it is not. The loop ends when enough unbanned peers report our
//! height, or when no worthy peer remains.

use crate::dispatch::{Action, TaskKey};
use crate::error::NodeError;
use crate::node::{Inbound, NodeState};
use rota_chain::compare::{can_be_processed, is_greater_height};
use rota_chain::genesis::GENESIS_HEIGHT;
use rota_chain::Block;
use rota_messages::{BlockData, BlockLimit, CommonBlocksReply, PeerAddress, PeerReply, PeerRequest};
use rota_network::{consensus_pct, quorum_height_span, NetworkError, PeerLink};
use rota_rounds::wall_now_ms;
use rota_types::Height;
use rota_utils::format_duration;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Minimum wall-clock gap between sync cycle starts, and the backoff
/// before retrying after a failed cycle step.
pub const SYNC_TIMEOUT: u64 = 10_000;

/// Blocks requested per download round-trip.
pub const BLOCKS_PER_REQUEST: u32 = 42;

pub struct SyncService {
    state: NodeState,
}

impl SyncService {
    pub fn new(state: NodeState) -> Self {
        Self { state }
    }

    /// Run one full sync cycle. Re-entry and rapid restarts are refused by
    /// the rate limit; everything else is logged and survived.
    pub async fn run(&self) {
        if !self
            .state
            .system
            .write()
            .await
            .begin_sync(wall_now_ms(), SYNC_TIMEOUT)
        {
            debug!("sync suppressed by rate limit");
            return;
        }
        let started = wall_now_ms();
        let height = self.state.height().await;
        info!(height, "sync started");

        self.freeze_transactions().await;

        // Freeze round state at the tip: slot math during download anchors
        // at the last applied block, not the moving wall clock.
        let tip_created_at = {
            let blocks = self.state.blocks.read().await;
            blocks.last().map(|b| b.created_at)
        };
        if let Some(timestamp) = tip_created_at {
            if let Err(e) = self.state.round_service.restore(timestamp).await {
                warn!(error = %e, "round restore at sync entry failed");
            }
        }

        let mut last_peer: Option<PeerAddress> = None;
        let mut delay = false;
        while !self.my_consensus().await {
            if delay {
                tokio::time::sleep(Duration::from_millis(SYNC_TIMEOUT)).await;
            }
            match self.sync_cycle(&mut last_peer).await {
                Ok(()) => delay = false,
                Err(NodeError::Network(NetworkError::NoWorthyPeers)) => {
                    info!("no worthy peers, leaving sync");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "sync step failed, retrying");
                    delay = true;
                }
            }
        }

        self.finish(started).await;
    }

    /// One probe-and-advance step against a random worthy peer.
    async fn sync_cycle(&self, last_peer: &mut Option<PeerAddress>) -> Result<(), NodeError> {
        let (tip, height) = {
            let blocks = self.state.blocks.read().await;
            let last = blocks.last().ok_or(rota_chain::ChainError::EmptyChain)?;
            (
                BlockData {
                    id: last.id,
                    height: last.height,
                },
                last.height,
            )
        };

        let (address, link) = self.pick_worthy_peer(height).await?;
        let reply = link
            .request(&address, PeerRequest::CommonBlocks(tip))
            .await?;
        match reply {
            PeerReply::CommonBlocks(CommonBlocksReply { is_exist: false }) => {
                warn!(peer = %address, height, "tip is not on the peer's chain, rolling back");
                if let Some(liar) = last_peer.take() {
                    self.state.peers.write().await.ban(&liar);
                    self.state.stats.increment("peers_banned");
                }
                self.rollback().await
            }
            PeerReply::CommonBlocks(_) => {
                self.download_blocks(&address, &link, height).await?;
                *last_peer = Some(address);
                Ok(())
            }
            _ => Err(NetworkError::UnexpectedReply { peer: address }.into()),
        }
    }

    /// A random unbanned peer ahead of us, gated on the network's height
    /// signal clearing quorum.
    async fn pick_worthy_peer(&self, height: Height) -> Result<(PeerAddress, PeerLink), NodeError> {
        let peers = self.state.peers.read().await;
        quorum_height_span(&peers.unbanned(), self.state.params.height_quorum_pct)
            .ok_or(NetworkError::NoWorthyPeers)?;
        let peer = peers
            .random_ahead(height)
            .ok_or(NetworkError::NoWorthyPeers)?;
        Ok((peer.address.clone(), peer.link.clone()))
    }

    /// Request and apply the next batch of blocks above `height`.
    async fn download_blocks(
        &self,
        address: &PeerAddress,
        link: &PeerLink,
        height: Height,
    ) -> Result<(), NodeError> {
        let reply = link
            .request(
                address,
                PeerRequest::Blocks(BlockLimit {
                    height,
                    limit: BLOCKS_PER_REQUEST,
                }),
            )
            .await?;
        let PeerReply::Blocks(batch) = reply else {
            return Err(NetworkError::UnexpectedReply {
                peer: address.clone(),
            }
            .into());
        };

        let mut applied = 0usize;
        for block in batch {
            let mut blocks = self.state.blocks.write().await;
            let Some(last) = blocks.last() else {
                return Err(rota_chain::ChainError::EmptyChain.into());
            };
            if !can_be_processed(last, &block) {
                warn!(
                    height = block.height,
                    id = %block.id,
                    "batch block does not extend the chain, dropping the rest"
                );
                break;
            }
            blocks.add(block.clone())?;
            drop(blocks);
            self.state.block_store.save(&block)?;
            self.state.stats.increment("blocks_applied");
            applied += 1;
        }
        // A peer claiming to be ahead but serving nothing usable would
        // otherwise spin this loop hot.
        if applied == 0 {
            return Err(NetworkError::EmptyBlockBatch {
                peer: address.clone(),
            }
            .into());
        }
        info!(applied, from = %address, "applied block batch");
        Ok(())
    }

    /// Revert the last round settlement, then drop the tip block (never
    /// genesis) from repository and store.
    ///
    /// The round revert must run while the tip is still in the repository:
    /// it recomputes the previous round's fee sum from the chain, and a
    /// shortened span sums to zero, which would leave the settled fees
    /// credited.
    async fn rollback(&self) -> Result<(), NodeError> {
        if let Some(discarded) = self.state.round_service.roll_back().await? {
            self.state.round_store.delete(discarded.start_height)?;
        }
        let popped = {
            let mut blocks = self.state.blocks.write().await;
            match blocks.last() {
                Some(last) if last.height > GENESIS_HEIGHT => blocks.remove_last(),
                _ => None,
            }
        };
        if let Some(block) = popped {
            self.state.block_store.delete(block.height)?;
            self.state.stats.increment("blocks_rolled_back");
            debug!(height = block.height, id = %block.id, "rolled back block");
        }
        Ok(())
    }

    /// Enough unbanned peers report our height.
    async fn my_consensus(&self) -> bool {
        let height = self.state.height().await;
        let peers = self.state.peers.read().await;
        consensus_pct(&peers.unbanned(), height) >= self.state.params.min_consensus_pct
    }

    async fn freeze_transactions(&self) {
        let mut pool = self.state.pool.write().await;
        let mut queue = self.state.queue.write().await;
        queue.lock();
        for tx in pool.drain() {
            queue.push(tx);
        }
    }

    /// Leave sync: re-anchor rounds at the present, persist them, replay
    /// deferred actions, thaw the transaction pool.
    async fn finish(&self, started_ms: u64) {
        let now = self.state.round_service.clock().now();
        if let Err(e) = self.state.round_service.restore(now).await {
            warn!(error = %e, "round restore at sync exit failed");
        }
        crate::node::persist_rounds(&self.state).await;

        let deferred = self.state.events.write().await.drain();
        for action in deferred {
            let _ = self.state.inbound_tx.send(Inbound::Action(action)).await;
        }

        {
            let mut pool = self.state.pool.write().await;
            let mut queue = self.state.queue.write().await;
            queue.unlock();
            queue.drain_into(&mut pool);
        }

        self.state.system.write().await.end_sync();
        self.state.stats.increment("sync_cycles");
        let height = self.state.height().await;
        info!(
            height,
            elapsed = %format_duration(wall_now_ms().saturating_sub(started_ms)),
            "sync finished"
        );
    }
}

/// A peer gossiped its freshly forged block.
///
/// The claim lands in that peer's headers either way. A block that extends
/// our chain is applied and persisted and our own headers are rebroadcast;
/// one that is ahead but not contiguous means we fell behind, so a sync is
/// scheduled.
pub async fn on_peer_last_block(state: &NodeState, from: PeerAddress, block: Block) {
    {
        let mut peers = state.peers.write().await;
        let updated = peers.get(&from).map(|p| {
            let mut headers = p.headers.clone();
            headers.record_block(block.height, block.id);
            headers
        });
        if let Some(headers) = updated {
            peers.update_headers(&from, headers);
        }
    }

    enum Outcome {
        Applied,
        Behind,
        Ignored,
    }
    let outcome = {
        let mut blocks = state.blocks.write().await;
        match blocks.last() {
            Some(last) if can_be_processed(last, &block) => match blocks.add(block.clone()) {
                Ok(()) => Outcome::Applied,
                Err(e) => {
                    warn!(error = %e, "gossiped block rejected");
                    Outcome::Ignored
                }
            },
            Some(last) if is_greater_height(last, &block) => Outcome::Behind,
            _ => Outcome::Ignored,
        }
    };

    match outcome {
        Outcome::Applied => {
            if let Err(e) = state.block_store.save(&block) {
                warn!(error = %e, "failed to persist gossiped block");
            }
            state.stats.increment("blocks_applied");
            info!(height = block.height, id = %block.id, from = %from, "applied gossiped block");
            state.update_own_headers().await;
        }
        Outcome::Behind => {
            let ours = state.height().await;
            debug!(
                ours,
                theirs = block.height,
                "gossiped block is ahead of us, scheduling sync"
            );
            state
                .scheduler
                .schedule(TaskKey::StartSync, Duration::ZERO, Action::StartSync);
        }
        Outcome::Ignored => {}
    }
}
