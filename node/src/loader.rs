//! Startup warm-up: rebuild in-memory state from the stores.

use crate::dispatch::{Action, TaskKey};
use crate::error::NodeError;
use crate::node::NodeState;
use rota_chain::create_genesis_block;
use rota_rounds::{wall_now_ms, Round};
use rota_types::Height;
use rota_utils::format_duration;
use std::time::Duration;
use tracing::info;

/// Delay before the first sync cycle, giving transports time to connect.
pub const START_SYNC_DELAY: Duration = Duration::from_millis(15_000);

/// Rows loaded per store read during warm-up.
pub const WARM_UP_BATCH: usize = 1_000;

/// Bring the node up from its stores: seed genesis into an empty store,
/// replay blocks and round settlements, rebuild our gossip headers, and
/// schedule the first sync.
pub async fn warm_up(state: &NodeState) -> Result<(), NodeError> {
    let started = wall_now_ms();

    if state.block_store.count()? == 0 {
        let genesis = create_genesis_block(&state.params);
        info!(id = %genesis.id, "empty store, writing genesis block");
        state.block_store.save(&genesis)?;
    }

    let loaded = warm_up_blocks(state).await?;
    let rounds = warm_up_rounds(state).await?;

    {
        let blocks = state.blocks.read().await;
        state.system.write().await.refresh_headers(&blocks);
    }

    if !state.known_peers.is_empty() {
        info!(peers = state.known_peers.len(), "known peers configured");
    }
    let height = state.height().await;
    info!(
        blocks = loaded,
        rounds,
        height,
        elapsed = %format_duration(wall_now_ms().saturating_sub(started)),
        "warm-up complete"
    );

    state
        .scheduler
        .schedule(TaskKey::StartSync, START_SYNC_DELAY, Action::StartSync);
    Ok(())
}

/// Replay every stored block into the chain repository, in height order.
async fn warm_up_blocks(state: &NodeState) -> Result<usize, NodeError> {
    let mut offset: Height = 0;
    let mut loaded = 0usize;
    loop {
        let batch = state.block_store.get_many(offset, WARM_UP_BATCH)?;
        let Some(last) = batch.last() else {
            break;
        };
        offset = last.height + 1;
        let short = batch.len() < WARM_UP_BATCH;

        let mut blocks = state.blocks.write().await;
        for block in batch {
            blocks.add(block)?;
            loaded += 1;
        }
        drop(blocks);
        if short {
            break;
        }
    }
    Ok(loaded)
}

/// Replay stored rounds: settled ones get their fee distribution applied
/// again, and the last two become previous/current.
async fn warm_up_rounds(state: &NodeState) -> Result<usize, NodeError> {
    let mut offset: Height = 0;
    let mut seen = 0usize;
    let mut previous: Option<Round> = None;
    let mut current: Option<Round> = None;
    loop {
        let batch = state.round_store.get_many(offset, WARM_UP_BATCH)?;
        let Some(last) = batch.last() else {
            break;
        };
        offset = last.start_height + 1;
        let short = batch.len() < WARM_UP_BATCH;

        for round in batch {
            if round.end_height.is_some() {
                let sum = state.round_service.sum_round(&round).await;
                state.round_service.apply_unconfirmed(&sum).await;
            }
            previous = current.take();
            current = Some(round);
            seen += 1;
        }
        if short {
            break;
        }
    }

    let mut rounds = state.rounds.write().await;
    if let Some(round) = previous {
        rounds.set_previous(round);
    }
    if let Some(round) = current {
        rounds.set_current(round);
    }
    Ok(seen)
}
