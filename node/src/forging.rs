//! Forging: producing this node's block when its slot fires.

use crate::error::NodeError;
use crate::node::NodeState;
use rota_chain::Block;
use rota_messages::PeerGossip;
use rota_types::Timestamp;
use tracing::{debug, info};

/// Most transactions a forged block carries, highest fee first.
pub const BLOCK_TX_LIMIT: usize = 25;

/// Forge a block at `timestamp` (the slot's grid time).
///
/// Skipped when the node has no forging identity, when the transaction
/// queue is frozen for sync, or when the current round no longer assigns
/// us the slot the task was scheduled for (the chain moved under us).
pub async fn forge_block(state: &NodeState, timestamp: Timestamp) -> Result<(), NodeError> {
    let Some(keypair) = state.forging.clone() else {
        return Ok(());
    };
    if state.queue.read().await.is_locked() || state.system.read().await.synchronizing() {
        debug!("skipping forge, sync in progress");
        return Ok(());
    }

    let slot = state.round_service.clock().slot_number(timestamp);
    if state.round_service.my_turn().await != Some(slot) {
        debug!(%slot, "slot no longer ours, skipping forge");
        return Ok(());
    }

    let transactions = state.pool.write().await.take(BLOCK_TX_LIMIT);

    let block = {
        let mut blocks = state.blocks.write().await;
        let last = blocks.last().ok_or(rota_chain::ChainError::EmptyChain)?;
        let mut block = Block::assemble(
            last.height + 1,
            last.id,
            timestamp,
            keypair.public,
            transactions,
        );
        block.sign(&keypair);
        blocks.add(block.clone())?;
        block
    };
    state.block_store.save(&block)?;
    state.stats.increment("blocks_forged");
    info!(
        height = block.height,
        id = %block.id,
        %slot,
        fee = block.fee,
        transactions = block.transactions.len(),
        "forged block"
    );

    state.update_own_headers().await;
    state.broadcast(PeerGossip::LastBlock(block)).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;
    use crate::node::RotaNode;
    use rota_chain::{create_genesis_block, Delegate, Transaction};
    use rota_types::{PublicKey, TxId};

    const SECRET: &str = "rota forging test secret";

    /// A forging node whose delegate set contains only itself, with the
    /// genesis block in place and a round generated at `anchor`.
    async fn forging_node(anchor: Timestamp) -> RotaNode {
        let config = NodeConfig {
            forging_secret: Some(SECRET.to_string()),
            ..NodeConfig::default()
        };
        let node = RotaNode::new(&config).unwrap();
        let state = node.state();

        let genesis = create_genesis_block(&state.params);
        state.blocks.write().await.add(genesis).unwrap();
        state.delegates.write().await.register(Delegate {
            public_key: state.forging.as_ref().unwrap().public,
            username: "self".to_string(),
            votes: 1,
        });
        state.round_service.generate_round(anchor).await.unwrap();
        node
    }

    fn tx(n: u8, fee: u64) -> Transaction {
        Transaction {
            id: TxId::new([n; 32]),
            fee,
            sender_public_key: PublicKey([n; 32]),
        }
    }

    #[tokio::test]
    async fn forges_a_signed_block_with_pooled_transactions() {
        let anchor = Timestamp::new(50_000);
        let node = forging_node(anchor).await;
        let state = node.state();
        state.submit_transaction(tx(1, 5)).await;
        state.submit_transaction(tx(2, 30)).await;

        forge_block(state, anchor).await.unwrap();

        let blocks = state.blocks.read().await;
        let block = blocks.last().unwrap();
        assert_eq!(block.height, 2);
        assert_eq!(block.fee, 35);
        assert_eq!(block.transactions[0].fee, 30);
        assert_eq!(
            block.generator_public_key,
            state.forging.as_ref().unwrap().public
        );
        assert!(block.verify_signature());
        drop(blocks);

        // Persisted and counted, pool drained.
        assert_eq!(state.block_store.get_many(2, 1).unwrap().len(), 1);
        assert_eq!(state.stats.get("blocks_forged"), 1);
        assert!(state.pool.read().await.is_empty());
    }

    #[tokio::test]
    async fn skips_when_queue_is_locked() {
        let anchor = Timestamp::new(50_000);
        let node = forging_node(anchor).await;
        let state = node.state();
        state.queue.write().await.lock();

        forge_block(state, anchor).await.unwrap();
        assert_eq!(state.height().await, 1);
        assert_eq!(state.stats.get("blocks_forged"), 0);
    }

    #[tokio::test]
    async fn skips_a_stale_slot() {
        let anchor = Timestamp::new(50_000);
        let node = forging_node(anchor).await;
        let state = node.state();

        // The task was scheduled for a slot the current round does not
        // assign us.
        forge_block(state, Timestamp::new(90_000)).await.unwrap();
        assert_eq!(state.height().await, 1);
    }

    #[tokio::test]
    async fn non_forging_node_is_a_no_op() {
        let node = RotaNode::new(&NodeConfig::default()).unwrap();
        let state = node.state();
        let genesis = create_genesis_block(&state.params);
        state.blocks.write().await.add(genesis).unwrap();

        forge_block(state, Timestamp::new(50_000)).await.unwrap();
        assert_eq!(state.height().await, 1);
    }
}
