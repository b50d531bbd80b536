//! Node wiring and the dispatch loop.
//!
//! `RotaNode` owns every repository and service, runs the scheduler, and
//! drives one `tokio::select!` loop over due tasks and inbound network
//! traffic. Handlers run to completion between awaits; the only work that
//! leaves the loop is a sync cycle, which runs as its own task guarded by
//! the synchronizing flag.

use crate::config::NodeConfig;
use crate::dispatch::{Action, NodeRoundScheduler, TaskKey};
use crate::error::NodeError;
use crate::events::EventQueue;
use crate::mempool::{TransactionPool, TransactionQueue};
use crate::system::SystemState;
use crate::{forging, loader, sync};
use rota_chain::{
    AccountRepository, BlockRepository, DelegateRepository, Transaction,
};
use rota_crypto::keypair_from_secret;
use rota_messages::{
    BlockLimit, CommonBlocksReply, PeerAddress, PeerGossip, PeerReply, PeerRequest,
};
use rota_network::{NetworkPeer, PeerNetworkRepository};
use rota_rounds::{RoundRepository, RoundService};
use rota_store::{BlockStore, MemoryStore, RoundStore};
use rota_tasks::{Scheduler, SchedulerHandle};
use rota_types::{ChainParams, Height, KeyPair, PublicKey};
use rota_utils::StatsCounter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, RwLock};
use tracing::{debug, info, warn};

/// How long shutdown waits for queued work to drain.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

const CHANNEL_BUFFER: usize = 256;

/// Counter names tracked by the node.
const NODE_STATS: &[&str] = &[
    "blocks_forged",
    "blocks_applied",
    "blocks_rolled_back",
    "sync_cycles",
    "peers_banned",
];

/// Traffic entering the dispatch loop: peer requests and gossip from the
/// transport layer, plus actions re-dispatched internally (deferred events,
/// test drivers).
pub enum Inbound {
    Request {
        from: PeerAddress,
        request: PeerRequest,
        reply: oneshot::Sender<PeerReply>,
    },
    Gossip {
        from: PeerAddress,
        gossip: PeerGossip,
    },
    Action(Action),
}

/// Shared handles to everything the node owns. Cloning is cheap; every
/// service and handler works through one of these.
#[derive(Clone)]
pub struct NodeState {
    pub params: ChainParams,
    pub forging: Option<Arc<KeyPair>>,
    pub known_peers: Vec<PeerAddress>,
    pub blocks: Arc<RwLock<BlockRepository>>,
    pub rounds: Arc<RwLock<RoundRepository>>,
    pub delegates: Arc<RwLock<DelegateRepository>>,
    pub accounts: Arc<RwLock<AccountRepository>>,
    pub peers: Arc<RwLock<PeerNetworkRepository>>,
    pub block_store: Arc<dyn BlockStore>,
    pub round_store: Arc<dyn RoundStore>,
    pub system: Arc<RwLock<SystemState>>,
    pub pool: Arc<RwLock<TransactionPool>>,
    pub queue: Arc<RwLock<TransactionQueue>>,
    pub events: Arc<RwLock<EventQueue>>,
    pub round_service: Arc<RoundService>,
    pub stats: Arc<StatsCounter>,
    pub scheduler: SchedulerHandle<TaskKey, Action>,
    pub inbound_tx: mpsc::Sender<Inbound>,
}

impl NodeState {
    /// Recompute our gossip headers from the chain and broadcast the
    /// update to every unbanned peer.
    pub async fn update_own_headers(&self) {
        let headers = {
            let blocks = self.blocks.read().await;
            let mut system = self.system.write().await;
            system.refresh_headers(&blocks);
            system.headers().clone()
        };
        self.broadcast(PeerGossip::HeadersUpdate(headers)).await;
    }

    pub async fn broadcast(&self, gossip: PeerGossip) {
        let peers = self.peers.read().await;
        for peer in peers.unbanned() {
            peer.link.gossip(gossip.clone());
        }
    }

    /// Accept a transaction into the pool, or into the staging queue while
    /// the pool is frozen for sync. Returns false for a duplicate.
    pub async fn submit_transaction(&self, tx: Transaction) -> bool {
        let mut queue = self.queue.write().await;
        if queue.is_locked() {
            queue.push(tx);
            return true;
        }
        drop(queue);
        self.pool.write().await.insert(tx)
    }

    pub async fn height(&self) -> Height {
        self.blocks.read().await.height()
    }
}

/// Cloneable control surface over a running node.
#[derive(Clone)]
pub struct NodeHandle {
    state: NodeState,
    shutdown_tx: watch::Sender<bool>,
}

impl NodeHandle {
    pub fn state(&self) -> &NodeState {
        &self.state
    }

    /// Sender the transport layer delivers inbound traffic through.
    pub fn inbound(&self) -> mpsc::Sender<Inbound> {
        self.state.inbound_tx.clone()
    }

    /// Track a newly connected peer.
    pub async fn add_peer(&self, peer: NetworkPeer) {
        self.state.peers.write().await.add(peer);
    }

    pub async fn height(&self) -> Height {
        self.state.height().await
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

pub struct RotaNode {
    state: NodeState,
    scheduler: Scheduler<TaskKey, Action>,
    due_rx: mpsc::Receiver<(TaskKey, Action)>,
    inbound_rx: mpsc::Receiver<Inbound>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl RotaNode {
    /// A node backed by in-memory stores.
    pub fn new(config: &NodeConfig) -> Result<Self, NodeError> {
        let store = Arc::new(MemoryStore::new());
        Self::with_stores(config, store.clone(), store)
    }

    /// A node over caller-provided stores (pre-seeded chains, future
    /// database backends).
    pub fn with_stores(
        config: &NodeConfig,
        block_store: Arc<dyn BlockStore>,
        round_store: Arc<dyn RoundStore>,
    ) -> Result<Self, NodeError> {
        let known_peers = config
            .peers
            .iter()
            .map(|s| {
                s.parse::<PeerAddress>()
                    .map_err(|e| NodeError::Config(format!("invalid peer address {s:?}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let forging = config
            .forging_secret
            .as_deref()
            .map(|secret| Arc::new(keypair_from_secret(secret)));
        let forging_key = forging
            .as_ref()
            .map(|kp| kp.public)
            .unwrap_or(PublicKey::ZERO);

        let (due_tx, due_rx) = mpsc::channel(CHANNEL_BUFFER);
        let (scheduler, handle) = Scheduler::new(due_tx);
        let (inbound_tx, inbound_rx) = mpsc::channel(CHANNEL_BUFFER);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let params = config.params.clone();
        let rounds = Arc::new(RwLock::new(RoundRepository::new()));
        let blocks = Arc::new(RwLock::new(BlockRepository::new()));
        let delegates = Arc::new(RwLock::new(DelegateRepository::new(
            params.active_delegates,
        )));
        let accounts = Arc::new(RwLock::new(AccountRepository::new()));

        let round_service = Arc::new(RoundService::new(
            forging_key,
            params.clone(),
            rounds.clone(),
            blocks.clone(),
            delegates.clone(),
            accounts.clone(),
            Arc::new(NodeRoundScheduler::new(handle.clone())),
        ));

        let state = NodeState {
            params,
            forging,
            known_peers,
            blocks,
            rounds,
            delegates,
            accounts,
            peers: Arc::new(RwLock::new(PeerNetworkRepository::new())),
            block_store,
            round_store,
            system: Arc::new(RwLock::new(SystemState::default())),
            pool: Arc::new(RwLock::new(TransactionPool::new())),
            queue: Arc::new(RwLock::new(TransactionQueue::new())),
            events: Arc::new(RwLock::new(EventQueue::new())),
            round_service,
            stats: Arc::new(StatsCounter::new(NODE_STATS)),
            scheduler: handle,
            inbound_tx,
        };

        Ok(Self {
            state,
            scheduler,
            due_rx,
            inbound_rx,
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    pub fn handle(&self) -> NodeHandle {
        NodeHandle {
            state: self.state.clone(),
            shutdown_tx: self.shutdown_tx.clone(),
        }
    }

    /// Warm up from the store and run the dispatch loop until shutdown.
    pub async fn start(self) -> Result<(), NodeError> {
        // Hold our shutdown sender for the node's lifetime; otherwise a
        // caller that never took a handle would close the watch channel
        // and stop the loop immediately.
        let RotaNode {
            state,
            scheduler,
            mut due_rx,
            mut inbound_rx,
            shutdown_tx: _shutdown_tx,
            mut shutdown_rx,
        } = self;

        tokio::spawn(scheduler.run());
        loader::warm_up(&state).await?;
        let height = state.height().await;
        info!(height, forging = state.forging.is_some(), "node started");

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                Some((_, action)) = due_rx.recv() => handle_action(&state, action).await,
                Some(message) = inbound_rx.recv() => handle_inbound(&state, message).await,
            }
        }

        info!("shutting down, draining queued work");
        let drain = async {
            while let Ok(message) = inbound_rx.try_recv() {
                handle_inbound(&state, message).await;
            }
            while let Ok((_, action)) = due_rx.try_recv() {
                handle_action(&state, action).await;
            }
        };
        tokio::time::timeout(SHUTDOWN_TIMEOUT, drain)
            .await
            .map_err(|_| NodeError::ShutdownTimeout)?;
        info!(stats = ?state.stats.snapshot(), "node stopped");
        Ok(())
    }
}

/// The dispatch table: one match over every action the node executes.
///
/// While a sync cycle runs, chain-mutating actions are parked in the event
/// queue; sync replays them on exit.
pub(crate) async fn handle_action(state: &NodeState, action: Action) {
    let synchronizing = state.system.read().await.synchronizing();
    match action {
        Action::StartSync => {
            if synchronizing {
                debug!("sync already running");
                return;
            }
            let sync_state = state.clone();
            tokio::spawn(async move {
                sync::SyncService::new(sync_state).run().await;
            });
        }
        action if synchronizing => {
            debug!(?action, "deferring action until sync exits");
            state.events.write().await.defer(action);
        }
        Action::ForgeBlock { timestamp } => {
            if let Err(e) = forging::forge_block(state, timestamp).await {
                warn!(error = %e, "forge failed");
            }
        }
        Action::FinishRound { timestamp } => {
            if let Err(e) = state.round_service.generate_round(timestamp).await {
                warn!(error = %e, "round generation failed");
                return;
            }
            persist_rounds(state).await;
        }
        Action::PeerLastBlock { from, block } => {
            sync::on_peer_last_block(state, from, block).await;
        }
    }
}

/// Save the previous and current rounds (the settled one and its
/// successor) to the round store.
pub(crate) async fn persist_rounds(state: &NodeState) {
    let to_save: Vec<_> = {
        let rounds = state.rounds.read().await;
        rounds
            .previous()
            .into_iter()
            .chain(rounds.current())
            .cloned()
            .collect()
    };
    if to_save.is_empty() {
        return;
    }
    if let Err(e) = state.round_store.save_or_update(&to_save) {
        warn!(error = %e, "failed to persist rounds");
    }
}

pub(crate) async fn handle_inbound(state: &NodeState, message: Inbound) {
    match message {
        Inbound::Request {
            from,
            request,
            reply,
        } => {
            let response = answer_request(state, &request).await;
            debug!(peer = %from, ?request, "answered peer request");
            let _ = reply.send(response);
        }
        Inbound::Gossip { from, gossip } => match gossip {
            PeerGossip::HeadersUpdate(headers) => {
                state.peers.write().await.update_headers(&from, headers);
            }
            PeerGossip::LastBlock(block) => {
                handle_action(state, Action::PeerLastBlock { from, block }).await;
            }
        },
        Inbound::Action(action) => handle_action(state, action).await,
    }
}

async fn answer_request(state: &NodeState, request: &PeerRequest) -> PeerReply {
    match request {
        PeerRequest::CommonBlocks(data) => {
            let blocks = state.blocks.read().await;
            PeerReply::CommonBlocks(CommonBlocksReply {
                is_exist: blocks.has(&data.id, data.height),
            })
        }
        PeerRequest::Blocks(BlockLimit { height, limit }) => {
            let blocks = state.blocks.read().await;
            PeerReply::Blocks(blocks.get_many(height + 1, *limit as usize))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rota_chain::{create_genesis_block, Block};
    use rota_messages::BlockData;
    use rota_types::{BlockId, Timestamp};

    async fn seeded_node() -> RotaNode {
        let node = RotaNode::new(&NodeConfig::default()).unwrap();
        let genesis = create_genesis_block(&node.state().params);
        node.state().blocks.write().await.add(genesis).unwrap();
        node
    }

    #[tokio::test]
    async fn answers_common_blocks_from_the_repository() {
        let node = seeded_node().await;
        let genesis = node.state().blocks.read().await.last().unwrap().clone();

        let hit = answer_request(
            node.state(),
            &PeerRequest::CommonBlocks(BlockData {
                id: genesis.id,
                height: genesis.height,
            }),
        )
        .await;
        assert_eq!(
            hit,
            PeerReply::CommonBlocks(CommonBlocksReply { is_exist: true })
        );

        let miss = answer_request(
            node.state(),
            &PeerRequest::CommonBlocks(BlockData {
                id: BlockId::new([9; 32]),
                height: 1,
            }),
        )
        .await;
        assert_eq!(
            miss,
            PeerReply::CommonBlocks(CommonBlocksReply { is_exist: false })
        );
    }

    #[tokio::test]
    async fn answers_blocks_above_the_requested_height() {
        let node = seeded_node().await;
        {
            let mut blocks = node.state().blocks.write().await;
            for _ in 0..3 {
                let last = blocks.last().unwrap();
                let block = Block::assemble(
                    last.height + 1,
                    last.id,
                    last.created_at.saturating_add(10_000),
                    PublicKey::ZERO,
                    vec![],
                );
                blocks.add(block).unwrap();
            }
        }

        let reply = answer_request(
            node.state(),
            &PeerRequest::Blocks(BlockLimit {
                height: 1,
                limit: 2,
            }),
        )
        .await;
        let PeerReply::Blocks(batch) = reply else {
            panic!("expected a block batch");
        };
        assert_eq!(
            batch.iter().map(|b| b.height).collect::<Vec<_>>(),
            vec![2, 3]
        );
    }

    #[tokio::test]
    async fn actions_are_deferred_while_synchronizing() {
        let node = seeded_node().await;
        node.state().system.write().await.begin_sync(0, 0);

        handle_action(
            node.state(),
            Action::ForgeBlock {
                timestamp: Timestamp::new(10_000),
            },
        )
        .await;

        let events = node.state().events.read().await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn invalid_peer_address_in_config_is_rejected() {
        let config = NodeConfig {
            peers: vec!["not-an-address".to_string()],
            ..NodeConfig::default()
        };
        assert!(matches!(
            RotaNode::new(&config),
            Err(NodeError::Config(_))
        ));
    }

    #[tokio::test]
    async fn transactions_route_to_queue_while_locked() {
        let node = seeded_node().await;
        let tx = Transaction {
            id: rota_types::TxId::new([1; 32]),
            fee: 5,
            sender_public_key: PublicKey([1; 32]),
        };

        node.state().queue.write().await.lock();
        assert!(node.state().submit_transaction(tx.clone()).await);
        assert_eq!(node.state().queue.read().await.len(), 1);
        assert!(node.state().pool.read().await.is_empty());

        node.state().queue.write().await.unlock();
        let tx2 = Transaction {
            id: rota_types::TxId::new([2; 32]),
            ..tx
        };
        assert!(node.state().submit_transaction(tx2).await);
        assert_eq!(node.state().pool.read().await.len(), 1);
    }
}
