//! The round lifecycle service.
//!
//! One `RoundService` per node drives the round state machine: settle the
//! finished round's fees, derive the next forge order from the chain tip,
//! hand out slots, and schedule the node's own forge task plus the task
//! that will finish the round. Everything here is sequenced inside single
//! async calls; round N is always fully settled before round N+1's slots
//! are computed.

use crate::ordering::{assign_slots, generate_hash_list, sort_hash_list};
use crate::repository::RoundRepository;
use crate::round::Round;
use crate::slots::{wall_now_ms, SlotClock};
use rota_chain::{AccountRepository, BlockRepository, ChainError, DelegateRepository};
use rota_types::{ChainParams, PublicKey, Slot, Timestamp};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum RoundError {
    /// Round generation needs a chain tip to anchor the forge order.
    #[error("cannot generate a round without a chain tip")]
    EmptyChain,

    /// The delegate registry produced an empty active set.
    #[error("no active delegates to schedule")]
    NoDelegates,

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Seam between the round engine and the node's task scheduler.
///
/// There is at most one pending forge task and one pending round-finish
/// task; scheduling again replaces the pending entry. `timestamp` is the
/// chain time the fired task should act at (the slot's grid time for a
/// forge, the first slot past the round for a finish).
pub trait RoundScheduler: Send + Sync {
    fn schedule_forge(&self, delay_ms: u64, timestamp: Timestamp);
    fn cancel_forge(&self);
    fn schedule_round_finish(&self, delay_ms: u64, timestamp: Timestamp);
    fn cancel_round_finish(&self);
}

/// Fee settlement material for one round: the fees collected and the
/// delegates who forged them, in block order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoundSum {
    pub round_fees: u64,
    pub round_delegates: Vec<PublicKey>,
}

impl RoundSum {
    /// Each forger's share: the fees split evenly. The division remainder
    /// is burned, never minted back.
    pub fn fee_share(&self) -> u64 {
        if self.round_delegates.is_empty() {
            0
        } else {
            self.round_fees / self.round_delegates.len() as u64
        }
    }
}

type WallClock = Arc<dyn Fn() -> u64 + Send + Sync>;

pub struct RoundService {
    forging_key: PublicKey,
    clock: SlotClock,
    params: ChainParams,
    rounds: Arc<RwLock<RoundRepository>>,
    blocks: Arc<RwLock<BlockRepository>>,
    delegates: Arc<RwLock<DelegateRepository>>,
    accounts: Arc<RwLock<AccountRepository>>,
    scheduler: Arc<dyn RoundScheduler>,
    wall_now: WallClock,
}

impl RoundService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        forging_key: PublicKey,
        params: ChainParams,
        rounds: Arc<RwLock<RoundRepository>>,
        blocks: Arc<RwLock<BlockRepository>>,
        delegates: Arc<RwLock<DelegateRepository>>,
        accounts: Arc<RwLock<AccountRepository>>,
        scheduler: Arc<dyn RoundScheduler>,
    ) -> Self {
        Self {
            forging_key,
            clock: SlotClock::new(&params),
            params,
            rounds,
            blocks,
            delegates,
            accounts,
            scheduler,
            wall_now: Arc::new(wall_now_ms),
        }
    }

    /// Replace the wall-clock source. Tests pin this to a fixed instant to
    /// exercise the forge-lateness branches.
    pub fn with_wall_clock(mut self, wall_now: WallClock) -> Self {
        self.wall_now = wall_now;
        self
    }

    pub fn forging_key(&self) -> PublicKey {
        self.forging_key
    }

    pub fn clock(&self) -> SlotClock {
        self.clock
    }

    /// Generate the round that starts one past the current chain tip,
    /// anchored at `timestamp` (its slot becomes the round's first slot).
    ///
    /// The current round, if any, is settled first and demoted to previous;
    /// then the node's forge task and the round-finish task are scheduled.
    pub async fn generate_round(&self, timestamp: Timestamp) -> Result<(), RoundError> {
        self.settle_current().await?;

        let (last_id, last_height) = {
            let blocks = self.blocks.read().await;
            let last = blocks.last().ok_or(RoundError::EmptyChain)?;
            (last.id, last.height)
        };

        let active: Vec<PublicKey> = {
            let delegates = self.delegates.read().await;
            delegates.active().iter().map(|d| d.public_key).collect()
        };
        if active.is_empty() {
            return Err(RoundError::NoDelegates);
        }

        let mut list = generate_hash_list(&active, &last_id);
        sort_hash_list(&mut list);
        let first_slot = self.clock.slot_number(timestamp);
        let round = Round::new(last_height + 1, assign_slots(&list, first_slot));

        info!(
            start_height = round.start_height,
            first_slot = %first_slot,
            delegates = round.slot_count(),
            "generated round"
        );

        self.schedule_tasks(&round);
        self.rounds.write().await.set_current(round);
        Ok(())
    }

    /// The slot assigned to this node in the current round, if any.
    pub async fn my_turn(&self) -> Option<Slot> {
        self.rounds
            .read()
            .await
            .current()
            .and_then(|round| round.slot_of(&self.forging_key))
    }

    /// Sum the fees of the blocks forged in `round` and collect their
    /// generators. A round with fewer blocks than slots (missed forges, or
    /// cut short by a fork) settles as a zero sum rather than failing.
    pub async fn sum_round(&self, round: &Round) -> RoundSum {
        let count = round.slot_count();
        let blocks = self.blocks.read().await;
        let span = blocks.get_many(round.start_height, count);
        if span.len() < count {
            return RoundSum::default();
        }
        RoundSum {
            round_fees: span.iter().map(|b| b.fee).sum(),
            round_delegates: span.iter().map(|b| b.generator_public_key).collect(),
        }
    }

    /// Credit each forging delegate its fee share.
    pub async fn apply_unconfirmed(&self, sum: &RoundSum) {
        let share = sum.fee_share();
        if share == 0 {
            return;
        }
        let mut accounts = self.accounts.write().await;
        for delegate in &sum.round_delegates {
            accounts.credit(delegate, share);
        }
    }

    /// Debit each forging delegate the fee share credited by
    /// [`apply_unconfirmed`](Self::apply_unconfirmed) for the same sum.
    pub async fn undo_unconfirmed(&self, sum: &RoundSum) -> Result<(), RoundError> {
        let share = sum.fee_share();
        if share == 0 {
            return Ok(());
        }
        let mut accounts = self.accounts.write().await;
        for delegate in &sum.round_delegates {
            accounts.debit(delegate, share)?;
        }
        Ok(())
    }

    /// Cancel the scheduled tasks and revert the last settlement: the
    /// unsettled current round is discarded, the previous round's fee
    /// distribution is undone, and it becomes current again with its
    /// `end_height` cleared.
    ///
    /// Returns the discarded round so the caller can erase it from the
    /// round store.
    pub async fn roll_back(&self) -> Result<Option<Round>, RoundError> {
        self.scheduler.cancel_forge();
        self.scheduler.cancel_round_finish();

        let previous = { self.rounds.read().await.previous().cloned() };
        if let Some(previous) = &previous {
            let sum = self.sum_round(previous).await;
            self.undo_unconfirmed(&sum).await?;
            debug!(
                start_height = previous.start_height,
                undone_fees = sum.round_fees,
                "reverted round settlement"
            );
        }

        let mut rounds = self.rounds.write().await;
        let discarded = rounds.promote_previous();
        if let Some(current) = rounds.current_mut() {
            current.end_height = None;
        }
        Ok(discarded)
    }

    /// Reconcile round state with the clock after startup or sync.
    ///
    /// No current round generates one at `timestamp`; a current round whose
    /// last slot already passed is superseded the same way; a round still
    /// inside its window only gets its two tasks rescheduled.
    pub async fn restore(&self, timestamp: Timestamp) -> Result<(), RoundError> {
        let current = { self.rounds.read().await.current().cloned() };
        let Some(round) = current else {
            return self.generate_round(timestamp).await;
        };
        let now_slot = self
            .clock
            .slot_number(self.clock.chain_now((self.wall_now)()));
        match round.last_slot() {
            Some(last_slot) if last_slot >= now_slot => {
                self.schedule_tasks(&round);
                Ok(())
            }
            _ => self.generate_round(timestamp).await,
        }
    }

    /// Settle the current round (fees to forgers, `end_height` recorded)
    /// and demote it to previous.
    async fn settle_current(&self) -> Result<(), RoundError> {
        let current = { self.rounds.read().await.current().cloned() };
        let Some(current) = current else {
            return Ok(());
        };
        let sum = self.sum_round(&current).await;
        self.apply_unconfirmed(&sum).await;
        let tip_height = self.blocks.read().await.height();

        let mut rounds = self.rounds.write().await;
        if let Some(round) = rounds.current_mut() {
            round.end_height = Some(tip_height);
        }
        rounds.demote_current();
        Ok(())
    }

    /// (Re)schedule the forge and round-finish tasks for `round`.
    ///
    /// A node whose slot opened less than `forge_lateness_ms` ago still
    /// forges immediately; any later and the slot is skipped so the node
    /// never forges out of turn.
    fn schedule_tasks(&self, round: &Round) {
        let now = (self.wall_now)();

        match round.slot_of(&self.forging_key) {
            Some(my_slot) => {
                let opens_at = self.clock.slot_real_time(my_slot);
                let timestamp = self.clock.slot_time(my_slot);
                if opens_at >= now {
                    self.scheduler.schedule_forge(opens_at - now, timestamp);
                } else if now - opens_at <= self.params.forge_lateness_ms {
                    self.scheduler.schedule_forge(0, timestamp);
                } else {
                    debug!(
                        slot = %my_slot,
                        late_ms = now - opens_at,
                        "own slot already passed, skipping forge"
                    );
                    self.scheduler.cancel_forge();
                }
            }
            None => self.scheduler.cancel_forge(),
        }

        if let Some(last_slot) = round.last_slot() {
            let finish_slot = last_slot.next();
            let finish_at = self.clock.slot_real_time(finish_slot);
            self.scheduler
                .schedule_round_finish(finish_at.saturating_sub(now), self.clock.slot_time(finish_slot));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rota_chain::{Block, Delegate};
    use rota_types::BlockId;
    use std::sync::Mutex;

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Scheduled {
        Forge { delay_ms: u64 },
        CancelForge,
        Finish { delay_ms: u64 },
        CancelFinish,
    }

    #[derive(Default)]
    struct RecordingScheduler {
        events: Mutex<Vec<Scheduled>>,
    }

    impl RecordingScheduler {
        fn events(&self) -> Vec<Scheduled> {
            self.events.lock().unwrap().clone()
        }
    }

    impl RoundScheduler for RecordingScheduler {
        fn schedule_forge(&self, delay_ms: u64, _timestamp: Timestamp) {
            self.events
                .lock()
                .unwrap()
                .push(Scheduled::Forge { delay_ms });
        }
        fn cancel_forge(&self) {
            self.events.lock().unwrap().push(Scheduled::CancelForge);
        }
        fn schedule_round_finish(&self, delay_ms: u64, _timestamp: Timestamp) {
            self.events
                .lock()
                .unwrap()
                .push(Scheduled::Finish { delay_ms });
        }
        fn cancel_round_finish(&self) {
            self.events.lock().unwrap().push(Scheduled::CancelFinish);
        }
    }

    fn test_params() -> ChainParams {
        ChainParams {
            active_delegates: 3,
            ..ChainParams::mainnet()
        }
    }

    struct Fixture {
        service: RoundService,
        scheduler: Arc<RecordingScheduler>,
        rounds: Arc<RwLock<RoundRepository>>,
        blocks: Arc<RwLock<BlockRepository>>,
        accounts: Arc<RwLock<AccountRepository>>,
        clock: SlotClock,
    }

    /// A fixture with `delegate_count` active delegates (keys `[1;32]`,
    /// `[2;32]`, …; the node forges as `[1;32]`), a genesis block, and the
    /// wall clock pinned to `wall_now`.
    async fn fixture(delegate_count: u8, wall_now: u64) -> Fixture {
        let params = test_params();
        let clock = SlotClock::new(&params);

        let mut delegate_repo = DelegateRepository::new(params.active_delegates);
        for n in 1..=delegate_count {
            delegate_repo.register(Delegate {
                public_key: PublicKey([n; 32]),
                username: format!("delegate-{n}"),
                votes: 100,
            });
        }

        let mut block_repo = BlockRepository::new();
        block_repo
            .add(Block::assemble(
                1,
                BlockId::ZERO,
                Timestamp::EPOCH,
                PublicKey::ZERO,
                vec![],
            ))
            .unwrap();

        let rounds = Arc::new(RwLock::new(RoundRepository::new()));
        let blocks = Arc::new(RwLock::new(block_repo));
        let delegates = Arc::new(RwLock::new(delegate_repo));
        let accounts = Arc::new(RwLock::new(AccountRepository::new()));
        let scheduler = Arc::new(RecordingScheduler::default());

        let service = RoundService::new(
            PublicKey([1; 32]),
            params,
            rounds.clone(),
            blocks.clone(),
            delegates,
            accounts.clone(),
            scheduler.clone(),
        )
        .with_wall_clock(Arc::new(move || wall_now));

        Fixture {
            service,
            scheduler,
            rounds,
            blocks,
            accounts,
            clock,
        }
    }

    /// Extend the fixture chain with a block per `(generator, fee)` pair.
    async fn forge_blocks(fx: &Fixture, forgers: &[(u8, u64)]) {
        let mut blocks = fx.blocks.write().await;
        for &(generator, fee) in forgers {
            let last = blocks.last().unwrap();
            let mut block = Block::assemble(
                last.height + 1,
                last.id,
                last.created_at.saturating_add(10_000),
                PublicKey([generator; 32]),
                vec![],
            );
            block.fee = fee;
            blocks.add(block).unwrap();
        }
    }

    #[tokio::test]
    async fn generate_round_fails_on_empty_chain() {
        let fx = fixture(3, 0).await;
        fx.blocks.write().await.remove_last();
        let err = fx
            .service
            .generate_round(Timestamp::new(10_000))
            .await
            .unwrap_err();
        assert!(matches!(err, RoundError::EmptyChain));
    }

    #[tokio::test]
    async fn generate_round_fails_without_delegates() {
        let fx = fixture(0, 0).await;
        let err = fx
            .service
            .generate_round(Timestamp::new(10_000))
            .await
            .unwrap_err();
        assert!(matches!(err, RoundError::NoDelegates));
    }

    #[tokio::test]
    async fn generate_round_assigns_contiguous_slots_from_anchor() {
        let fx = fixture(3, 0).await;
        fx.service
            .generate_round(Timestamp::new(40_000))
            .await
            .unwrap();

        let rounds = fx.rounds.read().await;
        let round = rounds.current().unwrap();
        assert_eq!(round.start_height, 2);
        assert_eq!(round.slot_count(), 3);
        assert_eq!(round.first_slot(), Some(Slot::new(4)));
        assert_eq!(round.last_slot(), Some(Slot::new(6)));
        assert_eq!(round.end_height, None);
    }

    #[tokio::test]
    async fn generate_settles_and_demotes_current_round() {
        let fx = fixture(3, 0).await;
        fx.service
            .generate_round(Timestamp::new(10_000))
            .await
            .unwrap();
        // All three delegates forge, 10 fee each.
        forge_blocks(&fx, &[(1, 10), (2, 10), (3, 10)]).await;

        fx.service
            .generate_round(Timestamp::new(40_000))
            .await
            .unwrap();

        let rounds = fx.rounds.read().await;
        assert_eq!(rounds.previous().unwrap().end_height, Some(4));
        assert_eq!(rounds.current().unwrap().start_height, 5);

        let accounts = fx.accounts.read().await;
        for n in 1..=3u8 {
            assert_eq!(accounts.balance(&PublicKey([n; 32])), 10);
        }
    }

    #[tokio::test]
    async fn fee_remainder_is_burned() {
        let fx = fixture(3, 0).await;
        fx.service
            .generate_round(Timestamp::new(10_000))
            .await
            .unwrap();
        forge_blocks(&fx, &[(1, 4), (2, 3), (3, 3)]).await;
        let round = fx.rounds.read().await.current().unwrap().clone();

        let sum = fx.service.sum_round(&round).await;
        assert_eq!(sum.round_fees, 10);
        assert_eq!(sum.fee_share(), 3); // 10 / 3, remainder 1 burned

        fx.service.apply_unconfirmed(&sum).await;
        let accounts = fx.accounts.read().await;
        let total: u64 = (1..=3u8)
            .map(|n| accounts.balance(&PublicKey([n; 32])))
            .sum();
        assert_eq!(total, 9);
    }

    #[tokio::test]
    async fn apply_then_undo_is_a_no_op() {
        let fx = fixture(3, 0).await;
        let sum = RoundSum {
            round_fees: 100,
            round_delegates: vec![PublicKey([1; 32]), PublicKey([2; 32]), PublicKey([3; 32])],
        };
        fx.service.apply_unconfirmed(&sum).await;
        fx.service.undo_unconfirmed(&sum).await.unwrap();
        let accounts = fx.accounts.read().await;
        for n in 1..=3u8 {
            assert_eq!(accounts.balance(&PublicKey([n; 32])), 0);
        }
    }

    #[tokio::test]
    async fn short_round_sums_to_zero() {
        let fx = fixture(3, 0).await;
        fx.service
            .generate_round(Timestamp::new(10_000))
            .await
            .unwrap();
        // Only one of three slots was forged.
        forge_blocks(&fx, &[(2, 50)]).await;
        let round = fx.rounds.read().await.current().unwrap().clone();

        let sum = fx.service.sum_round(&round).await;
        assert_eq!(sum, RoundSum::default());
    }

    #[tokio::test]
    async fn my_turn_reports_assigned_slot_only_for_active_key() {
        let fx = fixture(3, 0).await;
        assert_eq!(fx.service.my_turn().await, None);
        fx.service
            .generate_round(Timestamp::new(10_000))
            .await
            .unwrap();
        let my_slot = fx.service.my_turn().await.unwrap();
        let round = fx.rounds.read().await.current().unwrap().clone();
        assert_eq!(round.slot_of(&PublicKey([1; 32])), Some(my_slot));
    }

    // Forge-lateness boundaries. With a single delegate the node's slot is
    // always the round's first slot, so the anchor timestamp pins the forge
    // fire time exactly.

    async fn forge_events_with_skew(skew_ms: i64) -> Vec<Scheduled> {
        let params = test_params();
        let clock = SlotClock::new(&params);
        let anchor = Timestamp::new(100_000); // slot 10, on-grid
        let opens_at = clock.slot_real_time(clock.slot_number(anchor));
        let wall_now = (opens_at as i64 + skew_ms) as u64;
        let fx = fixture(1, wall_now).await;
        fx.service.generate_round(anchor).await.unwrap();
        fx.scheduler.events()
    }

    #[tokio::test]
    async fn forge_in_the_future_is_scheduled_with_delay() {
        let events = forge_events_with_skew(-2_000).await;
        assert!(events.contains(&Scheduled::Forge { delay_ms: 2_000 }));
    }

    #[tokio::test]
    async fn forge_300ms_late_fires_immediately() {
        let events = forge_events_with_skew(300).await;
        assert!(events.contains(&Scheduled::Forge { delay_ms: 0 }));
    }

    #[tokio::test]
    async fn forge_600ms_late_is_skipped() {
        let events = forge_events_with_skew(600).await;
        assert!(events.contains(&Scheduled::CancelForge));
        assert!(!events
            .iter()
            .any(|e| matches!(e, Scheduled::Forge { .. })));
    }

    #[tokio::test]
    async fn inactive_forger_cancels_instead_of_scheduling() {
        // Node forges as [1;32] but only [2;32]..[4;32] are registered.
        let params = test_params();
        let fx = fixture(0, 0).await;
        let mut delegates = DelegateRepository::new(params.active_delegates);
        for n in 2..=4u8 {
            delegates.register(Delegate {
                public_key: PublicKey([n; 32]),
                username: format!("delegate-{n}"),
                votes: 100,
            });
        }
        let service = RoundService::new(
            PublicKey([1; 32]),
            params,
            fx.rounds.clone(),
            fx.blocks.clone(),
            Arc::new(RwLock::new(delegates)),
            fx.accounts.clone(),
            fx.scheduler.clone(),
        )
        .with_wall_clock(Arc::new(|| 0));
        service
            .generate_round(Timestamp::new(10_000))
            .await
            .unwrap();

        let events = fx.scheduler.events();
        assert!(events.contains(&Scheduled::CancelForge));
        assert!(!events.iter().any(|e| matches!(e, Scheduled::Forge { .. })));
    }

    #[tokio::test]
    async fn round_finish_scheduled_one_slot_past_the_round() {
        let params = test_params();
        let clock = SlotClock::new(&params);
        // Wall clock at the round's anchor slot opening.
        let anchor = Timestamp::new(100_000);
        let wall_now = clock.slot_real_time(clock.slot_number(anchor));
        let fx = fixture(3, wall_now).await;
        fx.service.generate_round(anchor).await.unwrap();

        // Last slot is anchor + 2; finish fires one full slot after it opens.
        let expected = 3 * fx.clock.interval_ms();
        assert!(fx
            .scheduler
            .events()
            .contains(&Scheduled::Finish {
                delay_ms: expected
            }));
    }

    #[tokio::test]
    async fn roll_back_undoes_settlement_and_promotes_previous() {
        let fx = fixture(3, 0).await;
        fx.service
            .generate_round(Timestamp::new(10_000))
            .await
            .unwrap();
        forge_blocks(&fx, &[(1, 10), (2, 10), (3, 10)]).await;
        fx.service
            .generate_round(Timestamp::new(40_000))
            .await
            .unwrap();
        // Settlement credited 10 to each delegate.
        assert_eq!(fx.accounts.read().await.balance(&PublicKey([2; 32])), 10);

        let discarded = fx.service.roll_back().await.unwrap().unwrap();
        assert_eq!(discarded.start_height, 5);

        let rounds = fx.rounds.read().await;
        let current = rounds.current().unwrap();
        assert_eq!(current.start_height, 2);
        assert_eq!(current.end_height, None);
        assert!(rounds.previous().is_none());
        drop(rounds);

        let accounts = fx.accounts.read().await;
        for n in 1..=3u8 {
            assert_eq!(accounts.balance(&PublicKey([n; 32])), 0);
        }

        let events = fx.scheduler.events();
        assert!(events.contains(&Scheduled::CancelForge));
        assert!(events.contains(&Scheduled::CancelFinish));
    }

    #[tokio::test]
    async fn restore_generates_when_no_round_exists() {
        let fx = fixture(3, 0).await;
        fx.service.restore(Timestamp::new(10_000)).await.unwrap();
        assert!(fx.rounds.read().await.current().is_some());
    }

    #[tokio::test]
    async fn restore_regenerates_a_stale_round() {
        let params = test_params();
        let clock = SlotClock::new(&params);
        // Wall clock well past the first round's window.
        let wall_now = clock.slot_real_time(Slot::new(100));
        let fx = fixture(3, wall_now).await;
        fx.service
            .generate_round(Timestamp::new(10_000))
            .await
            .unwrap();

        let fresh_anchor = Timestamp::new(1_000_000); // slot 100
        fx.service.restore(fresh_anchor).await.unwrap();

        let rounds = fx.rounds.read().await;
        assert_eq!(
            rounds.current().unwrap().first_slot(),
            Some(Slot::new(100))
        );
        // The stale round was settled and demoted, not dropped.
        assert!(rounds.previous().is_some());
    }

    #[tokio::test]
    async fn restore_inside_the_window_only_reschedules() {
        let params = test_params();
        let clock = SlotClock::new(&params);
        let anchor = Timestamp::new(100_000);
        let wall_now = clock.slot_real_time(clock.slot_number(anchor));
        let fx = fixture(3, wall_now).await;
        fx.service.generate_round(anchor).await.unwrap();
        let before = fx.rounds.read().await.current().unwrap().clone();
        let events_before = fx.scheduler.events().len();

        fx.service.restore(anchor).await.unwrap();

        let after = fx.rounds.read().await.current().unwrap().clone();
        assert_eq!(before, after);
        // Both tasks were scheduled again.
        assert!(fx.scheduler.events().len() > events_before);
    }
}
