//! Pending-transaction state: the live pool forging drains, and the
//! staging queue that absorbs arrivals while the pool is frozen for sync.

use rota_chain::Transaction;
use rota_types::TxId;
use std::collections::HashSet;

/// Live transactions waiting to be forged into a block.
///
/// `pop_best` is fee-descending, so a full block carries the most valuable
/// transactions available.
#[derive(Debug, Default)]
pub struct TransactionPool {
    txs: Vec<Transaction>,
    ids: HashSet<TxId>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    pub fn contains(&self, id: &TxId) -> bool {
        self.ids.contains(id)
    }

    /// Insert a transaction. A duplicate id is dropped.
    pub fn insert(&mut self, tx: Transaction) -> bool {
        if !self.ids.insert(tx.id) {
            return false;
        }
        // Keep ascending by fee so the best candidate pops from the back.
        let at = self.txs.partition_point(|t| t.fee <= tx.fee);
        self.txs.insert(at, tx);
        true
    }

    /// Remove and return the highest-fee transaction.
    pub fn pop_best(&mut self) -> Option<Transaction> {
        let tx = self.txs.pop()?;
        self.ids.remove(&tx.id);
        Some(tx)
    }

    /// Up to `limit` highest-fee transactions, removed from the pool.
    pub fn take(&mut self, limit: usize) -> Vec<Transaction> {
        let mut taken = Vec::with_capacity(limit.min(self.txs.len()));
        while taken.len() < limit {
            match self.pop_best() {
                Some(tx) => taken.push(tx),
                None => break,
            }
        }
        taken
    }

    /// Remove every transaction, unordered.
    pub fn drain(&mut self) -> Vec<Transaction> {
        self.ids.clear();
        std::mem::take(&mut self.txs)
    }
}

/// Staging area for transactions arriving while the pool is frozen.
///
/// The lock is a cooperative flag: sync sets it before draining the pool,
/// and the forge path and pool writers check it rather than contending on
/// a mutex.
#[derive(Debug, Default)]
pub struct TransactionQueue {
    queued: Vec<Transaction>,
    locked: bool,
}

impl TransactionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    pub fn push(&mut self, tx: Transaction) {
        self.queued.push(tx);
    }

    /// Move every queued transaction back into `pool`, preserving arrival
    /// order (the pool re-sorts by fee).
    pub fn drain_into(&mut self, pool: &mut TransactionPool) {
        for tx in self.queued.drain(..) {
            pool.insert(tx);
        }
    }
}
