//! In-memory store backend.

use crate::{BlockStore, RoundStore, StoreError};
use rota_chain::Block;
use rota_rounds::Round;
use rota_types::Height;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// BTreeMap-backed implementation of both store traits.
///
/// Interior mutability keeps the trait methods `&self`, matching what a
/// database-backed implementation would expose.
#[derive(Default)]
pub struct MemoryStore {
    blocks: Mutex<BTreeMap<Height, Block>>,
    rounds: Mutex<BTreeMap<Height, Round>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockStore for MemoryStore {
    fn save(&self, block: &Block) -> Result<(), StoreError> {
        let mut blocks = self.blocks.lock().expect("block store poisoned");
        blocks.insert(block.height, block.clone());
        Ok(())
    }

    fn get_many(&self, offset: Height, limit: usize) -> Result<Vec<Block>, StoreError> {
        let blocks = self.blocks.lock().expect("block store poisoned");
        Ok(blocks.range(offset..).take(limit).map(|(_, b)| b.clone()).collect())
    }

    fn delete(&self, height: Height) -> Result<(), StoreError> {
        let mut blocks = self.blocks.lock().expect("block store poisoned");
        blocks.remove(&height);
        Ok(())
    }

    fn count(&self) -> Result<u64, StoreError> {
        let blocks = self.blocks.lock().expect("block store poisoned");
        Ok(blocks.len() as u64)
    }
}

impl RoundStore for MemoryStore {
    fn save_or_update(&self, rounds: &[Round]) -> Result<(), StoreError> {
        let mut stored = self.rounds.lock().expect("round store poisoned");
        for round in rounds {
            stored.insert(round.start_height, round.clone());
        }
        Ok(())
    }

    fn get_many(&self, offset: Height, limit: usize) -> Result<Vec<Round>, StoreError> {
        let rounds = self.rounds.lock().expect("round store poisoned");
        Ok(rounds.range(offset..).take(limit).map(|(_, r)| r.clone()).collect())
    }

    fn delete(&self, start_height: Height) -> Result<(), StoreError> {
        let mut rounds = self.rounds.lock().expect("round store poisoned");
        rounds.remove(&start_height);
        Ok(())
    }
}
