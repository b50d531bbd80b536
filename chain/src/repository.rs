//! The in-memory ordered chain.

use crate::block::Block;
use crate::compare::can_be_processed;
use crate::error::ChainError;
use rota_types::{BlockId, Height};
use std::collections::HashMap;

/// Holds the canonical chain as an ordered run of blocks.
///
/// Heights are contiguous: the block at index `i` has height
/// `base_height + i`. `add` only accepts a block that links to the current
/// tip, so the repository can never contain a gap or a duplicate height.
#[derive(Default)]
pub struct BlockRepository {
    blocks: Vec<Block>,
    by_id: HashMap<BlockId, Height>,
}

impl BlockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn count(&self) -> usize {
        self.blocks.len()
    }

    /// The chain tip.
    pub fn last(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// The first block of the chain.
    pub fn genesis(&self) -> Option<&Block> {
        self.blocks.first()
    }

    /// Height of the tip, or 0 for an empty chain.
    pub fn height(&self) -> Height {
        self.last().map(|b| b.height).unwrap_or(0)
    }

    /// Append a block. The first block is accepted as the chain base; every
    /// later one must pass [`can_be_processed`] against the tip.
    pub fn add(&mut self, block: Block) -> Result<(), ChainError> {
        if let Some(last) = self.blocks.last() {
            if block.height != last.height + 1 {
                return Err(ChainError::NotSuccessor {
                    tip: last.height,
                    got: block.height,
                });
            }
            if !can_be_processed(last, &block) {
                return Err(ChainError::BrokenLink {
                    height: block.height,
                });
            }
        }
        self.by_id.insert(block.id, block.height);
        self.blocks.push(block);
        Ok(())
    }

    /// Pop the tip (rollback support). The base block cannot be popped away
    /// into an inconsistent state; popping the only block empties the chain.
    pub fn remove_last(&mut self) -> Option<Block> {
        let block = self.blocks.pop()?;
        self.by_id.remove(&block.id);
        Some(block)
    }

    /// Whether a block with this exact id sits at this exact height.
    pub fn has(&self, id: &BlockId, height: Height) -> bool {
        self.by_id.get(id) == Some(&height)
    }

    pub fn get_by_id(&self, id: &BlockId) -> Option<&Block> {
        let height = *self.by_id.get(id)?;
        self.get_by_height(height)
    }

    pub fn get_by_height(&self, height: Height) -> Option<&Block> {
        let base = self.blocks.first()?.height;
        let idx = height.checked_sub(base)? as usize;
        self.blocks.get(idx)
    }

    /// Blocks from `offset_height` upward, ascending, at most `limit`.
    /// An offset below the base starts at the base; one beyond the tip
    /// yields nothing.
    pub fn get_many(&self, offset_height: Height, limit: usize) -> Vec<Block> {
        let Some(base) = self.blocks.first().map(|b| b.height) else {
            return Vec::new();
        };
        let start = offset_height.max(base) - base;
        self.blocks
            .iter()
            .skip(start as usize)
            .take(limit)
            .cloned()
            .collect()
    }

    /// The last `n` `(height, id)` pairs, ascending — the node's own
    /// gossip header claims.
    pub fn recent_ids(&self, n: usize) -> Vec<(Height, BlockId)> {
        let skip = self.blocks.len().saturating_sub(n);
        self.blocks
            .iter()
            .skip(skip)
            .map(|b| (b.height, b.id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rota_types::{PublicKey, Timestamp};

    fn chain_of(n: u64) -> BlockRepository {
        let mut repo = BlockRepository::new();
        let mut previous = BlockId::ZERO;
        for height in 1..=n {
            let block = Block::assemble(
                height,
                previous,
                Timestamp::new(height * 10_000),
                PublicKey([1u8; 32]),
                vec![],
            );
            previous = block.id;
            repo.add(block).unwrap();
        }
        repo
    }

    #[test]
    fn add_builds_contiguous_chain() {
        let repo = chain_of(5);
        assert_eq!(repo.count(), 5);
        assert_eq!(repo.height(), 5);
        assert_eq!(repo.genesis().unwrap().height, 1);
        assert_eq!(repo.last().unwrap().height, 5);
    }

    #[test]
    fn add_rejects_height_gap_and_duplicate() {
        let mut repo = chain_of(3);
        let tip_id = repo.last().unwrap().id;
        let gap = Block::assemble(5, tip_id, Timestamp::new(50_000), PublicKey([1; 32]), vec![]);
        assert_eq!(
            repo.add(gap),
            Err(ChainError::NotSuccessor { tip: 3, got: 5 })
        );
        let dup = Block::assemble(3, tip_id, Timestamp::new(30_000), PublicKey([1; 32]), vec![]);
        assert_eq!(
            repo.add(dup),
            Err(ChainError::NotSuccessor { tip: 3, got: 3 })
        );
    }

    #[test]
    fn add_rejects_broken_link() {
        let mut repo = chain_of(3);
        let stranger = Block::assemble(
            4,
            BlockId::new([0xee; 32]),
            Timestamp::new(40_000),
            PublicKey([1; 32]),
            vec![],
        );
        assert_eq!(
            repo.add(stranger),
            Err(ChainError::BrokenLink { height: 4 })
        );
    }

    #[test]
    fn remove_last_pops_tip_and_index() {
        let mut repo = chain_of(3);
        let tip_id = repo.last().unwrap().id;
        let popped = repo.remove_last().unwrap();
        assert_eq!(popped.height, 3);
        assert_eq!(repo.height(), 2);
        assert!(!repo.has(&tip_id, 3));
        assert!(repo.get_by_id(&tip_id).is_none());
    }

    #[test]
    fn has_requires_matching_height() {
        let repo = chain_of(3);
        let second = repo.get_by_height(2).unwrap().clone();
        assert!(repo.has(&second.id, 2));
        assert!(!repo.has(&second.id, 3));
        assert!(!repo.has(&BlockId::new([0xaa; 32]), 2));
    }

    #[test]
    fn get_many_pages_ascending() {
        let repo = chain_of(10);
        let page = repo.get_many(4, 3);
        assert_eq!(
            page.iter().map(|b| b.height).collect::<Vec<_>>(),
            vec![4, 5, 6]
        );
    }

    #[test]
    fn get_many_clamps_low_offset_to_base() {
        let repo = chain_of(3);
        let page = repo.get_many(0, 10);
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].height, 1);
    }

    #[test]
    fn get_many_beyond_tip_is_empty() {
        let repo = chain_of(3);
        assert!(repo.get_many(4, 10).is_empty());
        assert!(BlockRepository::new().get_many(1, 10).is_empty());
    }

    #[test]
    fn recent_ids_returns_tail_ascending() {
        let repo = chain_of(10);
        let recent = repo.recent_ids(3);
        assert_eq!(
            recent.iter().map(|(h, _)| *h).collect::<Vec<_>>(),
            vec![8, 9, 10]
        );
        let all = repo.recent_ids(50);
        assert_eq!(all.len(), 10);
    }
}
