//! Block relation predicates.
//!
//! Every predicate takes the local chain tip first and the incoming block
//! second; sync and forging decide from these whether a block extends the
//! chain, duplicates it, or is evidence the local tip is wrong.

use crate::block::Block;

/// The incoming block sits below the tip.
pub fn is_less_height(last: &Block, block: &Block) -> bool {
    block.height < last.height
}

/// The incoming block sits exactly one above the tip.
pub fn is_next(last: &Block, block: &Block) -> bool {
    block.height == last.height + 1
}

/// The incoming block sits above the tip (by any distance).
pub fn is_greater_height(last: &Block, block: &Block) -> bool {
    block.height > last.height
}

pub fn is_equal_id(last: &Block, block: &Block) -> bool {
    block.id == last.id
}

pub fn is_equal_height(last: &Block, block: &Block) -> bool {
    block.height == last.height
}

pub fn is_equal_previous(last: &Block, block: &Block) -> bool {
    block.previous_block_id == last.previous_block_id
}

/// A successor block that does not link to our tip: the network built on a
/// different block at our height, so our last block is the suspect one.
pub fn is_last_block_invalid(last: &Block, block: &Block) -> bool {
    is_next(last, block) && block.previous_block_id != last.id
}

/// The block both follows the tip's height and links to its id; only such
/// blocks may be appended to the chain.
pub fn can_be_processed(last: &Block, block: &Block) -> bool {
    is_next(last, block) && block.previous_block_id == last.id
}

#[cfg(test)]
mod tests {
    use super::*;
    use rota_types::{BlockId, PublicKey, Timestamp};

    fn block(id: u8, height: u64, previous: u8) -> Block {
        let mut b = Block::assemble(
            height,
            BlockId::new([previous; 32]),
            Timestamp::new(height * 10_000),
            PublicKey([1u8; 32]),
            vec![],
        );
        b.id = BlockId::new([id; 32]);
        b
    }

    // The fixture chain: 9 <- 10 (tip), with variants around it.
    fn tip() -> Block {
        block(10, 10, 9)
    }

    #[test]
    fn less_height_only_below_tip() {
        assert!(is_less_height(&tip(), &block(9, 9, 8)));
        assert!(!is_less_height(&tip(), &tip()));
        assert!(!is_less_height(&tip(), &block(11, 11, 10)));
    }

    #[test]
    fn next_is_exactly_one_above() {
        assert!(is_next(&tip(), &block(11, 11, 10)));
        assert!(!is_next(&tip(), &tip()));
        assert!(!is_next(&tip(), &block(9, 9, 8)));
        assert!(!is_next(&tip(), &block(20, 20, 19)));
    }

    #[test]
    fn greater_height_any_distance_above() {
        assert!(!is_greater_height(&tip(), &tip()));
        assert!(is_greater_height(&tip(), &block(11, 11, 10)));
        assert!(is_greater_height(&tip(), &block(20, 20, 19)));
        assert!(!is_greater_height(&tip(), &block(9, 9, 8)));
    }

    #[test]
    fn equal_id_matches_only_itself() {
        assert!(is_equal_id(&tip(), &tip()));
        assert!(!is_equal_id(&tip(), &block(11, 11, 10)));
        assert!(!is_equal_id(&tip(), &block(9, 9, 8)));
    }

    #[test]
    fn equal_height_ignores_id() {
        // A competing block at the tip's height, built on a different parent.
        let rival = block(10, 10, 7);
        assert!(is_equal_height(&tip(), &tip()));
        assert!(is_equal_height(&tip(), &rival));
        assert!(!is_equal_height(&tip(), &block(11, 11, 10)));
    }

    #[test]
    fn equal_previous_compares_parents() {
        let rival_same_parent = block(12, 10, 9);
        let rival_other_parent = block(12, 10, 7);
        assert!(is_equal_previous(&tip(), &tip()));
        assert!(is_equal_previous(&tip(), &rival_same_parent));
        assert!(!is_equal_previous(&tip(), &rival_other_parent));
    }

    #[test]
    fn last_block_invalid_when_successor_skips_our_tip() {
        let good_next = block(11, 11, 10);
        let forked_next = block(11, 11, 13);
        assert!(!is_last_block_invalid(&tip(), &good_next));
        assert!(is_last_block_invalid(&tip(), &forked_next));
    }

    #[test]
    fn can_be_processed_requires_height_and_link() {
        assert!(can_be_processed(&tip(), &block(11, 11, 10)));
        assert!(!can_be_processed(&tip(), &tip()));
        assert!(!can_be_processed(&tip(), &block(10, 10, 7)));
        assert!(!can_be_processed(&tip(), &block(9, 9, 8)));
        assert!(!can_be_processed(&tip(), &block(11, 11, 13)));
    }
}
