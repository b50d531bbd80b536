//! Persistence contracts for the rota node.
//!
//! Every storage backend implements these traits; the node and its tests
//! depend only on them. Blocks are keyed by height and rounds by their
//! start height; writes are upserts (a conflict on the key updates the
//! remaining columns), and paginated reads are ascending by key.
//!
//! [`MemoryStore`] is the in-process implementation used by the node until
//! a database engine backend exists, and by every test.

pub mod error;
pub mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

use rota_chain::Block;
use rota_rounds::Round;
use rota_types::Height;

/// Block persistence, keyed by height.
pub trait BlockStore: Send + Sync {
    /// Upsert a block at its height.
    fn save(&self, block: &Block) -> Result<(), StoreError>;

    /// Blocks from `offset` (inclusive) upward, ascending, at most `limit`.
    fn get_many(&self, offset: Height, limit: usize) -> Result<Vec<Block>, StoreError>;

    /// Delete the block at `height`. Deleting a missing height is a no-op.
    fn delete(&self, height: Height) -> Result<(), StoreError>;

    /// Total number of stored blocks.
    fn count(&self) -> Result<u64, StoreError>;
}

/// Round persistence, keyed by `start_height`.
pub trait RoundStore: Send + Sync {
    /// Upsert each round at its start height.
    fn save_or_update(&self, rounds: &[Round]) -> Result<(), StoreError>;

    /// Rounds from `offset` (inclusive) upward by start height, ascending,
    /// at most `limit`.
    fn get_many(&self, offset: Height, limit: usize) -> Result<Vec<Round>, StoreError>;

    /// Delete the round starting at `start_height`. Missing is a no-op.
    fn delete(&self, start_height: Height) -> Result<(), StoreError>;
}
