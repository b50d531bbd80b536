//! Chain-state errors.

use rota_types::{Height, PublicKey};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    /// The chain has no blocks yet; the operation needs a tip.
    #[error("chain is empty")]
    EmptyChain,

    /// A block whose height does not continue the chain.
    #[error("block height {got} does not succeed chain tip at {tip}")]
    NotSuccessor { tip: Height, got: Height },

    /// A successor-height block that does not link to the tip's id.
    #[error("block at height {height} does not link to the chain tip")]
    BrokenLink { height: Height },

    /// Account debit below zero.
    #[error("balance of {account} is {available}, cannot debit {needed}")]
    InsufficientBalance {
        account: PublicKey,
        available: u64,
        needed: u64,
    },
}
