//! Chain state for the rota node.
//!
//! Blocks and the in-memory chain they form, the deterministic genesis
//! block, block relation predicates used by sync and forging, and the
//! account/delegate registries the round engine settles fees against.

pub mod accounts;
pub mod block;
pub mod compare;
pub mod delegates;
pub mod error;
pub mod genesis;
pub mod repository;

pub use accounts::{Account, AccountRepository};
pub use block::{Block, Transaction};
pub use delegates::{Delegate, DelegateRepository};
pub use error::ChainError;
pub use genesis::create_genesis_block;
pub use repository::BlockRepository;
