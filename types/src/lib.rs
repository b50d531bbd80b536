//! Fundamental types for the rota chain.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: block and transaction ids, chain heights, forging slots,
//! chain-relative timestamps, key material, and the consensus parameters.

pub mod id;
pub mod keys;
pub mod params;
pub mod time;

pub use id::{BlockId, Height, ParseIdError, TxId};
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use params::ChainParams;
pub use time::{Slot, Timestamp};
