//! Genesis block creation — the first block on each network.
//!
//! Nodes never receive the genesis block from a peer; each one constructs
//! it locally and must arrive at the identical id.

use crate::block::Block;
use rota_crypto::sha256_multi;
use rota_types::{BlockId, ChainParams, Height, PublicKey, Timestamp};

/// The height the genesis block occupies.
pub const GENESIS_HEIGHT: Height = 1;

/// Create the deterministic genesis block for a parameter set.
///
/// Genesis has no predecessor (`previous_block_id` zero), carries no
/// transactions, and is timestamped at the chain epoch. Its "generator" is
/// the SHA-256 fingerprint of the chain parameters, so networks configured
/// differently get distinct genesis ids and no real delegate can claim the
/// block.
pub fn create_genesis_block(params: &ChainParams) -> Block {
    Block::assemble(
        GENESIS_HEIGHT,
        BlockId::ZERO,
        Timestamp::EPOCH,
        PublicKey(params_fingerprint(params)),
        Vec::new(),
    )
}

fn params_fingerprint(params: &ChainParams) -> [u8; 32] {
    sha256_multi(&[
        &params.slot_interval_ms.to_le_bytes(),
        &params.epoch_ms.to_le_bytes(),
        &(params.active_delegates as u64).to_le_bytes(),
    ])
}
