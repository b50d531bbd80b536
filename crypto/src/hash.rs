//! SHA-256 hashing for ids and the MD5 forge-ordering hash.

use md5::Md5;
use rota_types::{BlockId, PublicKey, TxId};
use sha2::{Digest, Sha256};

/// Compute a SHA-256 hash of arbitrary data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn sha256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Hash a block's canonical header bytes to produce its `BlockId`.
pub fn block_id_from_bytes(header_bytes: &[u8]) -> BlockId {
    BlockId::new(sha256(header_bytes))
}

/// Hash a transaction's canonical bytes to produce its `TxId`.
pub fn tx_id_from_bytes(tx_bytes: &[u8]) -> TxId {
    TxId::new(sha256(tx_bytes))
}

/// The forge-ordering hash: `md5(hex(public_key) ++ hex(block_id))`.
///
/// Every node derives the identical delegate ordering for a round from the
/// active delegate set and the id of the block preceding the round, by
/// sorting these 16-byte digests. MD5 is retained for cross-node agreement
/// on ordering; it carries no security weight here.
pub fn forge_order_hash(public_key: &PublicKey, block_id: &BlockId) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(public_key.to_hex().as_bytes());
    hasher.update(block_id.to_hex().as_bytes());
    let result = hasher.finalize();
    let mut output = [0u8; 16];
    output.copy_from_slice(&result);
    output
}
