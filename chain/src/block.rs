//! The block model.

use rota_crypto::{block_id_from_bytes, sign_message, verify_signature};
use rota_types::{BlockId, Height, KeyPair, PublicKey, Signature, Timestamp, TxId};
use serde::{Deserialize, Serialize};

/// The slice of a transaction the round engine needs: identity, fee, and
/// the sender it debits. Asset semantics live outside this crate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TxId,
    pub fee: u64,
    pub sender_public_key: PublicKey,
}

/// A block on the rota chain.
///
/// `id` is the SHA-256 of the canonical header bytes, which exclude the
/// signature; the signature covers those same bytes, so the id is stable
/// before and after signing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub height: Height,
    pub previous_block_id: BlockId,
    /// Slot-aligned creation time (chain milliseconds).
    pub created_at: Timestamp,
    pub generator_public_key: PublicKey,
    /// Sum of the fees of `transactions`.
    pub fee: u64,
    pub transactions: Vec<Transaction>,
    pub signature: Signature,
}

impl Block {
    /// Assemble an unsigned block extending `previous_id` at `height`,
    /// computing the fee total and the id.
    pub fn assemble(
        height: Height,
        previous_block_id: BlockId,
        created_at: Timestamp,
        generator_public_key: PublicKey,
        transactions: Vec<Transaction>,
    ) -> Self {
        let fee = transactions.iter().map(|tx| tx.fee).sum();
        let mut block = Self {
            id: BlockId::ZERO,
            height,
            previous_block_id,
            created_at,
            generator_public_key,
            fee,
            transactions,
            signature: Signature::ZERO,
        };
        block.id = block.compute_id();
        block
    }

    /// The canonical header bytes: every consensus-relevant field in fixed
    /// order, little-endian integers, signature excluded.
    pub fn header_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(88 + 32 * self.transactions.len());
        bytes.extend_from_slice(&self.height.to_le_bytes());
        bytes.extend_from_slice(self.previous_block_id.as_bytes());
        bytes.extend_from_slice(&self.created_at.as_millis().to_le_bytes());
        bytes.extend_from_slice(self.generator_public_key.as_bytes());
        bytes.extend_from_slice(&self.fee.to_le_bytes());
        for tx in &self.transactions {
            bytes.extend_from_slice(tx.id.as_bytes());
        }
        bytes
    }

    pub fn compute_id(&self) -> BlockId {
        block_id_from_bytes(&self.header_bytes())
    }

    /// Sign the canonical header with the forging key.
    pub fn sign(&mut self, keypair: &KeyPair) {
        self.signature = sign_message(&self.header_bytes(), &keypair.private);
    }

    /// Verify the signature against the generator's public key.
    pub fn verify_signature(&self) -> bool {
        verify_signature(&self.header_bytes(), &self.signature, &self.generator_public_key)
    }
}
