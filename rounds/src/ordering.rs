//! Deterministic forge ordering.
//!
//! Every node computes the same delegate order for a round from two public
//! inputs: the active delegate set and the id of the block the round builds
//! on. Any divergence here forks the network, so the sort is total: digests
//! first, public key as the tie-break.

use rota_crypto::forge_order_hash;
use rota_types::{BlockId, PublicKey, Slot};
use std::collections::BTreeMap;

/// One delegate's position material in the forge order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForgeOrderEntry {
    pub hash: [u8; 16],
    pub public_key: PublicKey,
}

/// Hash every delegate against the anchoring block id.
pub fn generate_hash_list(delegates: &[PublicKey], block_id: &BlockId) -> Vec<ForgeOrderEntry> {
    delegates
        .iter()
        .map(|public_key| ForgeOrderEntry {
            hash: forge_order_hash(public_key, block_id),
            public_key: *public_key,
        })
        .collect()
}

/// Order entries by digest, ascending, tie-broken by public key.
pub fn sort_hash_list(list: &mut [ForgeOrderEntry]) {
    list.sort_by(|a, b| a.hash.cmp(&b.hash).then(a.public_key.cmp(&b.public_key)));
}

/// Hand out consecutive slots from `first_slot` in list order.
pub fn assign_slots(sorted: &[ForgeOrderEntry], first_slot: Slot) -> BTreeMap<PublicKey, Slot> {
    sorted
        .iter()
        .enumerate()
        .map(|(i, entry)| (entry.public_key, first_slot + i as u64))
        .collect()
}
