//! Cryptographic primitives for the rota chain.
//!
//! - **Ed25519** for block signing and signature verification
//! - **SHA-256** for block/transaction ids and forging-key derivation
//! - **MD5** for the per-round forge-ordering hash (consensus-critical
//!   determinism, not collision resistance; every node must compute the
//!   identical ordering from public data)

pub mod hash;
pub mod keys;
pub mod sign;

pub use hash::{block_id_from_bytes, forge_order_hash, sha256, sha256_multi, tx_id_from_bytes};
pub use keys::{generate_keypair, keypair_from_private, keypair_from_secret, keypair_from_seed,
    public_from_private};
pub use sign::{sign_message, verify_signature};
