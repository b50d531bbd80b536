//! Ed25519 key generation and forging-key derivation.

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rota_types::{KeyPair, PrivateKey, PublicKey};
use sha2::{Digest, Sha256};

/// Generate a new Ed25519 key pair from a secure random source.
pub fn generate_keypair() -> KeyPair {
    let signing_key = SigningKey::generate(&mut OsRng);
    let verifying_key = signing_key.verifying_key();
    KeyPair {
        public: PublicKey(verifying_key.to_bytes()),
        private: PrivateKey(signing_key.to_bytes()),
    }
}

/// Derive the public key from a private key.
pub fn public_from_private(private: &PrivateKey) -> PublicKey {
    let signing_key = SigningKey::from_bytes(&private.0);
    PublicKey(signing_key.verifying_key().to_bytes())
}

/// Reconstruct a full key pair from a private key.
pub fn keypair_from_private(private: PrivateKey) -> KeyPair {
    let public = public_from_private(&private);
    KeyPair { public, private }
}

/// Derive a key pair from a 32-byte seed (deterministic).
pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    let signing_key = SigningKey::from_bytes(seed);
    let verifying_key = signing_key.verifying_key();
    KeyPair {
        public: PublicKey(verifying_key.to_bytes()),
        private: PrivateKey(signing_key.to_bytes()),
    }
}

/// Derive the node's forging key pair from its secret string.
///
/// The seed is `SHA-256(secret)`, so any node configured with the same
/// secret forges under the same delegate identity.
pub fn keypair_from_secret(secret: &str) -> KeyPair {
    let digest = Sha256::digest(secret.as_bytes());
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&digest);
    keypair_from_seed(&seed)
}
