//! The delegate registry and the active set.

use rota_types::PublicKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A registered delegate: an account that may be assigned forging slots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegate {
    pub public_key: PublicKey,
    pub username: String,
    pub votes: u64,
}

/// Registry of delegates; the active set is the top `active_count` by vote
/// weight, tie-broken by public key ascending so every node agrees on it.
pub struct DelegateRepository {
    delegates: HashMap<PublicKey, Delegate>,
    active_count: usize,
}

impl DelegateRepository {
    pub fn new(active_count: usize) -> Self {
        Self {
            delegates: HashMap::new(),
            active_count,
        }
    }

    pub fn register(&mut self, delegate: Delegate) {
        self.delegates.insert(delegate.public_key, delegate);
    }

    pub fn set_votes(&mut self, public_key: &PublicKey, votes: u64) {
        if let Some(delegate) = self.delegates.get_mut(public_key) {
            delegate.votes = votes;
        }
    }

    pub fn get(&self, public_key: &PublicKey) -> Option<&Delegate> {
        self.delegates.get(public_key)
    }

    pub fn count(&self) -> usize {
        self.delegates.len()
    }

    /// The active delegate set, ordered by descending votes then ascending
    /// public key. Fewer delegates than `active_count` means a smaller set.
    pub fn active(&self) -> Vec<Delegate> {
        let mut all: Vec<Delegate> = self.delegates.values().cloned().collect();
        all.sort_by(|a, b| b.votes.cmp(&a.votes).then(a.public_key.cmp(&b.public_key)));
        all.truncate(self.active_count);
        all
    }

    pub fn is_active(&self, public_key: &PublicKey) -> bool {
        self.active().iter().any(|d| d.public_key == *public_key)
    }
}
