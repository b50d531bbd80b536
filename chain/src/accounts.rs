//! Account balances, mutated by round fee settlement.

use crate::error::ChainError;
use rota_types::PublicKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An account as the round engine sees it: a key and a balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub public_key: PublicKey,
    pub balance: u64,
}

/// In-memory account registry.
///
/// Unknown accounts read as zero balance; a credit materializes the account.
#[derive(Default)]
pub struct AccountRepository {
    accounts: HashMap<PublicKey, Account>,
}

impl AccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, public_key: &PublicKey) -> Option<&Account> {
        self.accounts.get(public_key)
    }

    pub fn balance(&self, public_key: &PublicKey) -> u64 {
        self.accounts.get(public_key).map(|a| a.balance).unwrap_or(0)
    }

    pub fn count(&self) -> usize {
        self.accounts.len()
    }

    /// Credit `amount`, creating the account if needed. Returns the new
    /// balance.
    pub fn credit(&mut self, public_key: &PublicKey, amount: u64) -> u64 {
        let account = self
            .accounts
            .entry(*public_key)
            .or_insert_with(|| Account {
                public_key: *public_key,
                balance: 0,
            });
        account.balance = account.balance.saturating_add(amount);
        account.balance
    }

    /// Debit `amount`. Fails rather than driving a balance below zero.
    pub fn debit(&mut self, public_key: &PublicKey, amount: u64) -> Result<u64, ChainError> {
        let available = self.balance(public_key);
        if available < amount {
            return Err(ChainError::InsufficientBalance {
                account: *public_key,
                available,
                needed: amount,
            });
        }
        let account = self
            .accounts
            .get_mut(public_key)
            .ok_or(ChainError::InsufficientBalance {
                account: *public_key,
                available: 0,
                needed: amount,
            })?;
        account.balance -= amount;
        Ok(account.balance)
    }
}
