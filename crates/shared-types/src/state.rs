//! # World State
//!
//! Account balances and nonces keyed by address. The map is ordered so the
//! state root is independent of insertion order.

use crate::entities::{Address, Hash};
use crate::errors::StateError;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// The state of a single account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account balance in base units.
    pub balance: U256,
    /// Number of transactions sent from this account.
    pub nonce: u64,
}

/// All accounts known to a block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldState {
    accounts: BTreeMap<Address, Account>,
}

impl WorldState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a state with pre-funded accounts.
    pub fn with_balances(balances: impl IntoIterator<Item = (Address, U256)>) -> Self {
        let mut state = Self::new();
        for (address, balance) in balances {
            state.credit(address, balance);
        }
        state
    }

    /// Account at `address` (default account if absent).
    pub fn account(&self, address: &Address) -> Account {
        self.accounts.get(address).cloned().unwrap_or_default()
    }

    /// Balance at `address`.
    pub fn balance(&self, address: &Address) -> U256 {
        self.accounts
            .get(address)
            .map(|a| a.balance)
            .unwrap_or_default()
    }

    /// Nonce at `address`.
    pub fn nonce(&self, address: &Address) -> u64 {
        self.accounts.get(address).map(|a| a.nonce).unwrap_or(0)
    }

    /// Add `amount` to the balance at `address`.
    pub fn credit(&mut self, address: Address, amount: U256) {
        let account = self.accounts.entry(address).or_default();
        account.balance = account.balance.saturating_add(amount);
    }

    /// Subtract `amount` from the balance at `address`.
    pub fn debit(&mut self, address: Address, amount: U256) -> Result<(), StateError> {
        let account = self.accounts.entry(address).or_default();
        if account.balance < amount {
            return Err(StateError::InsufficientBalance {
                address: hex::encode(address),
                balance: account.balance,
                required: amount,
            });
        }
        account.balance -= amount;
        Ok(())
    }

    /// Bump the nonce at `address`.
    pub fn increment_nonce(&mut self, address: Address) {
        let account = self.accounts.entry(address).or_default();
        account.nonce += 1;
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether no account exists.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// State root over the sorted account entries.
    pub fn root(&self) -> Hash {
        let mut hasher = Sha256::new();
        for (address, account) in &self.accounts {
            let mut balance = [0u8; 32];
            account.balance.to_big_endian(&mut balance);
            hasher.update(address);
            hasher.update(balance);
            hasher.update(account.nonce.to_be_bytes());
        }
        hasher.finalize().into()
    }
}
