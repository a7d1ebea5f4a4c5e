//! Working transaction set
//!
//! Transactions known locally and not yet in the canonical chain, unique by
//! hash and kept in arrival order.

use shared_types::{Hash, Transaction};
use std::collections::HashSet;

/// Ordered, hash-unique set of pending transactions
#[derive(Clone, Debug, Default)]
pub struct TransactionSet {
    transactions: Vec<Transaction>,
    hashes: HashSet<Hash>,
}

impl TransactionSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transactions
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Whether a transaction with this hash is present
    pub fn contains(&self, hash: &Hash) -> bool {
        self.hashes.contains(hash)
    }

    /// Append a transaction unless its hash is already present
    ///
    /// Returns `true` if the transaction was added.
    pub fn insert(&mut self, tx: Transaction) -> bool {
        if !self.hashes.insert(tx.hash()) {
            return false;
        }
        self.transactions.push(tx);
        true
    }

    /// Append every new transaction, returning how many were added
    pub fn extend(&mut self, txs: impl IntoIterator<Item = Transaction>) -> usize {
        let mut added = 0;
        for tx in txs {
            if self.insert(tx) {
                added += 1;
            }
        }
        added
    }

    /// Remove every transaction whose hash is listed, returning how many went
    pub fn remove_hashes(&mut self, hashes: &[Hash]) -> usize {
        let doomed: HashSet<&Hash> = hashes.iter().collect();
        let before = self.transactions.len();
        let retained = &mut self.hashes;
        self.transactions.retain(|tx| {
            let hash = tx.hash();
            if doomed.contains(&hash) {
                retained.remove(&hash);
                false
            } else {
                true
            }
        });
        before - self.transactions.len()
    }

    /// Transactions in arrival order
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }

    /// Take all transactions out, leaving the set empty
    pub fn drain(&mut self) -> Vec<Transaction> {
        self.hashes.clear();
        std::mem::take(&mut self.transactions)
    }

    /// Copy of the transactions in execution order
    pub fn ordered(&self) -> Vec<Transaction> {
        let mut txs = self.transactions.clone();
        order_by_sender_nonce(&mut txs);
        txs
    }
}

impl FromIterator<Transaction> for TransactionSet {
    fn from_iter<I: IntoIterator<Item = Transaction>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

/// Stable sort by `(sender, nonce)` ascending.
///
/// Equal keys keep their arrival order, so the result does not depend on
/// how the network interleaved one sender's transactions.
pub fn order_by_sender_nonce(txs: &mut [Transaction]) {
    txs.sort_by(|a, b| (a.sender(), a.nonce).cmp(&(b.sender(), b.nonce)));
}
