//! # Core Chain Entities
//!
//! Blocks, headers, transactions and receipts as seen by every crate in the
//! workspace.
//!
//! ## Hashing
//!
//! All hashes are SHA-256 over a fixed field encoding (integers big-endian,
//! variable-length fields length-prefixed). `BlockHeader::seal_hash` covers
//! every header field except the nonce and is the proof-of-work input.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A 32-byte SHA-256 hash.
pub type Hash = [u8; 32];

/// A 20-byte account address.
pub type Address = [u8; 20];

/// The all-zero hash (parent of the genesis block).
pub const ZERO_HASH: Hash = [0u8; 32];

/// Render the first 8 bytes of a hash as hex, for log lines.
pub fn short_hash(hash: &Hash) -> String {
    hex::encode(&hash[..8])
}

fn update_u256(hasher: &mut Sha256, value: &U256) {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    hasher.update(bytes);
}

fn update_bytes(hasher: &mut Sha256, data: &[u8]) {
    hasher.update((data.len() as u64).to_be_bytes());
    hasher.update(data);
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// A signed-off transaction as gossiped between nodes.
///
/// Signature recovery happens before a transaction reaches the pool, so the
/// sender is carried explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender address.
    pub from: Address,
    /// Recipient address (`None` for contract creation).
    pub to: Option<Address>,
    /// Value transferred in base units.
    pub value: U256,
    /// Sender nonce.
    pub nonce: u64,
    /// Price paid per unit of gas.
    pub gas_price: U256,
    /// Maximum gas this transaction may consume.
    pub gas_limit: u64,
    /// Call data.
    pub data: Vec<u8>,
}

impl Transaction {
    /// Compute the transaction hash.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.from);
        match &self.to {
            Some(to) => {
                hasher.update([1u8]);
                hasher.update(to);
            }
            None => hasher.update([0u8]),
        }
        update_u256(&mut hasher, &self.value);
        hasher.update(self.nonce.to_be_bytes());
        update_u256(&mut hasher, &self.gas_price);
        hasher.update(self.gas_limit.to_be_bytes());
        update_bytes(&mut hasher, &self.data);
        hasher.finalize().into()
    }

    /// Returns the sender address.
    pub fn sender(&self) -> Address {
        self.from
    }

    /// Upper bound on what the sender pays: `value + gas_price * gas_limit`.
    pub fn max_cost(&self) -> U256 {
        self.value
            .saturating_add(self.gas_price.saturating_mul(U256::from(self.gas_limit)))
    }
}

/// Outcome of applying one transaction to a block's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Hash of the transaction this receipt belongs to.
    pub tx_hash: Hash,
    /// Gas consumed by this transaction.
    pub gas_used: u64,
    /// Gas consumed by the block up to and including this transaction.
    pub cumulative_gas_used: u64,
    /// Whether execution succeeded.
    pub success: bool,
}

// =============================================================================
// BLOCKS
// =============================================================================

/// Header of a proof-of-work block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Hash of the parent block.
    pub parent_hash: Hash,
    /// Height in the chain (genesis = 0).
    pub number: u64,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    /// Address credited with the block reward.
    pub coinbase: Address,
    /// Root of the post-state.
    pub state_root: Hash,
    /// Commitment to the ordered transaction list.
    pub tx_root: Hash,
    /// Commitment to the uncle header list.
    pub uncles_hash: Hash,
    /// Proof-of-work difficulty.
    pub difficulty: U256,
    /// Gas limit for this block.
    pub gas_limit: u64,
    /// Gas consumed by the block's transactions.
    pub gas_used: u64,
    /// Free-form producer data.
    pub extra_data: Vec<u8>,
    /// Proof-of-work nonce.
    pub nonce: u64,
}

impl Default for BlockHeader {
    fn default() -> Self {
        Self {
            parent_hash: ZERO_HASH,
            number: 0,
            timestamp: 0,
            coinbase: [0u8; 20],
            state_root: ZERO_HASH,
            tx_root: transactions_root(&[]),
            uncles_hash: uncles_hash(&[]),
            difficulty: U256::one(),
            gas_limit: 0,
            gas_used: 0,
            extra_data: Vec::new(),
            nonce: 0,
        }
    }
}

impl BlockHeader {
    fn hash_fields(&self, hasher: &mut Sha256) {
        hasher.update(self.parent_hash);
        hasher.update(self.number.to_be_bytes());
        hasher.update(self.timestamp.to_be_bytes());
        hasher.update(self.coinbase);
        hasher.update(self.state_root);
        hasher.update(self.tx_root);
        hasher.update(self.uncles_hash);
        update_u256(hasher, &self.difficulty);
        hasher.update(self.gas_limit.to_be_bytes());
        hasher.update(self.gas_used.to_be_bytes());
        update_bytes(hasher, &self.extra_data);
    }

    /// Hash of every field except the nonce.
    ///
    /// This is what a proof-of-work search commits to.
    pub fn seal_hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        self.hash_fields(&mut hasher);
        hasher.finalize().into()
    }

    /// Block hash (covers the nonce).
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        self.hash_fields(&mut hasher);
        hasher.update(self.nonce.to_be_bytes());
        hasher.finalize().into()
    }
}

/// A complete block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Block {
    /// The block header.
    pub header: BlockHeader,
    /// Ordered transactions.
    pub transactions: Vec<Transaction>,
    /// Uncle headers.
    pub uncles: Vec<BlockHeader>,
}

impl Block {
    /// Block hash.
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// Parent block hash.
    pub fn parent_hash(&self) -> Hash {
        self.header.parent_hash
    }

    /// Block height.
    pub fn number(&self) -> u64 {
        self.header.number
    }

    /// Hashes of the included transactions, in block order.
    pub fn transaction_hashes(&self) -> Vec<Hash> {
        self.transactions.iter().map(Transaction::hash).collect()
    }
}

/// Commitment over an ordered transaction list.
pub fn transactions_root(transactions: &[Transaction]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update((transactions.len() as u64).to_be_bytes());
    for tx in transactions {
        hasher.update(tx.hash());
    }
    hasher.finalize().into()
}

/// Commitment over an uncle header list.
pub fn uncles_hash(uncles: &[BlockHeader]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update((uncles.len() as u64).to_be_bytes());
    for uncle in uncles {
        hasher.update(uncle.hash());
    }
    hasher.finalize().into()
}
