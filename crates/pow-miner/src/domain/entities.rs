//! Domain entities for the miner

use crate::error::MinerError;
use shared_types::{
    transactions_root, uncles_hash, Address, Block, BlockHeader, Hash, Receipt, Transaction,
    WorldState,
};

/// The in-progress block of one round
///
/// Rebuilt from the working sets before every search; the search worker
/// only ever sees an immutable snapshot of it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockTemplate {
    /// Header under construction (nonce unset until sealed)
    pub header: BlockHeader,

    /// Accepted transactions in execution order
    pub transactions: Vec<Transaction>,

    /// Receipts matching `transactions`
    pub receipts: Vec<Receipt>,

    /// Referenced uncle headers
    pub uncles: Vec<BlockHeader>,

    /// Pending post-state
    pub state: WorldState,
}

impl BlockTemplate {
    /// Create an empty template over a parent's post-state
    pub fn new(header: BlockHeader, state: WorldState) -> Self {
        Self {
            header,
            transactions: Vec::new(),
            receipts: Vec::new(),
            uncles: Vec::new(),
            state,
        }
    }

    /// Hash of the block this template builds on
    pub fn parent_hash(&self) -> Hash {
        self.header.parent_hash
    }

    /// Height of the block being built
    pub fn number(&self) -> u64 {
        self.header.number
    }

    /// Reward address
    pub fn coinbase(&self) -> Address {
        self.header.coinbase
    }

    /// Replace the uncle list and its header commitment
    pub fn set_uncles(&mut self, uncles: Vec<BlockHeader>) {
        self.header.uncles_hash = uncles_hash(&uncles);
        self.uncles = uncles;
    }

    /// Replace the transaction list with accepted transactions and receipts
    pub fn set_transactions(&mut self, accepted: Vec<(Transaction, Receipt)>) {
        let (transactions, receipts): (Vec<_>, Vec<_>) = accepted.into_iter().unzip();
        self.header.tx_root = transactions_root(&transactions);
        self.header.gas_used = receipts.last().map_or(0, |r| r.cumulative_gas_used);
        self.transactions = transactions;
        self.receipts = receipts;
    }

    /// Commit the pending state into the header
    pub fn finalize_state_root(&mut self) {
        self.header.state_root = self.state.root();
    }

    /// Hashes of the included transactions
    pub fn transaction_hashes(&self) -> Vec<Hash> {
        self.transactions.iter().map(Transaction::hash).collect()
    }

    /// Produce the sealed block for a found nonce
    pub fn seal(&self, nonce: u64) -> Block {
        let mut header = self.header.clone();
        header.nonce = nonce;
        Block {
            header,
            transactions: self.transactions.clone(),
            uncles: self.uncles.clone(),
        }
    }
}

/// Partition of a round's transactions after application
#[derive(Debug, Default)]
pub struct ProcessedTransactions {
    /// Applied transactions with their receipts, in order
    pub accepted: Vec<(Transaction, Receipt)>,

    /// Not applicable yet (future nonce, block full); retried next round
    pub deferred: Vec<Transaction>,

    /// Never applicable; removed from the pool
    pub failed: Vec<Transaction>,

    /// Non-fatal error reported alongside the partition
    pub error: Option<MinerError>,
}

impl ProcessedTransactions {
    /// Hashes of the permanently failed transactions
    pub fn failed_hashes(&self) -> Vec<Hash> {
        self.failed.iter().map(Transaction::hash).collect()
    }

    /// Number of transactions across all partitions
    pub fn total(&self) -> usize {
        self.accepted.len() + self.deferred.len() + self.failed.len()
    }
}

/// Miner lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MinerState {
    /// Not mining (initial and terminal)
    Stopped,
    /// Control loop running
    Running,
}

/// Point-in-time view of the miner
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinerStatus {
    /// Lifecycle state
    pub state: MinerState,

    /// Reward address
    pub coinbase: Address,

    /// Current effort mode
    pub turbo: bool,

    /// Rounds that reached the search phase
    pub rounds_started: u64,

    /// Blocks mined and accepted
    pub blocks_mined: u64,

    /// Size of the working transaction set
    pub pending_transactions: usize,

    /// Size of the uncle set
    pub uncle_candidates: usize,

    /// Parent of the template currently being searched
    pub current_parent: Option<Hash>,
}
