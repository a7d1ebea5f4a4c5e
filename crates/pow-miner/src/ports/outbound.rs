//! Outbound ports (driven side - SPI)

use crate::domain::{BlockTemplate, ProcessedTransactions};
use crate::error::Result;
use crate::session::CancelSignal;
use async_trait::async_trait;
use shared_types::{Address, Block, BlockHeader, Hash, Transaction};

/// Port: read the canonical chain
#[async_trait]
pub trait ChainView: Send + Sync {
    /// Current canonical head
    async fn current_head(&self) -> Result<Block>;

    /// Empty template on top of the current head
    async fn new_template(&self, coinbase: Address) -> Result<BlockTemplate>;

    /// Block by hash
    async fn get_block(&self, hash: &Hash) -> Result<Option<Block>>;

    /// Gas limit for a child of `parent`
    fn gas_limit(&self, parent: &Block) -> u64;
}

/// Port: apply transactions and validate blocks
#[async_trait]
pub trait StateProcessor: Send + Sync {
    /// Apply `txs` in order to the template's pending state
    ///
    /// Never fails as a whole: problems are reported through the partition
    /// and its optional `error`.
    async fn process_transactions(
        &self,
        coinbase: Address,
        template: &mut BlockTemplate,
        parent: &Block,
        gas_pool: u64,
        txs: Vec<Transaction>,
    ) -> ProcessedTransactions;

    /// Credit block and uncle rewards to the template's pending state
    async fn accumulate_rewards(&self, template: &mut BlockTemplate, parent: &Block) -> Result<()>;

    /// Validate a sealed block and import it into the chain
    async fn process(&self, block: &Block) -> Result<()>;
}

/// Port: pending transaction pool
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Take every pending transaction out of the pool
    async fn flush_all(&self) -> Result<Vec<Transaction>>;

    /// Copy of the pending transactions
    async fn current_snapshot(&self) -> Result<Vec<Transaction>>;

    /// Remove transactions by hash
    async fn remove_set(&self, hashes: &[Hash]) -> Result<()>;
}

/// Port: proof-of-work search
///
/// Synchronous: the miner runs `search` on a blocking worker thread.
pub trait PowEngine: Send + Sync {
    /// Search for a nonce sealing `template`
    ///
    /// Returns `None` once `cancel` is observed or the nonce space is spent.
    fn search(&self, template: &BlockTemplate, cancel: &CancelSignal) -> Option<u64>;

    /// Check the seal of a header
    fn verify(&self, header: &BlockHeader) -> bool;

    /// Set the effort mode
    fn set_turbo(&self, on: bool);

    /// Current effort mode
    fn turbo(&self) -> bool;

    /// Engine name for logs
    fn name(&self) -> &'static str;
}

/// Port: announce mined blocks to the network
#[async_trait]
pub trait BlockBroadcaster: Send + Sync {
    /// Broadcast a block
    async fn broadcast(&self, block: &Block) -> Result<()>;
}
