//! Block broadcasters

use crate::error::Result;
use crate::ports::BlockBroadcaster;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{short_hash, Block};
use tracing::info;

/// Broadcaster that only logs mined blocks
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingBroadcaster;

#[async_trait]
impl BlockBroadcaster for LoggingBroadcaster {
    async fn broadcast(&self, block: &Block) -> Result<()> {
        info!(
            number = block.number(),
            block = %short_hash(&block.hash()),
            txs = block.transactions.len(),
            "[pow-miner] Broadcasting block"
        );
        Ok(())
    }
}

/// Broadcaster that keeps every block it is handed
#[derive(Debug, Default)]
pub struct RecordingBroadcaster {
    blocks: Mutex<Vec<Block>>,
}

impl RecordingBroadcaster {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks broadcast so far, oldest first
    pub fn blocks(&self) -> Vec<Block> {
        self.blocks.lock().clone()
    }

    /// Number of blocks broadcast
    pub fn len(&self) -> usize {
        self.blocks.lock().len()
    }

    /// Whether nothing was broadcast yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlockBroadcaster for RecordingBroadcaster {
    async fn broadcast(&self, block: &Block) -> Result<()> {
        self.blocks.lock().push(block.clone());
        Ok(())
    }
}
