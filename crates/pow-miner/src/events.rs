//! Events the miner reacts to

use shared_bus::BlockchainEvent;
use shared_types::{Block, Transaction};

/// External stimulus handled by the control loop
///
/// The bus carries more variants than the miner cares about; only these two
/// trigger a rebuild.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MinerEvent {
    /// A block was accepted into the local chain (head or sibling)
    NewBlock(Block),
    /// A transaction entered the pending pool
    NewPendingTransaction(Transaction),
}

impl MinerEvent {
    /// Short variant name for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewBlock(_) => "new_block",
            Self::NewPendingTransaction(_) => "new_pending_transaction",
        }
    }
}

impl TryFrom<BlockchainEvent> for MinerEvent {
    /// The event, handed back when it is not one the miner handles
    type Error = BlockchainEvent;

    fn try_from(event: BlockchainEvent) -> Result<Self, Self::Error> {
        match event {
            BlockchainEvent::NewBlock(block) => Ok(Self::NewBlock(block)),
            BlockchainEvent::NewPendingTransaction(tx) => Ok(Self::NewPendingTransaction(tx)),
            other @ (BlockchainEvent::MinerStarted { .. } | BlockchainEvent::MinerStopped { .. }) => {
                Err(other)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_events_convert() {
        let event = MinerEvent::try_from(BlockchainEvent::NewBlock(Block::default()));
        assert!(matches!(event, Ok(MinerEvent::NewBlock(_))));
    }

    #[test]
    fn test_lifecycle_events_are_handed_back() {
        let started = BlockchainEvent::MinerStarted { coinbase: [1u8; 20] };
        assert_eq!(MinerEvent::try_from(started.clone()), Err(started));
    }
}
