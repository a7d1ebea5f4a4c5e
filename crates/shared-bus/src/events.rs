//! # Blockchain Events
//!
//! Defines all event types that flow through the shared bus.

use serde::{Deserialize, Serialize};
use shared_types::entities::{Address, Block, Transaction};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockchainEvent {
    // =========================================================================
    // CHAIN
    // =========================================================================
    /// A block was accepted into the local chain.
    ///
    /// Published by the sync layer for blocks received from peers and by the
    /// miner for blocks it sealed itself.
    NewBlock(Block),

    // =========================================================================
    // TRANSACTION POOL
    // =========================================================================
    /// A transaction entered the pending pool.
    NewPendingTransaction(Transaction),

    // =========================================================================
    // MINER LIFECYCLE
    // =========================================================================
    /// The miner subscribed and started its first round.
    MinerStarted {
        /// Address credited with block rewards.
        coinbase: Address,
    },

    /// The miner cancelled its last session and unsubscribed.
    MinerStopped {
        /// Address credited with block rewards.
        coinbase: Address,
    },
}

impl BlockchainEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::NewBlock(_) => EventTopic::Chain,
            Self::NewPendingTransaction(_) => EventTopic::TxPool,
            Self::MinerStarted { .. } | Self::MinerStopped { .. } => EventTopic::Miner,
        }
    }

    /// Short variant name for log lines.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewBlock(_) => "new_block",
            Self::NewPendingTransaction(_) => "new_pending_transaction",
            Self::MinerStarted { .. } => "miner_started",
            Self::MinerStopped { .. } => "miner_stopped",
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Accepted blocks.
    Chain,
    /// Pending transactions.
    TxPool,
    /// Miner lifecycle notifications.
    Miner,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &BlockchainEvent) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_topic_mapping() {
        let event = BlockchainEvent::NewBlock(Block::default());
        assert_eq!(event.topic(), EventTopic::Chain);

        let event = BlockchainEvent::MinerStopped { coinbase: [0u8; 20] };
        assert_eq!(event.topic(), EventTopic::Miner);
        assert_eq!(event.kind(), "miner_stopped");
    }

    #[test]
    fn test_filter_all() {
        let filter = EventFilter::all();
        let event = BlockchainEvent::MinerStarted { coinbase: [0u8; 20] };
        assert!(filter.matches(&event));
    }

    #[test]
    fn test_filter_by_topic() {
        let filter = EventFilter::topics(vec![EventTopic::Chain, EventTopic::TxPool]);

        assert!(filter.matches(&BlockchainEvent::NewBlock(Block::default())));

        let lifecycle = BlockchainEvent::MinerStarted { coinbase: [0u8; 20] };
        assert!(!filter.matches(&lifecycle));
    }

    #[test]
    fn test_filter_all_topic_overrides() {
        let filter = EventFilter::topics(vec![EventTopic::Miner, EventTopic::All]);
        assert!(filter.matches(&BlockchainEvent::NewBlock(Block::default())));
    }
}
