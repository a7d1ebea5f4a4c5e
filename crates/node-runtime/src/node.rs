//! Development node wiring
//!
//! One event bus shared by an in-memory chain, a bus-bound transaction pool
//! and the miner. Mined blocks are imported by the miner itself.

use crate::config::NodeConfig;
use anyhow::{Context, Result};
use pow_miner::{EasyPow, LoggingBroadcaster, MemoryChain, MemoryTxPool, Miner, PowEngine};
use shared_bus::{BlockchainEvent, EventFilter, InMemoryEventBus};
use shared_types::{short_hash, Address, U256};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

/// A running set of collaborators around one miner
pub struct DevNode {
    /// Event bus shared by every component
    pub bus: Arc<InMemoryEventBus>,
    /// In-memory chain, also the miner's state processor
    pub chain: Arc<MemoryChain>,
    /// Pending transactions, announced on the bus
    pub pool: Arc<MemoryTxPool>,
    /// The block producer
    pub miner: Miner,
}

impl DevNode {
    /// Wire a node with no pre-funded accounts
    pub fn new(config: &NodeConfig) -> Result<Self> {
        Self::with_balances(config, Vec::<(Address, U256)>::new())
    }

    /// Wire a node whose genesis state funds `balances`
    pub fn with_balances(
        config: &NodeConfig,
        balances: impl IntoIterator<Item = (Address, U256)>,
    ) -> Result<Self> {
        let bus = Arc::new(InMemoryEventBus::with_capacity(config.bus_capacity));
        let pow: Arc<dyn PowEngine> = Arc::new(EasyPow::new(&config.miner.pow));
        let chain = Arc::new(MemoryChain::with_balances(
            balances,
            config.difficulty,
            Arc::clone(&pow),
        ));
        let pool = Arc::new(MemoryTxPool::with_event_bus(Arc::clone(&bus)));

        let miner = Miner::builder()
            .config(config.miner.clone())
            .event_bus(Arc::clone(&bus))
            .chain(chain.clone())
            .state(chain.clone())
            .tx_source(pool.clone())
            .pow(pow)
            .broadcaster(Arc::new(LoggingBroadcaster))
            .build()
            .context("failed to wire miner")?;

        info!(
            coinbase = %hex::encode(config.miner.coinbase),
            difficulty = %config.difficulty,
            bus_capacity = config.bus_capacity,
            "Dev node wired"
        );

        Ok(Self {
            bus,
            chain,
            pool,
            miner,
        })
    }

    /// Log every bus event until the bus closes
    pub fn spawn_event_logger(&self) -> JoinHandle<()> {
        let mut events = self.bus.subscribe(EventFilter::all()).into_stream();
        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                match event {
                    Ok(BlockchainEvent::NewBlock(block)) => info!(
                        number = block.number(),
                        block = %short_hash(&block.hash()),
                        txs = block.transactions.len(),
                        uncles = block.uncles.len(),
                        "New block"
                    ),
                    Ok(BlockchainEvent::NewPendingTransaction(tx)) => debug!(
                        tx = %short_hash(&tx.hash()),
                        from = %hex::encode(tx.from),
                        nonce = tx.nonce,
                        "New pending transaction"
                    ),
                    Ok(BlockchainEvent::MinerStarted { coinbase }) => {
                        info!(coinbase = %hex::encode(coinbase), "Miner started")
                    }
                    Ok(BlockchainEvent::MinerStopped { coinbase }) => {
                        info!(coinbase = %hex::encode(coinbase), "Miner stopped")
                    }
                    Err(e) => warn!(error = %e, "Event logger fell behind"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pow_miner::MinerApi;
    use shared_types::Transaction;
    use std::time::Duration;

    const ALICE: Address = [0xa1; 20];
    const BOB: Address = [0xb0; 20];

    fn trivial_config() -> NodeConfig {
        let mut config = NodeConfig {
            difficulty: U256::one(),
            ..Default::default()
        };
        config.miner.coinbase = [0xc0; 20];
        config
    }

    async fn wait_for_height(chain: &MemoryChain, height: u64) {
        let reached = tokio::time::timeout(Duration::from_secs(10), async {
            while chain.height() < height {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(reached.is_ok(), "chain never reached height {height}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_dev_node_mines_and_includes_transactions() {
        let config = trivial_config();
        let node = DevNode::with_balances(&config, [(ALICE, U256::from(1_000_000_000u64))])
            .expect("wiring");
        let logger = node.spawn_event_logger();

        node.miner.start().await.expect("start");
        wait_for_height(&node.chain, 1).await;

        node.pool
            .add(Transaction {
                from: ALICE,
                to: Some(BOB),
                value: U256::from(5),
                nonce: 0,
                gas_price: U256::one(),
                gas_limit: 21_000,
                data: Vec::new(),
            })
            .await;

        let included = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let head = node.chain.head().expect("head");
                let state = node.chain.state_at(&head.hash()).expect("state");
                if state.balance(&BOB) == U256::from(5) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(included.is_ok(), "transfer never mined");

        node.miner.stop().await.expect("stop");
        assert!(!node.miner.is_running());
        logger.abort();
    }

    #[test]
    fn test_wiring_rejects_invalid_miner_config() {
        let mut config = trivial_config();
        config.miner.max_uncles = pow_miner::MAX_UNCLES + 1;
        assert!(DevNode::new(&config).is_err());
    }
}
