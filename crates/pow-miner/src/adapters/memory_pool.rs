//! In-memory transaction pool

use crate::error::Result;
use crate::ports::TransactionSource;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_bus::{BlockchainEvent, EventPublisher, InMemoryEventBus};
use shared_types::{short_hash, Hash, Transaction};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
struct PoolInner {
    transactions: Vec<Transaction>,
    hashes: HashSet<Hash>,
}

/// Insertion-ordered pool, unique by hash
///
/// When bound to a bus, every newly added transaction is announced as
/// `NewPendingTransaction`.
#[derive(Default)]
pub struct MemoryTxPool {
    inner: RwLock<PoolInner>,
    bus: Option<Arc<InMemoryEventBus>>,
}

impl MemoryTxPool {
    /// Create an unbound pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool that announces additions on `bus`
    pub fn with_event_bus(bus: Arc<InMemoryEventBus>) -> Self {
        Self {
            inner: RwLock::default(),
            bus: Some(bus),
        }
    }

    /// Add a transaction; returns false if it was already pooled
    pub async fn add(&self, tx: Transaction) -> bool {
        let hash = tx.hash();
        {
            let mut inner = self.inner.write();
            if !inner.hashes.insert(hash) {
                return false;
            }
            inner.transactions.push(tx.clone());
        }
        debug!(tx = %short_hash(&hash), "[pow-miner] Transaction pooled");

        if let Some(bus) = &self.bus {
            bus.publish(BlockchainEvent::NewPendingTransaction(tx)).await;
        }
        true
    }

    /// Number of pooled transactions
    pub fn len(&self) -> usize {
        self.inner.read().transactions.len()
    }

    /// Whether the pool is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a transaction is pooled
    pub fn contains(&self, hash: &Hash) -> bool {
        self.inner.read().hashes.contains(hash)
    }
}

#[async_trait]
impl TransactionSource for MemoryTxPool {
    async fn flush_all(&self) -> Result<Vec<Transaction>> {
        let mut inner = self.inner.write();
        inner.hashes.clear();
        Ok(std::mem::take(&mut inner.transactions))
    }

    async fn current_snapshot(&self) -> Result<Vec<Transaction>> {
        Ok(self.inner.read().transactions.clone())
    }

    async fn remove_set(&self, hashes: &[Hash]) -> Result<()> {
        let doomed: HashSet<&Hash> = hashes.iter().collect();
        let mut inner = self.inner.write();
        let PoolInner {
            transactions,
            hashes: pooled,
        } = &mut *inner;
        transactions.retain(|tx| {
            let hash = tx.hash();
            if doomed.contains(&hash) {
                pooled.remove(&hash);
                false
            } else {
                true
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use primitive_types::U256;
    use shared_bus::EventFilter;

    fn tx(nonce: u64) -> Transaction {
        Transaction {
            from: [1u8; 20],
            to: Some([2u8; 20]),
            value: U256::one(),
            nonce,
            gas_price: U256::one(),
            gas_limit: 21_000,
            data: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_add_is_unique_by_hash() {
        let pool = MemoryTxPool::new();
        assert!(pool.add(tx(0)).await);
        assert!(!pool.add(tx(0)).await);
        assert!(pool.add(tx(1)).await);

        assert_eq!(pool.len(), 2);
        assert!(pool.contains(&tx(1).hash()));
    }

    #[tokio::test]
    async fn test_snapshot_keeps_insertion_order() {
        let pool = MemoryTxPool::new();
        pool.add(tx(2)).await;
        pool.add(tx(0)).await;

        assert_eq!(pool.current_snapshot().await.unwrap(), vec![tx(2), tx(0)]);
        assert_eq!(pool.len(), 2);
    }

    #[tokio::test]
    async fn test_flush_all_drains() {
        let pool = MemoryTxPool::new();
        pool.add(tx(0)).await;

        assert_eq!(pool.flush_all().await.unwrap(), vec![tx(0)]);
        assert!(pool.is_empty());
        // Flushed transactions may be pooled again.
        assert!(pool.add(tx(0)).await);
    }

    #[tokio::test]
    async fn test_remove_set() {
        let pool = MemoryTxPool::new();
        for nonce in 0..3 {
            pool.add(tx(nonce)).await;
        }

        pool.remove_set(&[tx(1).hash(), [9u8; 32]]).await.unwrap();

        assert_eq!(pool.current_snapshot().await.unwrap(), vec![tx(0), tx(2)]);
        assert!(!pool.contains(&tx(1).hash()));
    }

    #[tokio::test]
    async fn test_bound_pool_announces_new_transactions() {
        let bus = Arc::new(InMemoryEventBus::new());
        let mut sub = bus.subscribe(EventFilter::all());
        let pool = MemoryTxPool::with_event_bus(bus);

        pool.add(tx(0)).await;
        pool.add(tx(0)).await;

        assert!(matches!(
            sub.recv().await.unwrap(),
            BlockchainEvent::NewPendingTransaction(t) if t == tx(0)
        ));
        assert!(sub.try_recv().unwrap().is_none());
    }
}
