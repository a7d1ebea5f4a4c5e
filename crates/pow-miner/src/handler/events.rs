//! Event handling

use super::ControlLoop;
use crate::domain::{check_disjoint_from_block, UncleOutcome};
use crate::events::MinerEvent;
use shared_types::{short_hash, Block, Transaction};
use tracing::{debug, error, info, warn};

impl ControlLoop {
    /// Cancel and join the live search, apply the event, search again
    pub(super) async fn handle_event(&mut self, event: MinerEvent) {
        debug!(kind = event.kind(), round = self.round, "[pow-miner] Handling event");
        self.cancel_session().await;

        match event {
            MinerEvent::NewBlock(block) => self.on_new_block(block).await,
            MinerEvent::NewPendingTransaction(tx) => self.on_pending_transaction(tx),
        }

        self.start_round().await;
    }

    async fn on_new_block(&mut self, block: Block) {
        let head = match self.deps.chain.current_head().await {
            Ok(head) => head,
            Err(e) => {
                warn!(error = %e, "[pow-miner] Failed to read canonical head");
                return;
            }
        };
        let hash = block.hash();

        if hash == head.hash() {
            let removed = self.txs.remove_hashes(&block.transaction_hashes());
            let pruned = self.uncles.prune(&head);
            let check = check_disjoint_from_block(&self.txs, &block);
            if let Err(e) = &check {
                error!(error = %e, "[pow-miner] Invariant violated");
            }
            debug_assert!(check.is_ok(), "invariant violated");
            debug!(
                number = block.number(),
                block = %short_hash(&hash),
                removed,
                pruned,
                "[pow-miner] New canonical head"
            );
            return;
        }

        let number = block.number();
        match self.uncles.insert(block.header, &head) {
            UncleOutcome::Inserted { evicted } => info!(
                number,
                block = %short_hash(&hash),
                evicted = ?evicted.as_ref().map(short_hash),
                "[pow-miner] Adding uncle block"
            ),
            UncleOutcome::Duplicate => {
                debug!(block = %short_hash(&hash), "[pow-miner] Uncle already known")
            }
            UncleOutcome::Ineligible => debug!(
                number,
                block = %short_hash(&hash),
                "[pow-miner] Discarding block unrelated to head"
            ),
        }
    }

    fn on_pending_transaction(&mut self, tx: Transaction) {
        let hash = tx.hash();
        if self.txs.insert(tx) {
            debug!(tx = %short_hash(&hash), pending = self.txs.len(), "[pow-miner] Transaction added");
        } else {
            debug!(tx = %short_hash(&hash), "[pow-miner] Transaction already pending");
        }
    }

    /// Recover from missed events
    ///
    /// Dropped transactions are re-read from the pool and the head's
    /// transactions are filtered out again before restarting.
    pub(super) async fn resync(&mut self, missed: u64) {
        warn!(missed, "[pow-miner] Event subscription lagged, resynchronising");
        self.cancel_session().await;

        match self.deps.tx_source.current_snapshot().await {
            Ok(snapshot) => {
                let added = self.txs.extend(snapshot);
                debug!(added, "[pow-miner] Transactions recovered from pool");
            }
            Err(e) => warn!(error = %e, "[pow-miner] Failed to read pool snapshot"),
        }
        match self.deps.chain.current_head().await {
            Ok(head) => {
                self.txs.remove_hashes(&head.transaction_hashes());
                self.uncles.prune(&head);
            }
            Err(e) => warn!(error = %e, "[pow-miner] Failed to read canonical head"),
        }

        self.start_round().await;
    }
}
