//! Round assembly and block finalization

use super::ControlLoop;
use crate::domain::{check_disjoint_from_block, check_uncles, BlockTemplate, ProcessedTransactions};
use crate::error::{MinerError, Result};
use crate::session::MiningSession;
use shared_bus::{BlockchainEvent, EventPublisher};
use shared_types::short_hash;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

impl ControlLoop {
    /// Rebuild the template from the working sets and launch a search
    ///
    /// Assembly failures schedule a retry instead of a search.
    pub(super) async fn start_round(&mut self) {
        self.cancel_session().await;
        self.retry_at = None;

        let template = match self.assemble().await {
            Ok(template) => template,
            Err(e) => {
                warn!(
                    round = self.round + 1,
                    error = %e,
                    "[pow-miner] Failed to assemble block"
                );
                self.schedule_retry();
                return;
            }
        };

        self.round += 1;
        self.metrics.record_round_started();
        info!(
            round = self.round,
            number = template.number(),
            txs = template.transactions.len(),
            uncles = template.uncles.len(),
            pending = self.txs.len(),
            "[pow-miner] Mining on block"
        );

        let parent = template.parent_hash();
        self.session = Some(MiningSession::spawn(
            self.round,
            Arc::clone(&self.deps.pow),
            Arc::new(template),
            Arc::clone(&self.metrics),
        ));
        self.publish_view(Some(parent));
    }

    async fn assemble(&mut self) -> Result<BlockTemplate> {
        let mut template = self.deps.chain.new_template(self.coinbase).await?;
        let parent = self
            .deps
            .chain
            .get_block(&template.parent_hash())
            .await?
            .ok_or_else(|| MinerError::UnknownParent {
                parent: hex::encode(template.parent_hash()),
            })?;

        let pruned = self.uncles.prune(&parent);
        if pruned > 0 {
            debug!(pruned, "[pow-miner] Dropped stale uncle candidates");
        }
        let uncles = self.uncles.headers();
        let check = check_uncles(&uncles, &parent, self.config.max_uncles);
        if let Err(e) = &check {
            error!(error = %e, "[pow-miner] Invariant violated");
        }
        debug_assert!(check.is_ok(), "invariant violated");
        template.set_uncles(uncles);

        let gas_pool = self.deps.chain.gas_limit(&parent);
        let processed = self
            .deps
            .state
            .process_transactions(
                self.coinbase,
                &mut template,
                &parent,
                gas_pool,
                self.txs.ordered(),
            )
            .await;

        if let Some(e) = &processed.error {
            debug!(error = %e, "[pow-miner] Transaction processing reported an error");
        }
        if !processed.failed.is_empty() {
            let hashes = processed.failed_hashes();
            if let Err(e) = self.deps.tx_source.remove_set(&hashes).await {
                warn!(error = %e, "[pow-miner] Failed to remove transactions from pool");
            }
            self.metrics.record_transactions_failed(hashes.len());
            info!(
                failed = hashes.len(),
                "[pow-miner] Dropped permanently failed transactions"
            );
        }

        let ProcessedTransactions { accepted, deferred, .. } = processed;
        self.txs = accepted
            .iter()
            .map(|(tx, _)| tx.clone())
            .chain(deferred)
            .collect();
        template.set_transactions(accepted);

        self.deps
            .state
            .accumulate_rewards(&mut template, &parent)
            .await?;
        template.finalize_state_root();
        Ok(template)
    }

    /// Seal, validate and announce a found block
    pub(super) async fn finalize(&mut self, round: u64, template: &BlockTemplate, nonce: u64) {
        let block = template.seal(nonce);
        let hash = block.hash();

        if let Err(e) = self.deps.state.process(&block).await {
            self.metrics.record_finalize_failure();
            warn!(
                round,
                block = %short_hash(&hash),
                error = %e,
                "[pow-miner] Mined block rejected"
            );
            return;
        }

        self.metrics.record_block_mined(block.transactions.len());
        info!(
            round,
            number = block.number(),
            block = %short_hash(&hash),
            txs = block.transactions.len(),
            uncles = block.uncles.len(),
            "[pow-miner] 🔨 Mined block"
        );

        if let Err(e) = self.deps.broadcaster.broadcast(&block).await {
            warn!(block = %short_hash(&hash), error = %e, "[pow-miner] Broadcast failed");
        }

        // A rival may already hold this height.
        let head = match self.deps.chain.current_head().await {
            Ok(head) => Some(head),
            Err(e) => {
                warn!(error = %e, "[pow-miner] Failed to read canonical head");
                None
            }
        };
        let canonical = head.as_ref().is_some_and(|head| head.hash() == hash);

        let remaining = self.txs.drain();
        let snapshot = match self.deps.tx_source.current_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "[pow-miner] Failed to refresh transactions from pool");
                Vec::new()
            }
        };
        self.txs = snapshot.into_iter().chain(remaining).collect();
        if !canonical {
            self.txs.extend(template.transactions.iter().cloned());
            info!(
                round,
                block = %short_hash(&hash),
                txs = template.transactions.len(),
                "[pow-miner] Mined block lost the head, keeping its transactions"
            );
        }

        if let Some(head) = &head {
            self.txs.remove_hashes(&head.transaction_hashes());
            let check = check_disjoint_from_block(&self.txs, head);
            if let Err(e) = &check {
                error!(error = %e, "[pow-miner] Invariant violated");
            }
            debug_assert!(check.is_ok(), "invariant violated");
        }

        self.deps.bus.publish(BlockchainEvent::NewBlock(block)).await;
    }
}
