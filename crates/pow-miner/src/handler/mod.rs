//! Control loop
//!
//! The single task that owns the working transaction set, the uncle set and
//! the active mining session. Stimuli arrive over the event bus and as stop
//! commands from the service; each one is handled to completion before the
//! next is accepted.
//!
//! - `events`: reactions to bus events and lag recovery
//! - `round`: template assembly, session launch, block finalization

mod events;
mod round;

use crate::config::MinerConfig;
use crate::domain::{TransactionSet, UncleSet};
use crate::events::MinerEvent;
use crate::metrics::Metrics;
use crate::ports::{BlockBroadcaster, ChainView, PowEngine, StateProcessor, TransactionSource};
use crate::session::{MiningSession, SessionOutcome};
use parking_lot::RwLock;
use shared_bus::{InMemoryEventBus, Subscription, SubscriptionError};
use shared_types::{Address, Hash, Transaction};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace, warn};

/// The miner's collaborators, shared between the service and its loop
#[derive(Clone)]
pub(crate) struct Collaborators {
    pub bus: Arc<InMemoryEventBus>,
    pub chain: Arc<dyn ChainView>,
    pub state: Arc<dyn StateProcessor>,
    pub tx_source: Arc<dyn TransactionSource>,
    pub pow: Arc<dyn PowEngine>,
    pub broadcaster: Arc<dyn BlockBroadcaster>,
}

/// What the loop publishes for status queries
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct LoopView {
    pub active: bool,
    pub pending_transactions: usize,
    pub uncle_candidates: usize,
    pub current_parent: Option<Hash>,
}

pub(crate) struct ControlLoop {
    coinbase: Address,
    config: MinerConfig,
    deps: Collaborators,
    metrics: Arc<Metrics>,
    txs: TransactionSet,
    uncles: UncleSet,
    session: Option<MiningSession>,
    round: u64,
    retry_at: Option<Instant>,
    view: Arc<RwLock<LoopView>>,
}

impl ControlLoop {
    pub(crate) fn new(
        coinbase: Address,
        config: MinerConfig,
        deps: Collaborators,
        metrics: Arc<Metrics>,
        seed: Vec<Transaction>,
        view: Arc<RwLock<LoopView>>,
    ) -> Self {
        let uncles = UncleSet::new(config.max_uncles);
        Self {
            coinbase,
            config,
            deps,
            metrics,
            txs: seed.into_iter().collect(),
            uncles,
            session: None,
            round: 0,
            retry_at: None,
            view,
        }
    }

    /// Run until stopped or the bus closes
    pub(crate) async fn run(
        mut self,
        mut subscription: Subscription,
        mut stop_rx: oneshot::Receiver<()>,
    ) {
        info!(pending = self.txs.len(), "[pow-miner] Control loop started");
        self.start_round().await;

        loop {
            tokio::select! {
                biased;

                // A dropped sender means the service is gone.
                _ = &mut stop_rx => break,

                _ = sleep_until(self.retry_at.unwrap_or_else(Instant::now)), if self.retry_at.is_some() => {
                    debug!(round = self.round, "[pow-miner] Retrying round");
                    self.start_round().await;
                }

                outcome = next_outcome(&mut self.session), if self.session.is_some() => {
                    self.session = None;
                    self.on_session_complete(outcome).await;
                }

                received = subscription.recv() => match received {
                    Ok(event) => match MinerEvent::try_from(event) {
                        Ok(event) => self.handle_event(event).await,
                        Err(other) => trace!(kind = other.kind(), "[pow-miner] Ignoring event"),
                    },
                    Err(SubscriptionError::Lagged(missed)) => self.resync(missed).await,
                    Err(SubscriptionError::Closed) => {
                        warn!("[pow-miner] Event bus closed, control loop exiting");
                        break;
                    }
                },
            }
        }

        self.cancel_session().await;
        subscription.unsubscribe();
        self.view.write().active = false;
        info!(round = self.round, "[pow-miner] Control loop stopped");
    }

    /// Cancel the live session, if any, and wait for its worker to exit
    async fn cancel_session(&mut self) {
        if let Some(session) = self.session.take() {
            let round = session.round();
            session.cancel_and_join().await;
            self.metrics.record_session_cancelled();
            debug!(round, "[pow-miner] Mining session cancelled");
        }
    }

    async fn on_session_complete(&mut self, outcome: SessionOutcome) {
        match outcome {
            SessionOutcome::Found {
                round,
                template,
                nonce,
            } => {
                self.finalize(round, &template, nonce).await;
                self.start_round().await;
            }
            SessionOutcome::Exhausted { round } => {
                warn!(round, "[pow-miner] Search ended without a nonce");
                self.schedule_retry();
            }
            SessionOutcome::Cancelled { round } => {
                // Only a failed worker ends up here; cancellations go through
                // cancel_session.
                warn!(round, "[pow-miner] Search aborted");
                self.schedule_retry();
            }
        }
    }

    fn schedule_retry(&mut self) {
        self.metrics.record_round_failure();
        self.retry_at = Some(Instant::now() + self.config.retry_delay());
        self.publish_view(None);
    }

    fn publish_view(&self, current_parent: Option<Hash>) {
        let mut view = self.view.write();
        view.pending_transactions = self.txs.len();
        view.uncle_candidates = self.uncles.len();
        view.current_parent = current_parent;
    }
}

/// Completion of the live session; pending forever when there is none
async fn next_outcome(session: &mut Option<MiningSession>) -> SessionOutcome {
    match session {
        Some(session) => session.wait().await,
        None => std::future::pending().await,
    }
}
