//! Miner service
//!
//! Owns the lifecycle (Idle → Running → Stopped) and the handle of the
//! control loop task. All working state lives in the loop; the service only
//! reads the view the loop publishes.

use crate::adapters::EasyPow;
use crate::config::MinerConfig;
use crate::domain::{MinerState, MinerStatus};
use crate::error::{MinerError, Result};
use crate::handler::{Collaborators, ControlLoop, LoopView};
use crate::metrics::Metrics;
use crate::ports::{
    BlockBroadcaster, ChainView, MinerApi, PowEngine, StateProcessor, TransactionSource,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_bus::{BlockchainEvent, EventFilter, EventPublisher, EventTopic, InMemoryEventBus};
use shared_types::Address;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

enum Lifecycle {
    Idle,
    Running {
        stop_tx: oneshot::Sender<()>,
        handle: JoinHandle<()>,
    },
    Stopped,
}

/// Continuous proof-of-work block producer
pub struct Miner {
    coinbase: Address,
    config: MinerConfig,
    deps: Collaborators,
    metrics: Arc<Metrics>,
    turbo: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
    view: Arc<RwLock<LoopView>>,
}

impl Miner {
    /// Start building a miner
    pub fn builder() -> MinerBuilder {
        MinerBuilder::default()
    }

    /// The proof-of-work engine
    pub fn pow(&self) -> Arc<dyn PowEngine> {
        Arc::clone(&self.deps.pow)
    }

    /// Shared metrics
    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Reward address
    pub fn coinbase(&self) -> Address {
        self.coinbase
    }

    /// Active configuration
    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    /// Whether the control loop is running
    pub fn is_running(&self) -> bool {
        self.view.read().active
    }
}

#[async_trait]
impl MinerApi for Miner {
    async fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        match &*lifecycle {
            Lifecycle::Running { .. } => {
                info!("[pow-miner] Miner already running");
                return Ok(());
            }
            Lifecycle::Stopped => return Err(MinerError::Terminated),
            Lifecycle::Idle => {}
        }

        let subscription = self
            .deps
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Chain, EventTopic::TxPool]));
        let seed = match self.deps.tx_source.flush_all().await {
            Ok(txs) => txs,
            Err(e) => {
                warn!(error = %e, "[pow-miner] Failed to flush pool, starting empty");
                Vec::new()
            }
        };

        info!(
            coinbase = %hex::encode(self.coinbase),
            engine = self.deps.pow.name(),
            turbo = self.turbo.load(Ordering::SeqCst),
            seeded = seed.len(),
            "[pow-miner] Starting miner"
        );

        self.view.write().active = true;
        let control = ControlLoop::new(
            self.coinbase,
            self.config.clone(),
            self.deps.clone(),
            Arc::clone(&self.metrics),
            seed,
            Arc::clone(&self.view),
        );
        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(control.run(subscription, stop_rx));
        *lifecycle = Lifecycle::Running { stop_tx, handle };
        drop(lifecycle);

        self.deps
            .bus
            .publish(BlockchainEvent::MinerStarted {
                coinbase: self.coinbase,
            })
            .await;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        let (stop_tx, handle) = match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Running { stop_tx, handle } => (stop_tx, handle),
            Lifecycle::Idle => {
                *lifecycle = Lifecycle::Idle;
                debug!("[pow-miner] Stop requested before start");
                return Ok(());
            }
            Lifecycle::Stopped => return Ok(()),
        };

        // The loop may already have exited on its own.
        let _ = stop_tx.send(());
        if let Err(e) = handle.await {
            error!(error = %e, "[pow-miner] Control loop failed");
        }
        self.view.write().active = false;
        drop(lifecycle);

        self.deps
            .bus
            .publish(BlockchainEvent::MinerStopped {
                coinbase: self.coinbase,
            })
            .await;
        info!(
            blocks_mined = self.metrics.get_blocks_mined(),
            "[pow-miner] Miner stopped"
        );
        Ok(())
    }

    fn toggle_turbo(&self) -> bool {
        let on = !self.turbo.fetch_xor(true, Ordering::SeqCst);
        self.deps.pow.set_turbo(on);
        info!(turbo = on, "[pow-miner] Turbo toggled");
        on
    }

    async fn status(&self) -> MinerStatus {
        let view = self.view.read().clone();
        MinerStatus {
            state: if view.active {
                MinerState::Running
            } else {
                MinerState::Stopped
            },
            coinbase: self.coinbase,
            turbo: self.turbo.load(Ordering::SeqCst),
            rounds_started: self.metrics.get_rounds_started(),
            blocks_mined: self.metrics.get_blocks_mined(),
            pending_transactions: view.pending_transactions,
            uncle_candidates: view.uncle_candidates,
            current_parent: view.current_parent,
        }
    }
}

impl Drop for Miner {
    fn drop(&mut self) {
        if let Lifecycle::Running { stop_tx, .. } =
            std::mem::replace(self.lifecycle.get_mut(), Lifecycle::Stopped)
        {
            let _ = stop_tx.send(());
        }
    }
}

/// Builder for [`Miner`]
#[derive(Default)]
pub struct MinerBuilder {
    coinbase: Option<Address>,
    config: Option<MinerConfig>,
    event_bus: Option<Arc<InMemoryEventBus>>,
    chain: Option<Arc<dyn ChainView>>,
    state: Option<Arc<dyn StateProcessor>>,
    tx_source: Option<Arc<dyn TransactionSource>>,
    pow: Option<Arc<dyn PowEngine>>,
    broadcaster: Option<Arc<dyn BlockBroadcaster>>,
    default_pow: bool,
}

impl MinerBuilder {
    /// Reward address (overrides `config.coinbase`)
    pub fn coinbase(mut self, coinbase: Address) -> Self {
        self.coinbase = Some(coinbase);
        self
    }

    /// Miner configuration
    pub fn config(mut self, config: MinerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Event bus to subscribe and publish on
    pub fn event_bus(mut self, bus: Arc<InMemoryEventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Chain view
    pub fn chain(mut self, chain: Arc<dyn ChainView>) -> Self {
        self.chain = Some(chain);
        self
    }

    /// State processor
    pub fn state(mut self, state: Arc<dyn StateProcessor>) -> Self {
        self.state = Some(state);
        self
    }

    /// Transaction source
    pub fn tx_source(mut self, tx_source: Arc<dyn TransactionSource>) -> Self {
        self.tx_source = Some(tx_source);
        self
    }

    /// Proof-of-work engine
    pub fn pow(mut self, pow: Arc<dyn PowEngine>) -> Self {
        self.pow = Some(pow);
        self
    }

    /// Use an [`EasyPow`] engine built from `config.pow` unless one is set
    pub fn with_default_pow(mut self) -> Self {
        self.default_pow = true;
        self
    }

    /// Network broadcaster
    pub fn broadcaster(mut self, broadcaster: Arc<dyn BlockBroadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    /// Validate the wiring and build the miner
    pub fn build(self) -> Result<Miner> {
        let mut config = self.config.unwrap_or_default();
        config.validate()?;
        if let Some(coinbase) = self.coinbase {
            config.coinbase = coinbase;
        }

        let pow = match (self.pow, self.default_pow) {
            (Some(pow), _) => pow,
            (None, true) => Arc::new(EasyPow::new(&config.pow)) as Arc<dyn PowEngine>,
            (None, false) => return Err(MinerError::MissingCollaborator("pow")),
        };
        let deps = Collaborators {
            bus: self
                .event_bus
                .ok_or(MinerError::MissingCollaborator("event_bus"))?,
            chain: self.chain.ok_or(MinerError::MissingCollaborator("chain"))?,
            state: self.state.ok_or(MinerError::MissingCollaborator("state"))?,
            tx_source: self
                .tx_source
                .ok_or(MinerError::MissingCollaborator("tx_source"))?,
            pow,
            broadcaster: self
                .broadcaster
                .ok_or(MinerError::MissingCollaborator("broadcaster"))?,
        };

        deps.pow.set_turbo(config.turbo);
        info!(
            coinbase = %hex::encode(config.coinbase),
            max_uncles = config.max_uncles,
            engine = deps.pow.name(),
            "[pow-miner] Miner configured"
        );

        Ok(Miner {
            coinbase: config.coinbase,
            turbo: AtomicBool::new(config.turbo),
            config,
            deps,
            metrics: Arc::new(Metrics::new()),
            lifecycle: Mutex::new(Lifecycle::Idle),
            view: Arc::new(RwLock::new(LoopView::default())),
        })
    }
}
