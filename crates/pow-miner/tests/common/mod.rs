//! Shared fixtures for the miner integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use pow_miner::{
    BlockTemplate, CancelSignal, ChainView, MemoryChain, MemoryTxPool, Miner, MinerConfig,
    MinerError, PowEngine, ProcessedTransactions, RecordingBroadcaster, Result, StateProcessor,
};
use shared_bus::InMemoryEventBus;
use shared_types::{Address, Block, BlockHeader, Hash, Transaction, U256};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const ALICE: Address = [0xa1; 20];
pub const BOB: Address = [0xb0; 20];
pub const BROKE: Address = [0xde; 20];
pub const COINBASE: Address = [0xc0; 20];
pub const RIVAL: Address = [0xc1; 20];

// =============================================================================
// SCRIPTED ENGINE
// =============================================================================

/// Proof-of-work engine driven by the test
///
/// Each search returns the next queued nonce, or spins until cancelled when
/// the queue is empty. Every searched template is recorded.
#[derive(Default)]
pub struct ScriptedPow {
    nonces: Mutex<VecDeque<u64>>,
    searched: Mutex<Vec<BlockTemplate>>,
    exhausting: AtomicU64,
    cancelled: AtomicU64,
    turbo: AtomicBool,
}

impl ScriptedPow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let a future (or the running) search succeed with `nonce`
    pub fn release(&self, nonce: u64) {
        self.nonces.lock().push_back(nonce);
    }

    /// Make the next `n` searches give up without a nonce
    pub fn exhaust(&self, n: u64) {
        self.exhausting.store(n, Ordering::SeqCst);
    }

    pub fn searches(&self) -> Vec<BlockTemplate> {
        self.searched.lock().clone()
    }

    pub fn search_count(&self) -> usize {
        self.searched.lock().len()
    }

    pub fn last_search(&self) -> Option<BlockTemplate> {
        self.searched.lock().last().cloned()
    }

    /// Searches that ended through cancellation
    pub fn cancelled(&self) -> u64 {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl PowEngine for ScriptedPow {
    fn search(&self, template: &BlockTemplate, cancel: &CancelSignal) -> Option<u64> {
        self.searched.lock().push(template.clone());
        if take_one(&self.exhausting) {
            return None;
        }
        loop {
            if cancel.is_cancelled() {
                self.cancelled.fetch_add(1, Ordering::SeqCst);
                return None;
            }
            if let Some(nonce) = self.nonces.lock().pop_front() {
                return Some(nonce);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn verify(&self, _header: &BlockHeader) -> bool {
        true
    }

    fn set_turbo(&self, on: bool) {
        self.turbo.store(on, Ordering::SeqCst);
    }

    fn turbo(&self) -> bool {
        self.turbo.load(Ordering::SeqCst)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

// =============================================================================
// FAULT INJECTION
// =============================================================================

/// Memory chain whose next template builds or block imports can be made to fail
pub struct FlakyChain {
    inner: Arc<MemoryChain>,
    failing_templates: AtomicU64,
    failing_imports: AtomicU64,
    template_calls: AtomicU64,
}

impl FlakyChain {
    pub fn new(inner: Arc<MemoryChain>) -> Self {
        Self {
            inner,
            failing_templates: AtomicU64::new(0),
            failing_imports: AtomicU64::new(0),
            template_calls: AtomicU64::new(0),
        }
    }

    /// Fail the next `n` calls to `new_template`
    pub fn fail_templates(&self, n: u64) {
        self.failing_templates.store(n, Ordering::SeqCst);
    }

    /// Reject the next `n` sealed blocks in `process`
    pub fn fail_imports(&self, n: u64) {
        self.failing_imports.store(n, Ordering::SeqCst);
    }

    pub fn template_calls(&self) -> u64 {
        self.template_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainView for FlakyChain {
    async fn current_head(&self) -> Result<Block> {
        self.inner.current_head().await
    }

    async fn new_template(&self, coinbase: Address) -> Result<BlockTemplate> {
        self.template_calls.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.failing_templates) {
            return Err(MinerError::Chain("head unavailable".to_string()));
        }
        self.inner.new_template(coinbase).await
    }

    async fn get_block(&self, hash: &Hash) -> Result<Option<Block>> {
        self.inner.get_block(hash).await
    }

    fn gas_limit(&self, parent: &Block) -> u64 {
        self.inner.gas_limit(parent)
    }
}

#[async_trait]
impl StateProcessor for FlakyChain {
    async fn process_transactions(
        &self,
        coinbase: Address,
        template: &mut BlockTemplate,
        parent: &Block,
        gas_pool: u64,
        txs: Vec<Transaction>,
    ) -> ProcessedTransactions {
        self.inner
            .process_transactions(coinbase, template, parent, gas_pool, txs)
            .await
    }

    async fn accumulate_rewards(&self, template: &mut BlockTemplate, parent: &Block) -> Result<()> {
        self.inner.accumulate_rewards(template, parent).await
    }

    async fn process(&self, block: &Block) -> Result<()> {
        if take_one(&self.failing_imports) {
            return Err(MinerError::InvalidBlock("state root mismatch".to_string()));
        }
        self.inner.process(block).await
    }
}

// =============================================================================
// HARNESS
// =============================================================================

/// A miner wired to in-memory collaborators
pub struct Harness {
    pub bus: Arc<InMemoryEventBus>,
    pub chain: Arc<MemoryChain>,
    pub flaky: Arc<FlakyChain>,
    pub pool: Arc<MemoryTxPool>,
    pub pow: Arc<ScriptedPow>,
    pub broadcaster: Arc<RecordingBroadcaster>,
    pub miner: Miner,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_bus_capacity(shared_bus::DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_bus_capacity(capacity: usize) -> Self {
        Self::build(capacity, 20)
    }

    pub fn with_retry_delay(retry_delay_ms: u64) -> Self {
        Self::build(shared_bus::DEFAULT_CHANNEL_CAPACITY, retry_delay_ms)
    }

    fn build(capacity: usize, retry_delay_ms: u64) -> Self {
        let bus = Arc::new(InMemoryEventBus::with_capacity(capacity));
        let pow = Arc::new(ScriptedPow::new());
        let chain = Arc::new(MemoryChain::with_balances(
            [(ALICE, U256::from(10u64).pow(U256::from(20)))],
            U256::one(),
            pow.clone(),
        ));
        let flaky = Arc::new(FlakyChain::new(chain.clone()));
        let pool = Arc::new(MemoryTxPool::with_event_bus(bus.clone()));
        let broadcaster = Arc::new(RecordingBroadcaster::new());

        let config = MinerConfig {
            retry_delay_ms,
            ..Default::default()
        };
        let miner = Miner::builder()
            .coinbase(COINBASE)
            .config(config)
            .event_bus(bus.clone())
            .chain(flaky.clone())
            .state(flaky.clone())
            .tx_source(pool.clone())
            .pow(pow.clone())
            .broadcaster(broadcaster.clone())
            .build()
            .expect("miner wiring");

        Self {
            bus,
            chain,
            flaky,
            pool,
            pow,
            broadcaster,
            miner,
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Decrement `counter` if positive; true when it was
fn take_one(counter: &AtomicU64) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

pub fn transfer(from: Address, nonce: u64) -> Transaction {
    Transaction {
        from,
        to: Some(BOB),
        value: U256::from(1_000),
        nonce,
        gas_price: U256::one(),
        gas_limit: 21_000,
        data: Vec::new(),
    }
}

/// Assemble a sealed block on the chain's current head, as another node would
pub async fn build_block(
    chain: &MemoryChain,
    coinbase: Address,
    txs: Vec<Transaction>,
    extra: &[u8],
) -> Block {
    let mut template = chain.new_template(coinbase).await.expect("template");
    template.header.extra_data = extra.to_vec();
    let parent = chain
        .get_block(&template.parent_hash())
        .await
        .expect("lookup")
        .expect("parent");
    let gas_pool = chain.gas_limit(&parent);
    let processed = chain
        .process_transactions(coinbase, &mut template, &parent, gas_pool, txs)
        .await;
    template.set_transactions(processed.accepted);
    chain
        .accumulate_rewards(&mut template, &parent)
        .await
        .expect("rewards");
    template.finalize_state_root();
    template.seal(0)
}

/// Poll `condition` until it holds, failing the test after a few seconds
pub async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let polled = tokio::time::timeout(Duration::from_secs(10), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "timed out waiting for {what}");
}
