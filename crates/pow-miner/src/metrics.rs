//! Metrics collection for the miner

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for the miner
#[derive(Debug, Default)]
pub struct Metrics {
    /// Rounds that reached the search phase
    pub rounds_started: AtomicU64,

    /// Blocks sealed and accepted by the state processor
    pub blocks_mined: AtomicU64,

    /// Transactions included in mined blocks
    pub transactions_mined: AtomicU64,

    /// Sessions cancelled by a superseding event
    pub sessions_cancelled: AtomicU64,

    /// Rounds that failed before or during the search
    pub round_failures: AtomicU64,

    /// Sealed blocks rejected by the state processor
    pub finalize_failures: AtomicU64,

    /// Transactions dropped as permanently failed
    pub transactions_failed: AtomicU64,

    /// Live search workers
    active_sessions: AtomicU64,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a round entering the search phase
    pub fn record_round_started(&self) {
        self.rounds_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a mined block
    pub fn record_block_mined(&self, tx_count: usize) {
        self.blocks_mined.fetch_add(1, Ordering::Relaxed);
        self.transactions_mined
            .fetch_add(tx_count as u64, Ordering::Relaxed);
    }

    /// Record a cancelled session
    pub fn record_session_cancelled(&self) {
        self.sessions_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed round
    pub fn record_round_failure(&self) {
        self.round_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected sealed block
    pub fn record_finalize_failure(&self) {
        self.finalize_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record permanently failed transactions
    pub fn record_transactions_failed(&self, count: usize) {
        self.transactions_failed
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Mark a search worker as live, returning the previous live count
    pub(crate) fn session_entered(&self) -> u64 {
        self.active_sessions.fetch_add(1, Ordering::SeqCst)
    }

    /// Mark a search worker as exited
    pub(crate) fn session_exited(&self) {
        self.active_sessions.fetch_sub(1, Ordering::SeqCst);
    }

    /// Number of live search workers
    pub fn active_sessions(&self) -> u64 {
        self.active_sessions.load(Ordering::SeqCst)
    }

    /// Get rounds started
    pub fn get_rounds_started(&self) -> u64 {
        self.rounds_started.load(Ordering::Relaxed)
    }

    /// Get blocks mined
    pub fn get_blocks_mined(&self) -> u64 {
        self.blocks_mined.load(Ordering::Relaxed)
    }

    /// Get cancelled sessions
    pub fn get_sessions_cancelled(&self) -> u64 {
        self.sessions_cancelled.load(Ordering::Relaxed)
    }

    /// Get failed rounds
    pub fn get_round_failures(&self) -> u64 {
        self.round_failures.load(Ordering::Relaxed)
    }

    /// Get rejected sealed blocks
    pub fn get_finalize_failures(&self) -> u64 {
        self.finalize_failures.load(Ordering::Relaxed)
    }

    /// Get permanently failed transactions
    pub fn get_transactions_failed(&self) -> u64 {
        self.transactions_failed.load(Ordering::Relaxed)
    }

    /// Get average transactions per mined block
    pub fn get_avg_transactions_per_block(&self) -> f64 {
        let blocks = self.blocks_mined.load(Ordering::Relaxed);
        if blocks == 0 {
            return 0.0;
        }
        let txs = self.transactions_mined.load(Ordering::Relaxed);
        txs as f64 / blocks as f64
    }
}
