//! # Powchain - Proof-of-Work Miner
//!
//! **Bounded Context:** Block Production & Mining
//! **Architecture:** Hexagonal (ports/adapters) + event-driven control loop
//!
//! ## Purpose
//!
//! The Miner keeps a candidate block on top of the canonical head and
//! searches for a proof-of-work nonce for it, continuously:
//! - New canonical blocks remove their transactions from the working set
//! - Late sibling blocks become uncle candidates
//! - New pending transactions join the working set
//! - Every change cancels the running search, waits for it to exit, and
//!   restarts on a freshly assembled template
//!
//! ## Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  Adapters (Outer)                                   │
//! │  - EasyPow: SHA-256d nonce search                   │
//! │  - MemoryChain / MemoryTxPool: dev collaborators    │
//! │  - Logging / Recording broadcasters                 │
//! └─────────────────────────────────────────────────────┘
//!                         │
//! ┌─────────────────────────────────────────────────────┐
//! │  Ports (Middle)                                     │
//! │  - Inbound: MinerApi                                │
//! │  - Outbound: ChainView, StateProcessor,             │
//! │    TransactionSource, PowEngine, BlockBroadcaster   │
//! └─────────────────────────────────────────────────────┘
//!                         │
//! ┌─────────────────────────────────────────────────────┐
//! │  Domain (Inner - Pure Logic)                        │
//! │  - BlockTemplate, TransactionSet, UncleSet          │
//! │  - Invariants: single session, disjoint tx set,     │
//! │    sibling-only uncles                              │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Control Flow
//!
//! ```text
//! Event Bus ──► handle_event ──► cancel + join session ──► mutate sets
//!                                                             │
//!        next round ◄── publish NewBlock ◄── process ◄── search ◄── assemble
//! ```
//!
//! ## Critical Invariants
//!
//! 1. **Single Session**: at most one nonce search runs per Miner
//! 2. **Join Before Mutate**: the working sets change only after the previous
//!    search acknowledged its cancellation
//! 3. **Disjoint Set**: no working transaction is in the latest canonical block
//! 4. **Sibling Uncles**: uncle candidates share the head's parent, capped at
//!    [`MAX_UNCLES`]
//! 5. **Fresh Templates**: a search always runs on a template rebuilt from the
//!    current sets
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! let miner = Miner::builder()
//!     .coinbase(coinbase)
//!     .event_bus(bus.clone())
//!     .chain(chain.clone())
//!     .state(chain.clone())
//!     .tx_source(pool.clone())
//!     .broadcaster(Arc::new(LoggingBroadcaster))
//!     .with_default_pow()
//!     .build()?;
//!
//! miner.start().await?;
//! // ...
//! miner.stop().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Proof-of-work engine and in-memory collaborators
pub mod adapters;
/// Domain models and business logic
pub mod domain;
pub mod events;
mod handler;
pub mod ports;
pub mod service;
pub mod session;
pub mod utils;

mod config;
mod error;
mod metrics;

pub use config::{parse_address, MinerConfig, PowConfig};
pub use error::{MinerError, Result};
pub use metrics::Metrics;

pub use domain::{
    BlockTemplate, MinerState, MinerStatus, ProcessedTransactions, TransactionSet, UncleOutcome,
    UncleSet,
};

pub use events::MinerEvent;

pub use ports::{
    BlockBroadcaster, ChainView, MinerApi, PowEngine, StateProcessor, TransactionSource,
};

pub use adapters::{EasyPow, LoggingBroadcaster, MemoryChain, MemoryTxPool, RecordingBroadcaster};

pub use session::{CancelSignal, MiningSession, SessionOutcome};

pub use service::{Miner, MinerBuilder};

/// Protocol maximum for uncles referenced by one block
pub const MAX_UNCLES: usize = 2;

/// Base reward credited to the coinbase of every block (1.5 ether in wei)
pub const BLOCK_REWARD: u64 = 1_500_000_000_000_000_000;

/// Gas charged for a plain value transfer
pub const INTRINSIC_GAS: u64 = 21_000;

/// Lower bound for a block's gas limit
pub const MIN_GAS_LIMIT: u64 = 125_000;

/// Gas limit of a development genesis block
pub const DEFAULT_GAS_LIMIT: u64 = 1_000_000;

/// Extra data stamped into mined headers
pub const EXTRA_DATA: &[u8] = b"powchain-miner";
