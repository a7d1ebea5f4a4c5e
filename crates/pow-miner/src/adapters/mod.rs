//! Adapters for the outbound ports
//!
//! `EasyPow` is the production engine; the in-memory chain, pool and
//! broadcasters back the development node and the test suite.

pub mod broadcaster;
pub mod easy_pow;
pub mod memory_chain;
pub mod memory_pool;

pub use broadcaster::{LoggingBroadcaster, RecordingBroadcaster};
pub use easy_pow::EasyPow;
pub use memory_chain::{apply_rewards, apply_transactions, calc_gas_limit, MemoryChain};
pub use memory_pool::MemoryTxPool;
