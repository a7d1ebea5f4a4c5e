//! Domain layer - Pure business logic for the miner
//!
//! No I/O and no async here: the control loop owns these values and the
//! search worker only reads a frozen [`BlockTemplate`].
//!
//! ## Entities
//!
//! - [`BlockTemplate`]: the block under construction for one round
//! - [`ProcessedTransactions`]: accepted / deferred / failed partition
//! - [`MinerStatus`]: point-in-time view for callers
//!
//! ## Working Sets
//!
//! - [`TransactionSet`]: pending transactions, unique by hash, arrival order
//! - [`UncleSet`]: sibling candidates of the head, bounded, oldest evicted
//!
//! ## Invariants
//!
//! 1. At most one live search
//! 2. Working transactions are disjoint from the latest canonical block
//! 3. Uncles are unique siblings of the head within the cap

mod entities;
pub mod invariants;
pub mod tx_set;
pub mod uncle_set;

pub use entities::*;
pub use invariants::*;
pub use tx_set::{order_by_sender_nonce, TransactionSet};
pub use uncle_set::{is_eligible_uncle, UncleOutcome, UncleSet};
