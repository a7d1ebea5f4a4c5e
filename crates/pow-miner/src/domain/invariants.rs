//! Invariant checkers for the miner
//!
//! These functions state the properties that MUST hold between rounds.
//! The control loop asserts them in debug builds; tests call them directly.

use super::tx_set::TransactionSet;
use super::uncle_set::is_eligible_uncle;
use crate::error::{MinerError, Result};
use shared_types::{short_hash, Block, BlockHeader, Hash};
use std::collections::HashSet;

/// INVARIANT-1: Single Session
/// A new search may only start when no other search is live.
pub fn check_no_active_session(active_sessions: u64) -> Result<()> {
    if active_sessions != 0 {
        return Err(MinerError::Internal(format!(
            "{active_sessions} mining session(s) still live while starting another"
        )));
    }
    Ok(())
}

/// INVARIANT-2: Disjoint Set
/// No working transaction is included in the latest canonical block.
pub fn check_disjoint_from_block(txs: &TransactionSet, block: &Block) -> Result<()> {
    for hash in block.transaction_hashes() {
        if txs.contains(&hash) {
            return Err(MinerError::Internal(format!(
                "transaction {} is pending but already in block #{}",
                short_hash(&hash),
                block.number()
            )));
        }
    }
    Ok(())
}

/// INVARIANT-3: Sibling Uncles
/// Every uncle is a sibling of `head`, unique by hash, and within the cap.
pub fn check_uncles(uncles: &[BlockHeader], head: &Block, max: usize) -> Result<()> {
    if uncles.len() > max {
        return Err(MinerError::Internal(format!(
            "{} uncles exceed maximum {max}",
            uncles.len()
        )));
    }

    let mut seen: HashSet<Hash> = HashSet::new();
    for uncle in uncles {
        let hash = uncle.hash();
        if !seen.insert(hash) {
            return Err(MinerError::Internal(format!(
                "duplicate uncle {}",
                short_hash(&hash)
            )));
        }
        if !is_eligible_uncle(uncle, head) {
            return Err(MinerError::Internal(format!(
                "uncle {} is not a sibling of #{}",
                short_hash(&hash),
                head.number()
            )));
        }
    }
    Ok(())
}
