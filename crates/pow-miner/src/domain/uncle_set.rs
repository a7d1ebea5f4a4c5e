//! Uncle candidates
//!
//! Sibling blocks of the current head, referenced by the next block for a
//! partial reward.

use shared_types::{Block, BlockHeader, Hash};
use std::collections::VecDeque;

/// Whether `candidate` is a true sibling of `head`
///
/// Siblings share the head's parent and are not the head itself.
pub fn is_eligible_uncle(candidate: &BlockHeader, head: &Block) -> bool {
    candidate.parent_hash == head.parent_hash() && candidate.hash() != head.hash()
}

/// Result of offering a block to the uncle set
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UncleOutcome {
    /// Added; the oldest candidate was evicted if the set was full
    Inserted {
        /// Hash of the evicted candidate
        evicted: Option<Hash>,
    },
    /// Already a candidate
    Duplicate,
    /// Not a sibling of the head (or the set holds no uncles at all)
    Ineligible,
}

/// Bounded, hash-unique set of uncle candidates, oldest first
#[derive(Clone, Debug)]
pub struct UncleSet {
    max: usize,
    candidates: VecDeque<BlockHeader>,
}

impl UncleSet {
    /// Create an empty set holding at most `max` candidates
    pub fn new(max: usize) -> Self {
        Self {
            max,
            candidates: VecDeque::with_capacity(max),
        }
    }

    /// Number of candidates
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Whether a candidate with this hash is present
    pub fn contains(&self, hash: &Hash) -> bool {
        self.candidates.iter().any(|c| &c.hash() == hash)
    }

    /// Offer a block header as an uncle of `head`
    pub fn insert(&mut self, candidate: BlockHeader, head: &Block) -> UncleOutcome {
        if self.max == 0 || !is_eligible_uncle(&candidate, head) {
            return UncleOutcome::Ineligible;
        }
        if self.contains(&candidate.hash()) {
            return UncleOutcome::Duplicate;
        }

        let evicted = if self.candidates.len() >= self.max {
            self.candidates.pop_front().map(|old| old.hash())
        } else {
            None
        };
        self.candidates.push_back(candidate);
        UncleOutcome::Inserted { evicted }
    }

    /// Drop candidates that are not siblings of `head`, returning how many
    pub fn prune(&mut self, head: &Block) -> usize {
        let before = self.candidates.len();
        self.candidates.retain(|c| is_eligible_uncle(c, head));
        before - self.candidates.len()
    }

    /// Candidate headers, oldest first
    pub fn headers(&self) -> Vec<BlockHeader> {
        self.candidates.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(parent: Hash, number: u64, extra: u8) -> Block {
        Block {
            header: BlockHeader {
                parent_hash: parent,
                number,
                extra_data: vec![extra],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_sibling_is_eligible() {
        let head = block([1u8; 32], 5, 0);
        let sibling = block([1u8; 32], 5, 1);
        let cousin = block([2u8; 32], 5, 2);

        assert!(is_eligible_uncle(&sibling.header, &head));
        assert!(!is_eligible_uncle(&cousin.header, &head));
        assert!(!is_eligible_uncle(&head.header, &head));
    }

    #[test]
    fn test_insert_dedupes() {
        let head = block([1u8; 32], 5, 0);
        let mut uncles = UncleSet::new(2);

        let sibling = block([1u8; 32], 5, 1).header;
        assert_eq!(
            uncles.insert(sibling.clone(), &head),
            UncleOutcome::Inserted { evicted: None }
        );
        assert_eq!(uncles.insert(sibling, &head), UncleOutcome::Duplicate);
        assert_eq!(uncles.len(), 1);
    }

    #[test]
    fn test_insert_evicts_oldest() {
        let head = block([1u8; 32], 5, 0);
        let mut uncles = UncleSet::new(2);
        let first = block([1u8; 32], 5, 1).header;

        uncles.insert(first.clone(), &head);
        uncles.insert(block([1u8; 32], 5, 2).header, &head);
        let outcome = uncles.insert(block([1u8; 32], 5, 3).header, &head);

        assert_eq!(
            outcome,
            UncleOutcome::Inserted {
                evicted: Some(first.hash())
            }
        );
        assert_eq!(uncles.len(), 2);
        assert!(!uncles.contains(&first.hash()));
    }

    #[test]
    fn test_insert_rejects_non_siblings() {
        let head = block([1u8; 32], 5, 0);
        let mut uncles = UncleSet::new(2);

        let outcome = uncles.insert(block([9u8; 32], 5, 1).header, &head);
        assert_eq!(outcome, UncleOutcome::Ineligible);
        assert!(uncles.is_empty());
    }

    #[test]
    fn test_zero_capacity_holds_nothing() {
        let head = block([1u8; 32], 5, 0);
        let mut uncles = UncleSet::new(0);
        assert_eq!(
            uncles.insert(block([1u8; 32], 5, 1).header, &head),
            UncleOutcome::Ineligible
        );
    }

    #[test]
    fn test_prune_on_head_advance() {
        let old_head = block([1u8; 32], 5, 0);
        let mut uncles = UncleSet::new(2);
        uncles.insert(block([1u8; 32], 5, 1).header, &old_head);

        let new_head = block(old_head.hash(), 6, 0);
        assert_eq!(uncles.prune(&new_head), 1);
        assert!(uncles.is_empty());
    }
}
