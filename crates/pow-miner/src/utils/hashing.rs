//! Hashing utilities for the proof-of-work seal

use primitive_types::U256;
use sha2::{Digest, Sha256};
use shared_types::Hash;

/// Compute SHA-256 hash of data
#[inline]
pub fn sha256(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute double SHA-256 hash
#[inline]
pub fn sha256d(data: &[u8]) -> Hash {
    sha256(&sha256(data))
}

/// Convert hash bytes to U256 (big-endian)
#[inline]
pub fn bytes_to_u256(bytes: &Hash) -> U256 {
    U256::from_big_endian(bytes)
}

/// Seal digest: `sha256d(seal_hash || nonce)` with the nonce big-endian
pub fn pow_hash(seal_hash: &Hash, nonce: u64) -> Hash {
    let mut input = [0u8; 40];
    input[..32].copy_from_slice(seal_hash);
    input[32..].copy_from_slice(&nonce.to_be_bytes());
    sha256d(&input)
}

/// Target for a difficulty: `U256::MAX / difficulty` (zero treated as one)
pub fn target_for(difficulty: U256) -> U256 {
    U256::MAX / difficulty.max(U256::one())
}

/// Check if hash meets target
///
/// Returns true if hash <= target (higher difficulty = lower target)
#[inline]
pub fn meets_target(hash: &Hash, target: U256) -> bool {
    bytes_to_u256(hash) <= target
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256d_double_hash() {
        let data = b"test";
        assert_eq!(sha256d(data), sha256(&sha256(data)));
    }

    #[test]
    fn test_pow_hash_depends_on_nonce() {
        let seal = [3u8; 32];
        assert_ne!(pow_hash(&seal, 0), pow_hash(&seal, 1));
        assert_eq!(pow_hash(&seal, 7), pow_hash(&seal, 7));
    }

    #[test]
    fn test_target_for() {
        assert_eq!(target_for(U256::zero()), U256::MAX);
        assert_eq!(target_for(U256::one()), U256::MAX);
        assert_eq!(target_for(U256::from(2)), U256::MAX / 2);
    }

    #[test]
    fn test_meets_target() {
        // Hash with all zeros meets any target
        assert!(meets_target(&[0u8; 32], U256::zero()));

        // Hash with all ones only meets the maximum target
        let hard_hash = [0xFFu8; 32];
        assert!(meets_target(&hard_hash, U256::MAX));
        assert!(!meets_target(&hard_hash, U256::MAX - U256::one()));
    }
}
