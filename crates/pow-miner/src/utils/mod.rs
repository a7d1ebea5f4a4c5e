//! Utility modules for the miner

pub mod hashing;

pub use hashing::{bytes_to_u256, meets_target, pow_hash, sha256, sha256d, target_for};
