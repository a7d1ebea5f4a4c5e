//! # Error Types
//!
//! Errors raised by the shared entities themselves.

use primitive_types::U256;
use thiserror::Error;

/// Errors from state mutation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    /// Balance too low for a debit.
    #[error("Insufficient balance for {address}: have {balance}, need {required}")]
    InsufficientBalance {
        /// Hex-encoded account address.
        address: String,
        /// Current balance.
        balance: U256,
        /// Amount requested.
        required: U256,
    },
}
