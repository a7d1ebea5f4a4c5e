//! Error types for the miner

use shared_types::StateError;
use thiserror::Error;

/// Result type alias for miner operations
pub type Result<T> = std::result::Result<T, MinerError>;

/// Errors that can occur while producing blocks
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MinerError {
    /// A required collaborator was not wired into the builder
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The miner was stopped and cannot be restarted
    #[error("Miner has been stopped")]
    Terminated,

    /// Chain view failure
    #[error("Chain error: {0}")]
    Chain(String),

    /// State processing failure
    #[error("State error: {0}")]
    State(String),

    /// Transaction source failure
    #[error("Transaction pool error: {0}")]
    TxPool(String),

    /// Block broadcast failure
    #[error("Broadcast error: {0}")]
    Broadcast(String),

    /// The parent of a template or block is not known
    #[error("Unknown parent block {parent}")]
    UnknownParent {
        /// Hex-encoded parent hash
        parent: String,
    },

    /// A sealed block was rejected
    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    /// A transaction cannot be applied
    #[error("Invalid transaction {tx}: {reason}")]
    InvalidTransaction {
        /// Hex-encoded transaction hash
        tx: String,
        /// Rejection reason
        reason: String,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MinerError {
    /// Check if error is recoverable (the next round may succeed)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Chain(_)
                | Self::State(_)
                | Self::TxPool(_)
                | Self::Broadcast(_)
                | Self::UnknownParent { .. }
                | Self::InvalidBlock(_)
                | Self::InvalidTransaction { .. }
        )
    }

    /// Check if error is critical (the miner refuses to start)
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Self::MissingCollaborator(_) | Self::InvalidConfig(_) | Self::Terminated
        )
    }
}

impl From<StateError> for MinerError {
    fn from(err: StateError) -> Self {
        Self::State(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use primitive_types::U256;

    #[test]
    fn test_error_recoverability() {
        assert!(MinerError::Chain("db busy".into()).is_recoverable());
        assert!(MinerError::InvalidBlock("bad root".into()).is_recoverable());
        assert!(!MinerError::MissingCollaborator("chain").is_recoverable());
        assert!(!MinerError::Internal("bug".into()).is_recoverable());
    }

    #[test]
    fn test_error_criticality() {
        assert!(MinerError::MissingCollaborator("pow").is_critical());
        assert!(MinerError::Terminated.is_critical());
        assert!(!MinerError::TxPool("closed".into()).is_critical());
    }

    #[test]
    fn test_state_error_conversion() {
        let err: MinerError = StateError::InsufficientBalance {
            address: "ab".into(),
            balance: U256::from(1),
            required: U256::from(2),
        }
        .into();
        assert!(matches!(err, MinerError::State(_)));
        assert!(err.is_recoverable());
    }
}
