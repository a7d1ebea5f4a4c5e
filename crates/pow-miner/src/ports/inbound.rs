//! Inbound ports (driving side - API)

use crate::domain::MinerStatus;
use crate::error::Result;
use async_trait::async_trait;

/// Primary port: miner lifecycle control
#[async_trait]
pub trait MinerApi: Send + Sync {
    /// Seed the working set, subscribe, and begin round 1
    ///
    /// A no-op while running; fails with `Terminated` once stopped.
    async fn start(&self) -> Result<()>;

    /// Cancel the active search, unsubscribe, and stop for good
    ///
    /// Idempotent.
    async fn stop(&self) -> Result<()>;

    /// Flip the effort mode, returning the new value
    fn toggle_turbo(&self) -> bool;

    /// Current status
    async fn status(&self) -> MinerStatus;
}
