//! # Powchain Dev Node
//!
//! Mines on an in-memory chain until Ctrl+C.
//!
//! ```bash
//! POW_COINBASE=0x0101010101010101010101010101010101010101 \
//! POW_DIFFICULTY=65536 \
//! cargo run -p node-runtime
//! ```

use anyhow::{Context, Result};
use node_runtime::{telemetry, DevNode, NodeConfig};
use pow_miner::MinerApi;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let (config, warnings) = NodeConfig::from_env();
    telemetry::init_tracing(&config.log_level, config.json_logs)?;
    for warning in &warnings {
        warn!("{warning}");
    }

    info!("===========================================");
    info!("  Powchain Dev Node v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let node = DevNode::new(&config).context("failed to build dev node")?;
    let logger = node.spawn_event_logger();

    node.miner.start().await.context("failed to start miner")?;
    info!("Mining. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    node.miner.stop().await.context("failed to stop miner")?;
    let status = node.miner.status().await;
    info!(
        blocks_mined = status.blocks_mined,
        rounds = status.rounds_started,
        "Node stopped"
    );
    logger.abort();
    Ok(())
}
