//! # Node Runtime
//!
//! Development node hosting the proof-of-work miner.
//!
//! - `config`: `POW_*` environment configuration
//! - `telemetry`: tracing subscriber setup
//! - `node`: collaborator wiring and event logging

pub mod config;
pub mod node;
pub mod telemetry;

pub use config::NodeConfig;
pub use node::DevNode;
