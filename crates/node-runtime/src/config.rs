//! # Node Configuration
//!
//! Environment-driven configuration for the development node.
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `POW_COINBASE` | Reward address, 40 hex chars | all zero |
//! | `POW_TURBO` | Start in turbo mode | `false` |
//! | `POW_DIFFICULTY` | Genesis difficulty (decimal) | `1048576` |
//! | `POW_MAX_UNCLES` | Uncle candidates kept | `2` |
//! | `POW_LOG_LEVEL` | `EnvFilter` directive when `RUST_LOG` is unset | `info` |
//! | `POW_JSON_LOGS` | JSON log lines | `false` |
//! | `POW_BUS_CAPACITY` | Event bus buffer per subscriber | `1000` |
//!
//! Malformed values keep the default and produce a warning.

use pow_miner::{parse_address, MinerConfig};
use shared_types::U256;

/// Default genesis difficulty: about a second of CPU work per block.
pub const DEFAULT_DIFFICULTY: u64 = 1 << 20;

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Miner configuration (coinbase, turbo, uncles, engine tuning).
    pub miner: MinerConfig,
    /// Difficulty of the development genesis block.
    pub difficulty: U256,
    /// Log filter used when `RUST_LOG` is not set.
    pub log_level: String,
    /// Emit JSON log lines.
    pub json_logs: bool,
    /// Event bus capacity.
    pub bus_capacity: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            miner: MinerConfig::default(),
            difficulty: U256::from(DEFAULT_DIFFICULTY),
            log_level: "info".to_string(),
            json_logs: false,
            bus_capacity: shared_bus::DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl NodeConfig {
    /// Load from the process environment.
    ///
    /// Returns the configuration and one warning per rejected value; the
    /// caller logs them once tracing is installed.
    pub fn from_env() -> (Self, Vec<String>) {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> (Self, Vec<String>) {
        let mut config = Self::default();
        let mut warnings = Vec::new();

        if let Some(value) = lookup("POW_COINBASE") {
            match parse_address(&value) {
                Ok(address) => config.miner.coinbase = address,
                Err(e) => warnings.push(format!("POW_COINBASE ignored: {e}")),
            }
        }
        if let Some(value) = lookup("POW_TURBO") {
            match parse_flag(&value) {
                Some(on) => config.miner.turbo = on,
                None => warnings.push(format!("POW_TURBO ignored: {value:?} is not a boolean")),
            }
        }
        if let Some(value) = lookup("POW_DIFFICULTY") {
            match U256::from_dec_str(value.trim()) {
                Ok(d) if !d.is_zero() => config.difficulty = d,
                _ => warnings.push(format!(
                    "POW_DIFFICULTY ignored: {value:?} is not a positive integer"
                )),
            }
        }
        if let Some(value) = lookup("POW_MAX_UNCLES") {
            match value.trim().parse::<usize>() {
                Ok(n) if n <= pow_miner::MAX_UNCLES => config.miner.max_uncles = n,
                _ => warnings.push(format!(
                    "POW_MAX_UNCLES ignored: {value:?} is not in 0..={}",
                    pow_miner::MAX_UNCLES
                )),
            }
        }
        if let Some(value) = lookup("POW_LOG_LEVEL") {
            if value.trim().is_empty() {
                warnings.push("POW_LOG_LEVEL ignored: empty".to_string());
            } else {
                config.log_level = value;
            }
        }
        if let Some(value) = lookup("POW_JSON_LOGS") {
            match parse_flag(&value) {
                Some(on) => config.json_logs = on,
                None => warnings.push(format!("POW_JSON_LOGS ignored: {value:?} is not a boolean")),
            }
        }
        if let Some(value) = lookup("POW_BUS_CAPACITY") {
            match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.bus_capacity = n,
                _ => warnings.push(format!(
                    "POW_BUS_CAPACITY ignored: {value:?} is not a positive integer"
                )),
            }
        }

        (config, warnings)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
