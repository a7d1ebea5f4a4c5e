//! Configuration types for the miner

use crate::error::{MinerError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use shared_types::Address;
use std::time::Duration;

/// Runtime configuration for the miner
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    /// Address credited with block rewards (hex, optional `0x` prefix)
    #[serde(
        serialize_with = "serialize_address",
        deserialize_with = "deserialize_address"
    )]
    pub coinbase: Address,

    /// Maximum uncle candidates kept and referenced per block
    pub max_uncles: usize,

    /// Initial effort mode passed to the PoW engine
    pub turbo: bool,

    /// Delay before retrying a round that failed to assemble
    pub retry_delay_ms: u64,

    /// PoW engine tuning
    pub pow: PowConfig,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            coinbase: [0u8; 20],
            max_uncles: crate::MAX_UNCLES,
            turbo: false,
            retry_delay_ms: 1_000,
            pow: PowConfig::default(),
        }
    }
}

impl MinerConfig {
    /// Reject configurations the miner cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.max_uncles > crate::MAX_UNCLES {
            return Err(MinerError::InvalidConfig(format!(
                "max_uncles {} exceeds protocol maximum {}",
                self.max_uncles,
                crate::MAX_UNCLES
            )));
        }
        if self.pow.check_interval == 0 {
            return Err(MinerError::InvalidConfig(
                "pow.check_interval must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Retry delay as a [`Duration`]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// EasyPow configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowConfig {
    /// Nonce attempts between cancellation checks
    pub check_interval: u64,

    /// Sleep between check intervals when turbo is off (microseconds)
    pub throttle_micros: u64,
}

impl Default for PowConfig {
    fn default() -> Self {
        Self {
            check_interval: 10_000,
            throttle_micros: 20,
        }
    }
}

impl PowConfig {
    /// Throttle as a [`Duration`]
    pub fn throttle(&self) -> Duration {
        Duration::from_micros(self.throttle_micros)
    }
}

/// Parse a 20-byte address from hex (optional `0x` prefix)
pub fn parse_address(value: &str) -> Result<Address> {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(digits)
        .map_err(|e| MinerError::InvalidConfig(format!("coinbase {value:?}: {e}")))?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        MinerError::InvalidConfig(format!("coinbase must be 20 bytes, got {}", bytes.len()))
    })
}

fn serialize_address<S: Serializer>(
    address: &Address,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("0x{}", hex::encode(address)))
}

fn deserialize_address<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Address, D::Error> {
    let value = String::deserialize(deserializer)?;
    parse_address(&value).map_err(serde::de::Error::custom)
}
