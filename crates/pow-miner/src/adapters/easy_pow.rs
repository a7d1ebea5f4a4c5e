//! EasyPow: SHA-256d nonce search
//!
//! The default engine. A header is sealed when
//! `sha256d(seal_hash || nonce) <= U256::MAX / difficulty`.

use crate::config::PowConfig;
use crate::domain::BlockTemplate;
use crate::ports::PowEngine;
use crate::session::CancelSignal;
use crate::utils::hashing::{meets_target, pow_hash, target_for};
use shared_types::BlockHeader;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Single-threaded CPU proof-of-work engine
#[derive(Debug)]
pub struct EasyPow {
    turbo: AtomicBool,
    check_interval: u64,
    throttle: Duration,
    hashes: AtomicU64,
}

impl EasyPow {
    /// Create an engine from configuration
    pub fn new(config: &PowConfig) -> Self {
        Self {
            turbo: AtomicBool::new(false),
            check_interval: config.check_interval.max(1),
            throttle: config.throttle(),
            hashes: AtomicU64::new(0),
        }
    }

    /// Total nonces tried across all searches
    pub fn hashes_tried(&self) -> u64 {
        self.hashes.load(Ordering::Relaxed)
    }
}

impl Default for EasyPow {
    fn default() -> Self {
        Self::new(&PowConfig::default())
    }
}

impl PowEngine for EasyPow {
    fn search(&self, template: &BlockTemplate, cancel: &CancelSignal) -> Option<u64> {
        let seal_hash = template.header.seal_hash();
        let target = target_for(template.header.difficulty);
        let start: u64 = rand::random();
        let mut nonce = start;
        let mut attempts: u64 = 0;

        loop {
            if attempts % self.check_interval == 0 {
                if cancel.is_cancelled() {
                    self.hashes.fetch_add(attempts, Ordering::Relaxed);
                    return None;
                }
                if attempts > 0 && !self.turbo.load(Ordering::Relaxed) {
                    std::thread::sleep(self.throttle);
                }
            }

            attempts += 1;
            if meets_target(&pow_hash(&seal_hash, nonce), target) {
                self.hashes.fetch_add(attempts, Ordering::Relaxed);
                debug!(
                    number = template.header.number,
                    nonce,
                    attempts,
                    "[pow-miner] EasyPow found nonce"
                );
                return Some(nonce);
            }

            nonce = nonce.wrapping_add(1);
            if nonce == start {
                self.hashes.fetch_add(attempts, Ordering::Relaxed);
                return None;
            }
        }
    }

    fn verify(&self, header: &BlockHeader) -> bool {
        meets_target(
            &pow_hash(&header.seal_hash(), header.nonce),
            target_for(header.difficulty),
        )
    }

    fn set_turbo(&self, on: bool) {
        self.turbo.store(on, Ordering::Relaxed);
    }

    fn turbo(&self) -> bool {
        self.turbo.load(Ordering::Relaxed)
    }

    fn name(&self) -> &'static str {
        "EasyPow"
    }
}
