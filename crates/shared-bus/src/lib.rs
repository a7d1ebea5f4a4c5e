//! # Shared Bus - Event Bus for Intra-Node Communication
//!
//! Producers (sync layer, transaction pool, miner) publish
//! [`BlockchainEvent`]s; consumers subscribe with an [`EventFilter`] and
//! receive matching events in publication order.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │  Tx Pool /   │                    │    Miner     │
//! │  Sync layer  │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! ## Delivery
//!
//! - No de-duplication: the same block may be published more than once.
//! - A subscriber slower than the channel capacity observes
//!   [`SubscriptionError::Lagged`] and must re-synchronize from its source.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{BlockchainEvent, EventFilter, EventTopic};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before it lags.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
