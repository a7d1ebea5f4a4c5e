//! # Shared Types Crate
//!
//! Chain entities shared by the event bus, the miner and the node runtime.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every cross-crate type is defined here.
//! - **Value Semantics**: entities are plain data; collaborators hand out
//!   copies, never shared mutable references.

pub mod entities;
pub mod errors;
pub mod state;

pub use entities::*;
pub use errors::*;
pub use state::{Account, WorldState};

// Re-export U256 so downstream crates agree on the amount type.
pub use primitive_types::U256;
