//! # Yieldfarm Core
//!
//! Shared building blocks for the epoch-indexed staking ledger and the
//! harvest engine:
//! - `ParticipantId` - Identity of a staker (blake3 of a public key)
//! - `EpochClock` - Maps an external timestamp onto a farm epoch index
//! - `FarmError` - The error taxonomy every ledger/harvest call reports
//! - `math` - Exact integer proportional division
//!
//! ## Epoch Timeline
//!
//! ```text
//!   genesis        +1·d           +2·d           +3·d
//!      │─────────────│──────────────│──────────────│────────► time
//!      │   epoch 0   │   epoch 1    │   epoch 2    │  ...
//!      │ (sentinel)  │ (in progress │              │
//!      │             │  until +2·d) │              │
//! ```
//!
//! Epoch `e` is only final (harvestable) once the clock reports `e + 1` or later.

pub mod clock;
pub mod error;
pub mod math;
pub mod types;

pub use clock::*;
pub use error::*;
pub use types::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::clock::EpochClock;
    pub use crate::error::{FarmError, Result};
    pub use crate::math::mul_div;
    pub use crate::types::*;
}
