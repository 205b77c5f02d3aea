//! # Yieldfarm Economics - Epoch Staking Ledger & Harvest Engine
//!
//! A fixed reward budget is released evenly over a bounded number of epochs
//! and claimed by stakers in proportion to their share of the pool.
//!
//! ## Key Features
//!
//! - **Sparse checkpoints**: stake is recorded only when it changes and carried
//!   forward across untouched epochs
//! - **Lazy epoch initialization**: each elapsed epoch's pool size is cached once
//! - **Strict harvest order**: epochs are claimed one at a time, never skipped
//! - **Bounded mass harvest**: one payout for every claimable epoch, capped by
//!   the schedule length
//!
//! ## Flow
//!
//! ```text
//!  deposit / withdraw ──► StakeLedger ──(StakeHistory)──► HarvestEngine ──► RewardVault
//!                                                             ▲
//!                                      RewardSchedule ────────┘
//! ```
//!
//! ## Reward per Epoch
//!
//! | Input | Value |
//! |-------|-------|
//! | Epoch allotment | `floor(total / epoch_count)` |
//! | Participant share | `allotment × stake / pool_size` (floored) |
//! | Empty pool | 0 |
//! | Epoch 0 or past the schedule | 0 |

pub mod config;
pub mod events;
pub mod harvest;
pub mod ledger;
pub mod schedule;
pub mod staking;
pub mod vault;

// Re-exports
pub use config::{init_logging, ConfigError, FarmConfig, FarmSettings, LoggingConfig};
pub use events::{FarmEvent, HarvestEvent, MassHarvestEvent};
pub use harvest::HarvestEngine;
pub use ledger::{Checkpoint, StakeHistory, StakeLedger};
pub use schedule::RewardSchedule;
pub use staking::{SharedStakingPool, StakingPool};
pub use vault::{CommunityVault, RewardVault};

/// Reward token constants
pub mod constants {
    /// Decimal places of the staked and rewarded assets
    pub const DECIMALS: u8 = 18;

    /// One whole token in smallest units
    pub const ONE_TOKEN: u128 = 1_000_000_000_000_000_000; // 10^18

    /// Default total reward budget: 2 million tokens
    pub const DEFAULT_TOTAL_REWARD: u128 = 2_000_000 * ONE_TOKEN;

    /// Default number of rewarded epochs
    pub const DEFAULT_EPOCH_COUNT: u64 = 100;

    /// Default epoch length: one week
    pub const DEFAULT_EPOCH_DURATION_SECS: u64 = 7 * 24 * 3600;
}

pub use constants::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget() {
        assert_eq!(DEFAULT_TOTAL_REWARD, 2_000_000 * ONE_TOKEN);
        assert_eq!(ONE_TOKEN, 10u128.pow(DECIMALS as u32));
    }

    #[test]
    fn test_default_allotment() {
        assert_eq!(
            DEFAULT_TOTAL_REWARD / DEFAULT_EPOCH_COUNT as u128,
            20_000 * ONE_TOKEN
        );
    }
}
