//! # Reward Schedule
//!
//! A fixed reward budget split into equal per-epoch allotments.
//!
//! ```text
//! total 2,000,000 tokens over 100 epochs
//!   epoch 0        → 0            (sentinel, before the farm starts)
//!   epoch 1..=100  → 20,000 each
//!   epoch 101..    → 0
//! ```
//!
//! The allotment is floored. `total mod epoch_count` is never allocated to
//! any epoch and stays in the custodian.

use serde::{Deserialize, Serialize};
use yieldfarm_core::{Amount, EpochId, FarmError, Result};

/// Equal per-epoch release of a fixed reward budget
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSchedule {
    /// Total reward budget in smallest units
    total_amount: Amount,
    /// Number of rewarded epochs (N)
    epoch_count: u64,
    /// floor(total_amount / epoch_count)
    per_epoch_amount: Amount,
}

impl RewardSchedule {
    /// Create a schedule; `epoch_count` must be non-zero
    pub fn new(total_amount: Amount, epoch_count: u64) -> Result<Self> {
        if epoch_count == 0 {
            return Err(FarmError::InvalidConfig(
                "epoch count must be greater than zero".into(),
            ));
        }
        Ok(Self {
            total_amount,
            epoch_count,
            per_epoch_amount: total_amount / epoch_count as u128,
        })
    }

    pub fn total_amount(&self) -> Amount {
        self.total_amount
    }

    pub fn epoch_count(&self) -> u64 {
        self.epoch_count
    }

    pub fn per_epoch_amount(&self) -> Amount {
        self.per_epoch_amount
    }

    /// Whether `epoch` pays reward at all
    pub fn is_rewarded(&self, epoch: EpochId) -> bool {
        (1..=self.epoch_count).contains(&epoch)
    }

    /// Reward released for `epoch`
    pub fn reward_for_epoch(&self, epoch: EpochId) -> Amount {
        if self.is_rewarded(epoch) {
            self.per_epoch_amount
        } else {
            0
        }
    }

    /// Sum of all epoch allotments
    pub fn total_scheduled(&self) -> Amount {
        self.per_epoch_amount * self.epoch_count as u128
    }

    /// Part of the budget no epoch ever releases
    pub fn undistributed_remainder(&self) -> Amount {
        self.total_amount % self.epoch_count as u128
    }

    /// Rewarded epochs left after `last_epoch`
    pub fn epochs_remaining(&self, last_epoch: EpochId) -> u64 {
        self.epoch_count.saturating_sub(last_epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;

    #[test]
    fn test_default_allotment() {
        let schedule = RewardSchedule::new(DEFAULT_TOTAL_REWARD, 100).unwrap();
        assert_eq!(schedule.per_epoch_amount(), 20_000 * ONE_TOKEN);
        assert_eq!(schedule.undistributed_remainder(), 0);
    }

    #[test]
    fn test_sentinel_and_tail_epochs_pay_nothing() {
        let schedule = RewardSchedule::new(1_000, 10).unwrap();
        assert_eq!(schedule.reward_for_epoch(0), 0);
        assert_eq!(schedule.reward_for_epoch(1), 100);
        assert_eq!(schedule.reward_for_epoch(10), 100);
        assert_eq!(schedule.reward_for_epoch(11), 0);
        assert_eq!(schedule.reward_for_epoch(u64::MAX), 0);
    }

    #[test]
    fn test_remainder_left_unallocated() {
        let schedule = RewardSchedule::new(1_003, 10).unwrap();
        assert_eq!(schedule.per_epoch_amount(), 100);
        assert_eq!(schedule.undistributed_remainder(), 3);
        assert_eq!(schedule.total_scheduled(), 1_000);
        // the final epoch does not absorb the remainder
        assert_eq!(schedule.reward_for_epoch(10), 100);
    }

    #[test]
    fn test_zero_epoch_count_rejected() {
        assert!(matches!(
            RewardSchedule::new(1_000, 0),
            Err(FarmError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_epochs_remaining() {
        let schedule = RewardSchedule::new(1_000, 10).unwrap();
        assert_eq!(schedule.epochs_remaining(0), 10);
        assert_eq!(schedule.epochs_remaining(7), 3);
        assert_eq!(schedule.epochs_remaining(12), 0);
    }
}
