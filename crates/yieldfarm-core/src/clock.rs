//! Epoch clock
//!
//! Converts an externally supplied Unix timestamp into a farm epoch index.
//! The clock holds no state besides its two configuration constants, so the
//! same timestamp always maps to the same epoch.
//!
//! Epoch `e` covers `[genesis + e·d, genesis + (e+1)·d)`. Everything before
//! `genesis + d` is epoch 0, the sentinel that never pays reward.

use crate::error::{FarmError, Result};
use crate::types::EpochId;
use serde::{Deserialize, Serialize};

/// Fixed-duration epoch clock anchored at a genesis instant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochClock {
    /// Genesis timestamp (Unix seconds)
    genesis_time: i64,

    /// Epoch length in seconds
    epoch_duration: u64,
}

impl EpochClock {
    /// Create a clock; the epoch duration must be non-zero
    pub fn new(genesis_time: i64, epoch_duration: u64) -> Result<Self> {
        if epoch_duration == 0 {
            return Err(FarmError::InvalidConfig(
                "epoch duration must be greater than zero".into(),
            ));
        }
        Ok(Self {
            genesis_time,
            epoch_duration,
        })
    }

    pub fn genesis_time(&self) -> i64 {
        self.genesis_time
    }

    pub fn epoch_duration(&self) -> u64 {
        self.epoch_duration
    }

    /// Epoch index at `now`; 0 for any time before one full duration past genesis
    pub fn current_epoch(&self, now: i64) -> EpochId {
        if now < self.genesis_time {
            return 0;
        }
        now.abs_diff(self.genesis_time) / self.epoch_duration
    }

    /// Epoch index against the wall clock
    pub fn current_epoch_now(&self) -> EpochId {
        self.current_epoch(chrono::Utc::now().timestamp())
    }

    /// First second of `epoch`
    pub fn epoch_start(&self, epoch: EpochId) -> Result<i64> {
        let offset = epoch
            .checked_mul(self.epoch_duration)
            .and_then(|secs| i64::try_from(secs).ok())
            .ok_or(FarmError::ArithmeticOverflow("epoch start"))?;
        self.genesis_time
            .checked_add(offset)
            .ok_or(FarmError::ArithmeticOverflow("epoch start"))
    }

    /// First second after `epoch` (exclusive end)
    pub fn epoch_end(&self, epoch: EpochId) -> Result<i64> {
        let next = epoch
            .checked_add(1)
            .ok_or(FarmError::ArithmeticOverflow("epoch end"))?;
        self.epoch_start(next)
    }

    /// Whether `epoch` has fully elapsed at `now`
    pub fn is_elapsed(&self, epoch: EpochId, now: i64) -> bool {
        epoch < self.current_epoch(now)
    }
}
