//! # Stake Ledger
//!
//! Append-only, sparse record of stake balance changes.
//!
//! A checkpoint is written only when a participant deposits or withdraws and
//! stays effective until a later checkpoint supersedes it:
//!
//! ```text
//! epoch:        1    2    3    4    5    6
//! checkpoints:  100            250
//! stake_at:     100  100  100  250  250  250
//! ```
//!
//! Every change also moves one aggregate series for the whole pool by the same
//! delta, so `pool_size_at(e)` is always the sum of all participants'
//! `stake_at(_, e)`.
//!
//! The ledger's owner finalizes epochs once they have elapsed. Changes are
//! never accepted at or before the finalized epoch, so stake and pool size of
//! a finalized epoch stay fixed even after the harvest engine caches them.
//! Epoch 0 precedes the first rewarded epoch and is always final.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use yieldfarm_core::{Amount, EpochId, FarmError, ParticipantId, Result};

/// Balance effective from `epoch` onward until superseded
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub epoch: EpochId,
    pub amount: Amount,
}

/// Read-only view of stake history consumed by the harvest engine
pub trait StakeHistory {
    /// Total pool stake effective at `epoch`
    fn pool_size_at(&self, epoch: EpochId) -> Amount;

    /// Stake of `participant` effective at `epoch`
    fn stake_at(&self, participant: &ParticipantId, epoch: EpochId) -> Amount;

    /// Highest epoch whose stake history can no longer change
    fn finalized_through(&self) -> EpochId;
}

/// Nearest checkpoint at or before `epoch`, or 0
fn amount_at(series: &[Checkpoint], epoch: EpochId) -> Amount {
    let idx = series.partition_point(|cp| cp.epoch <= epoch);
    if idx == 0 {
        0
    } else {
        series[idx - 1].amount
    }
}

fn latest_amount(series: &[Checkpoint]) -> Amount {
    series.last().map(|cp| cp.amount).unwrap_or(0)
}

fn apply_delta(balance: Amount, delta: i128) -> Result<Amount> {
    let next = if delta >= 0 {
        balance.checked_add(delta.unsigned_abs())
    } else {
        balance.checked_sub(delta.unsigned_abs())
    };
    next.ok_or(FarmError::InvalidAmount { balance, delta })
}

/// Checkpoint that applying `delta` at `at_epoch` would produce
fn next_checkpoint(series: &[Checkpoint], delta: i128, at_epoch: EpochId) -> Result<Checkpoint> {
    if let Some(latest) = series.last() {
        if at_epoch < latest.epoch {
            return Err(FarmError::StaleCheckpoint {
                epoch: at_epoch,
                latest: latest.epoch,
            });
        }
    }
    Ok(Checkpoint {
        epoch: at_epoch,
        amount: apply_delta(latest_amount(series), delta)?,
    })
}

/// Append, or fold into the latest checkpoint when it is for the same epoch
fn push_checkpoint(series: &mut Vec<Checkpoint>, checkpoint: Checkpoint) {
    match series.last_mut() {
        Some(latest) if latest.epoch == checkpoint.epoch => latest.amount = checkpoint.amount,
        _ => series.push(checkpoint),
    }
}

/// Per-participant and aggregate checkpoint history
#[derive(Clone, Debug, Default)]
pub struct StakeLedger {
    participants: HashMap<ParticipantId, Vec<Checkpoint>>,
    pool: Vec<Checkpoint>,
    finalized_through: EpochId,
}

impl StakeLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stake change for `participant`, effective from `at_epoch`.
    ///
    /// `at_epoch` must lie after the finalized epoch. Either both the
    /// participant and the pool series change, or neither.
    pub fn record_change(
        &mut self,
        participant: ParticipantId,
        delta: i128,
        at_epoch: EpochId,
    ) -> Result<Checkpoint> {
        if at_epoch <= self.finalized_through {
            return Err(FarmError::EpochFinalized {
                epoch: at_epoch,
                finalized_through: self.finalized_through,
            });
        }
        let user_series = self
            .participants
            .get(&participant)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let user_checkpoint = next_checkpoint(user_series, delta, at_epoch)?;
        let pool_checkpoint = next_checkpoint(&self.pool, delta, at_epoch)?;

        push_checkpoint(self.participants.entry(participant).or_default(), user_checkpoint);
        push_checkpoint(&mut self.pool, pool_checkpoint);

        debug!(
            participant = %participant,
            epoch = at_epoch,
            delta,
            balance = user_checkpoint.amount,
            pool_size = pool_checkpoint.amount,
            "Recorded stake checkpoint"
        );

        Ok(user_checkpoint)
    }

    /// Close every epoch up to `epoch` to further changes.
    ///
    /// The finalized epoch only moves forward; a smaller `epoch` is a no-op.
    pub fn finalize_through(&mut self, epoch: EpochId) {
        if epoch > self.finalized_through {
            self.finalized_through = epoch;
            debug!(epoch, "Finalized stake history");
        }
    }

    /// Highest epoch closed to further changes
    pub fn finalized_through(&self) -> EpochId {
        self.finalized_through
    }

    /// Total pool stake effective at `epoch`
    pub fn pool_size_at(&self, epoch: EpochId) -> Amount {
        amount_at(&self.pool, epoch)
    }

    /// Stake of `participant` effective at `epoch`
    pub fn stake_at(&self, participant: &ParticipantId, epoch: EpochId) -> Amount {
        self.participants
            .get(participant)
            .map(|series| amount_at(series, epoch))
            .unwrap_or(0)
    }

    /// Latest recorded balance, including changes effective in the future
    pub fn balance_of(&self, participant: &ParticipantId) -> Amount {
        self.participants
            .get(participant)
            .map(|series| latest_amount(series))
            .unwrap_or(0)
    }

    /// Latest recorded pool size
    pub fn total_staked(&self) -> Amount {
        latest_amount(&self.pool)
    }

    /// Checkpoint history of a participant, oldest first
    pub fn checkpoints(&self, participant: &ParticipantId) -> &[Checkpoint] {
        self.participants
            .get(participant)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Aggregate pool history, oldest first
    pub fn pool_checkpoints(&self) -> &[Checkpoint] {
        &self.pool
    }

    /// Number of participants that ever staked
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }
}

impl StakeHistory for StakeLedger {
    fn pool_size_at(&self, epoch: EpochId) -> Amount {
        StakeLedger::pool_size_at(self, epoch)
    }

    fn stake_at(&self, participant: &ParticipantId, epoch: EpochId) -> Amount {
        StakeLedger::stake_at(self, participant, epoch)
    }

    fn finalized_through(&self) -> EpochId {
        StakeLedger::finalized_through(self)
    }
}
