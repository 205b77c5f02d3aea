//! # Harvest Engine
//!
//! Turns stake history into per-epoch reward entitlements.
//!
//! ## State
//!
//! | Counter | Range | Moves |
//! |---------|-------|-------|
//! | `last_initialized_epoch` | 0..=N | forward only, via `init_epoch` or a harvest |
//! | `last_harvested_epoch(p)` | 0..=N | forward only, one epoch at a time |
//!
//! An epoch is final once the clock has moved past it. Only final epochs are
//! initialized (pool size cached) or harvested, and a pool size is only
//! cached once the stake history reports the epoch as finalized. Stakes read
//! later for that epoch therefore always add up to the cached pool size.
//!
//! ## Atomicity
//!
//! Every call stages the pool sizes it needs, computes rewards, asks the
//! vault for the payout and only then commits. A rejected call leaves the
//! cache, the counters and the journal exactly as they were.

use crate::events::{FarmEvent, HarvestEvent, MassHarvestEvent};
use crate::ledger::StakeHistory;
use crate::schedule::RewardSchedule;
use crate::vault::RewardVault;
use std::collections::HashMap;
use tracing::{debug, info};
use yieldfarm_core::math::mul_div;
use yieldfarm_core::{Amount, EpochClock, EpochId, FarmError, ParticipantId, Result};

/// Epoch range and payout a mass harvest would perform
struct HarvestPlan {
    first_epoch: EpochId,
    last_epoch: EpochId,
    staged_pool_sizes: Vec<Amount>,
    total: Amount,
}

impl HarvestPlan {
    fn epochs(&self) -> u64 {
        (self.last_epoch + 1).saturating_sub(self.first_epoch)
    }
}

/// Epoch-checkpoint harvest state machine
#[derive(Clone, Debug)]
pub struct HarvestEngine {
    clock: EpochClock,
    schedule: RewardSchedule,

    /// `pool_sizes[e - 1]` is the cached pool size of epoch `e`
    pool_sizes: Vec<Amount>,

    /// Last harvested epoch per participant; absent means 0
    last_harvested: HashMap<ParticipantId, EpochId>,

    events: Vec<FarmEvent>,
}

impl HarvestEngine {
    /// Create engine with nothing initialized or harvested
    pub fn new(clock: EpochClock, schedule: RewardSchedule) -> Self {
        Self {
            clock,
            schedule,
            pool_sizes: Vec::new(),
            last_harvested: HashMap::new(),
            events: Vec::new(),
        }
    }

    pub fn clock(&self) -> &EpochClock {
        &self.clock
    }

    pub fn schedule(&self) -> &RewardSchedule {
        &self.schedule
    }

    /// Farm epoch at `now`
    pub fn current_epoch(&self, now: i64) -> EpochId {
        self.clock.current_epoch(now)
    }

    /// Highest epoch whose pool size is cached
    pub fn last_initialized_epoch(&self) -> EpochId {
        self.pool_sizes.len() as EpochId
    }

    /// Last epoch `participant` harvested, 0 if none
    pub fn last_harvested_epoch(&self, participant: &ParticipantId) -> EpochId {
        self.last_harvested.get(participant).copied().unwrap_or(0)
    }

    /// Pool size of `epoch`, served from the cache when initialized
    pub fn pool_size(&self, history: &impl StakeHistory, epoch: EpochId) -> Amount {
        self.cached_pool_size(epoch)
            .unwrap_or_else(|| history.pool_size_at(epoch))
    }

    /// Stake of `participant` at `epoch`
    pub fn epoch_stake(
        &self,
        history: &impl StakeHistory,
        participant: &ParticipantId,
        epoch: EpochId,
    ) -> Amount {
        history.stake_at(participant, epoch)
    }

    /// Cache pool sizes of every epoch up to `epoch`.
    ///
    /// Calling again with the same or a smaller epoch changes nothing.
    pub fn init_epoch(
        &mut self,
        history: &impl StakeHistory,
        epoch: EpochId,
        now: i64,
    ) -> Result<()> {
        let current = self.current_epoch(now);
        if epoch >= current {
            return Err(FarmError::EpochNotElapsed { epoch, current });
        }
        self.ensure_in_schedule(epoch)?;

        let staged = self.stage_pool_sizes(history, epoch);
        self.ensure_finalized(history, &staged)?;
        self.commit_pool_sizes(staged);
        Ok(())
    }

    /// Harvest exactly the participant's next epoch
    pub fn harvest(
        &mut self,
        history: &impl StakeHistory,
        vault: &mut impl RewardVault,
        participant: &ParticipantId,
        epoch: EpochId,
        now: i64,
    ) -> Result<HarvestEvent> {
        let current = self.current_epoch(now);
        if epoch >= current {
            return Err(FarmError::EpochInFuture { epoch, current });
        }
        let expected = self.last_harvested_epoch(participant) + 1;
        if epoch != expected {
            return Err(FarmError::OutOfOrderHarvest {
                requested: epoch,
                expected,
            });
        }
        self.ensure_in_schedule(epoch)?;

        let staged = self.stage_pool_sizes(history, epoch);
        self.ensure_finalized(history, &staged)?;
        let pool_size = self.pool_size_with(&staged, epoch);
        let amount = self.epoch_reward(history, participant, epoch, pool_size)?;

        vault.withdraw(participant, amount)?;

        self.commit_pool_sizes(staged);
        self.last_harvested.insert(*participant, epoch);

        let event = HarvestEvent {
            participant: *participant,
            epoch,
            amount,
        };
        info!(participant = %participant, epoch, amount, "Harvest");
        self.events.push(event.clone().into());
        Ok(event)
    }

    /// Harvest every claimable epoch in one payout.
    ///
    /// Claims `last_harvested + 1 ..= min(current - 1, N)`. The participant's
    /// cumulative last harvested epoch is the cap, so no number of calls ever
    /// takes it beyond N. With nothing to claim the call still pays (zero) and
    /// reports a zero-epoch event.
    pub fn mass_harvest(
        &mut self,
        history: &impl StakeHistory,
        vault: &mut impl RewardVault,
        participant: &ParticipantId,
        now: i64,
    ) -> Result<MassHarvestEvent> {
        let plan = self.plan_mass_harvest(history, participant, now)?;
        self.ensure_finalized(history, &plan.staged_pool_sizes)?;

        vault.withdraw(participant, plan.total)?;

        let epochs = plan.epochs();
        self.commit_pool_sizes(plan.staged_pool_sizes);
        if epochs > 0 {
            self.last_harvested.insert(*participant, plan.last_epoch);
        }

        let event = MassHarvestEvent {
            participant: *participant,
            epochs,
            first_epoch: plan.first_epoch,
            last_epoch: self.last_harvested_epoch(participant),
            amount: plan.total,
        };
        info!(
            participant = %participant,
            epochs,
            first_epoch = event.first_epoch,
            last_epoch = event.last_epoch,
            amount = plan.total,
            "Mass harvest"
        );
        self.events.push(event.clone().into());
        Ok(event)
    }

    /// Reward `mass_harvest` would pay at `now`, without changing anything
    pub fn pending_reward(
        &self,
        history: &impl StakeHistory,
        participant: &ParticipantId,
        now: i64,
    ) -> Result<Amount> {
        Ok(self.plan_mass_harvest(history, participant, now)?.total)
    }

    /// Journal of harvest events since the last drain
    pub fn events(&self) -> &[FarmEvent] {
        &self.events
    }

    /// Take the journal, leaving it empty
    pub fn drain_events(&mut self) -> Vec<FarmEvent> {
        std::mem::take(&mut self.events)
    }

    fn ensure_in_schedule(&self, epoch: EpochId) -> Result<()> {
        let epoch_count = self.schedule.epoch_count();
        if epoch > epoch_count {
            return Err(FarmError::EpochBeyondSchedule { epoch, epoch_count });
        }
        Ok(())
    }

    /// Staged pool sizes may only be cached from finalized stake history
    fn ensure_finalized(&self, history: &impl StakeHistory, staged: &[Amount]) -> Result<()> {
        if staged.is_empty() {
            return Ok(());
        }
        let epoch = self.last_initialized_epoch() + staged.len() as EpochId;
        let finalized_through = history.finalized_through();
        if epoch > finalized_through {
            return Err(FarmError::EpochNotFinalized {
                epoch,
                finalized_through,
            });
        }
        Ok(())
    }

    fn plan_mass_harvest(
        &self,
        history: &impl StakeHistory,
        participant: &ParticipantId,
        now: i64,
    ) -> Result<HarvestPlan> {
        let current = self.current_epoch(now);
        let first_epoch = self.last_harvested_epoch(participant) + 1;
        let last_epoch = current
            .saturating_sub(1)
            .min(self.schedule.epoch_count());

        let staged_pool_sizes = self.stage_pool_sizes(history, last_epoch);
        let mut total: Amount = 0;
        for epoch in first_epoch..=last_epoch {
            let pool_size = self.pool_size_with(&staged_pool_sizes, epoch);
            let reward = self.epoch_reward(history, participant, epoch, pool_size)?;
            total = total
                .checked_add(reward)
                .ok_or(FarmError::ArithmeticOverflow("mass harvest total"))?;
        }

        Ok(HarvestPlan {
            first_epoch,
            last_epoch,
            staged_pool_sizes,
            total,
        })
    }

    fn epoch_reward(
        &self,
        history: &impl StakeHistory,
        participant: &ParticipantId,
        epoch: EpochId,
        pool_size: Amount,
    ) -> Result<Amount> {
        if pool_size == 0 {
            return Ok(0);
        }
        let stake = history.stake_at(participant, epoch);
        mul_div(self.schedule.reward_for_epoch(epoch), stake, pool_size)
    }

    fn cached_pool_size(&self, epoch: EpochId) -> Option<Amount> {
        let index = usize::try_from(epoch.checked_sub(1)?).ok()?;
        self.pool_sizes.get(index).copied()
    }

    /// Pool sizes for the uninitialized epochs up to `epoch`, not yet cached
    fn stage_pool_sizes(&self, history: &impl StakeHistory, epoch: EpochId) -> Vec<Amount> {
        (self.last_initialized_epoch() + 1..=epoch)
            .map(|e| history.pool_size_at(e))
            .collect()
    }

    /// Pool size of `epoch` from the cache or from the staged extension of it
    fn pool_size_with(&self, staged: &[Amount], epoch: EpochId) -> Amount {
        match self.cached_pool_size(epoch) {
            Some(size) => size,
            None => {
                let offset = epoch - self.last_initialized_epoch() - 1;
                staged[offset as usize]
            }
        }
    }

    fn commit_pool_sizes(&mut self, staged: Vec<Amount>) {
        if staged.is_empty() {
            return;
        }
        let from = self.last_initialized_epoch() + 1;
        self.pool_sizes.extend(staged);
        debug!(
            from,
            to = self.last_initialized_epoch(),
            "Initialized epoch pool sizes"
        );
    }
}
