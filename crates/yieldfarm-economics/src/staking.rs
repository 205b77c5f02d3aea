//! # Staking Pool
//!
//! The surface participants interact with. One `StakingPool` owns the stake
//! ledger, the harvest engine and the reward vault, and every state-changing
//! call goes through it one at a time.
//!
//! ## Effective Epochs
//!
//! | Call | Recorded at | Effect on the epoch in progress |
//! |------|-------------|---------------------------------|
//! | deposit | current + 1 | none |
//! | withdraw | current + 1 | none |
//!
//! The epoch in progress is never re-weighted, so a pool size can only be
//! cached once nothing can change it any more. Before every initialization or
//! harvest the pool finalizes the ledger through the last elapsed epoch, which
//! no deposit or withdrawal could still reach.

use crate::config::FarmConfig;
use crate::events::{HarvestEvent, MassHarvestEvent};
use crate::harvest::HarvestEngine;
use crate::ledger::{Checkpoint, StakeLedger};
use crate::schedule::RewardSchedule;
use crate::vault::RewardVault;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use tracing::info;
use yieldfarm_core::{Amount, EpochClock, EpochId, FarmError, ParticipantId, Result};

/// Stake ledger, harvest engine and reward vault behind one call surface
#[derive(Debug)]
pub struct StakingPool<V> {
    ledger: StakeLedger,
    engine: HarvestEngine,
    vault: V,
}

impl<V: RewardVault> StakingPool<V> {
    /// Create a pool with an empty ledger
    pub fn new(clock: EpochClock, schedule: RewardSchedule, vault: V) -> Self {
        Self {
            ledger: StakeLedger::new(),
            engine: HarvestEngine::new(clock, schedule),
            vault,
        }
    }

    /// Create a pool from validated configuration
    pub fn from_config(config: &FarmConfig, vault: V) -> Result<Self> {
        Ok(Self::new(
            config.farm.clock()?,
            config.farm.schedule()?,
            vault,
        ))
    }

    /// Stake `amount`, effective from the next epoch
    pub fn deposit(
        &mut self,
        participant: ParticipantId,
        amount: Amount,
        now: i64,
    ) -> Result<Checkpoint> {
        let balance = self.ledger.balance_of(&participant);
        let delta = i128::try_from(amount)
            .ok()
            .filter(|delta| *delta > 0)
            .ok_or(FarmError::InvalidAmount {
                balance,
                delta: amount.min(i128::MAX as u128) as i128,
            })?;

        let epoch = self.effective_epoch(now)?;
        let checkpoint = self.ledger.record_change(participant, delta, epoch)?;
        info!(participant = %participant, amount, epoch, "Deposit");
        Ok(checkpoint)
    }

    /// Unstake `amount`, effective from the next epoch
    pub fn withdraw(
        &mut self,
        participant: ParticipantId,
        amount: Amount,
        now: i64,
    ) -> Result<Checkpoint> {
        let balance = self.ledger.balance_of(&participant);
        let delta = i128::try_from(amount)
            .ok()
            .filter(|_| amount > 0 && amount <= balance)
            .map(|amount| -amount)
            .ok_or(FarmError::InvalidAmount {
                balance,
                delta: -(amount.min(i128::MAX as u128) as i128),
            })?;

        let epoch = self.effective_epoch(now)?;
        let checkpoint = self.ledger.record_change(participant, delta, epoch)?;
        info!(participant = %participant, amount, epoch, "Withdraw");
        Ok(checkpoint)
    }

    /// Cache pool sizes up to `epoch`
    pub fn init_epoch(&mut self, epoch: EpochId, now: i64) -> Result<()> {
        self.finalize_elapsed(now);
        self.engine.init_epoch(&self.ledger, epoch, now)
    }

    /// Harvest the participant's next epoch
    pub fn harvest(
        &mut self,
        participant: &ParticipantId,
        epoch: EpochId,
        now: i64,
    ) -> Result<HarvestEvent> {
        self.finalize_elapsed(now);
        self.engine
            .harvest(&self.ledger, &mut self.vault, participant, epoch, now)
    }

    /// Harvest every claimable epoch in one payout
    pub fn mass_harvest(
        &mut self,
        participant: &ParticipantId,
        now: i64,
    ) -> Result<MassHarvestEvent> {
        self.finalize_elapsed(now);
        self.engine
            .mass_harvest(&self.ledger, &mut self.vault, participant, now)
    }

    /// Reward a mass harvest would pay at `now`
    pub fn pending_reward(&self, participant: &ParticipantId, now: i64) -> Result<Amount> {
        self.engine.pending_reward(&self.ledger, participant, now)
    }

    pub fn current_epoch(&self, now: i64) -> EpochId {
        self.engine.current_epoch(now)
    }

    pub fn pool_size(&self, epoch: EpochId) -> Amount {
        self.engine.pool_size(&self.ledger, epoch)
    }

    pub fn epoch_stake(&self, participant: &ParticipantId, epoch: EpochId) -> Amount {
        self.engine.epoch_stake(&self.ledger, participant, epoch)
    }

    pub fn last_initialized_epoch(&self) -> EpochId {
        self.engine.last_initialized_epoch()
    }

    pub fn last_harvested_epoch(&self, participant: &ParticipantId) -> EpochId {
        self.engine.last_harvested_epoch(participant)
    }

    /// Staked balance, including changes not yet effective
    pub fn balance_of(&self, participant: &ParticipantId) -> Amount {
        self.ledger.balance_of(participant)
    }

    pub fn ledger(&self) -> &StakeLedger {
        &self.ledger
    }

    pub fn engine(&self) -> &HarvestEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut HarvestEngine {
        &mut self.engine
    }

    pub fn vault(&self) -> &V {
        &self.vault
    }

    pub fn vault_mut(&mut self) -> &mut V {
        &mut self.vault
    }

    /// Elapsed epochs are final whether or not the call that follows succeeds
    fn finalize_elapsed(&mut self, now: i64) {
        let elapsed = self.current_epoch(now).saturating_sub(1);
        self.ledger.finalize_through(elapsed);
    }

    fn effective_epoch(&self, now: i64) -> Result<EpochId> {
        self.current_epoch(now)
            .checked_add(1)
            .ok_or(FarmError::ArithmeticOverflow("effective epoch"))
    }
}

/// Pool shared across threads; one call holds the lock at a time
pub struct SharedStakingPool<V> {
    inner: Arc<Mutex<StakingPool<V>>>,
}

impl<V> Clone for SharedStakingPool<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: RewardVault> SharedStakingPool<V> {
    pub fn new(pool: StakingPool<V>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pool)),
        }
    }

    /// Exclusive access for a sequence of calls
    pub fn lock(&self) -> MutexGuard<'_, StakingPool<V>> {
        self.inner.lock()
    }

    pub fn deposit(
        &self,
        participant: ParticipantId,
        amount: Amount,
        now: i64,
    ) -> Result<Checkpoint> {
        self.inner.lock().deposit(participant, amount, now)
    }

    pub fn withdraw(
        &self,
        participant: ParticipantId,
        amount: Amount,
        now: i64,
    ) -> Result<Checkpoint> {
        self.inner.lock().withdraw(participant, amount, now)
    }

    pub fn init_epoch(&self, epoch: EpochId, now: i64) -> Result<()> {
        self.inner.lock().init_epoch(epoch, now)
    }

    pub fn harvest(
        &self,
        participant: &ParticipantId,
        epoch: EpochId,
        now: i64,
    ) -> Result<HarvestEvent> {
        self.inner.lock().harvest(participant, epoch, now)
    }

    pub fn mass_harvest(
        &self,
        participant: &ParticipantId,
        now: i64,
    ) -> Result<MassHarvestEvent> {
        self.inner.lock().mass_harvest(participant, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::CommunityVault;

    const GENESIS: i64 = 1_000_000;
    const DURATION: u64 = 1000;

    fn participant(id: u8) -> ParticipantId {
        ParticipantId::new([id; 32])
    }

    fn at_epoch(epoch: u64) -> i64 {
        GENESIS + (epoch * DURATION) as i64
    }

    fn pool(supply: Amount) -> StakingPool<CommunityVault> {
        StakingPool::new(
            EpochClock::new(GENESIS, DURATION).unwrap(),
            RewardSchedule::new(1_000, 10).unwrap(),
            CommunityVault::funded(supply),
        )
    }

    #[test]
    fn test_deposit_effective_next_epoch() {
        let mut pool = pool(1_000);
        let alice = participant(1);

        let checkpoint = pool.deposit(alice, 100, at_epoch(2) + 10).unwrap();

        assert_eq!(checkpoint, Checkpoint { epoch: 3, amount: 100 });
        assert_eq!(pool.epoch_stake(&alice, 2), 0);
        assert_eq!(pool.epoch_stake(&alice, 3), 100);
        assert_eq!(pool.balance_of(&alice), 100);
    }

    #[test]
    fn test_deposit_before_genesis_counts_from_epoch_one() {
        let mut pool = pool(1_000);
        let alice = participant(1);

        pool.deposit(alice, 100, GENESIS - 500).unwrap();
        assert_eq!(pool.pool_size(1), 100);
    }

    #[test]
    fn test_zero_amounts_rejected() {
        let mut pool = pool(1_000);
        let alice = participant(1);

        assert!(matches!(
            pool.deposit(alice, 0, GENESIS),
            Err(FarmError::InvalidAmount { .. })
        ));
        assert!(matches!(
            pool.withdraw(alice, 0, GENESIS),
            Err(FarmError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_deposit_beyond_signed_range_rejected() {
        let mut pool = pool(1_000);
        assert!(matches!(
            pool.deposit(participant(1), u128::MAX, GENESIS),
            Err(FarmError::InvalidAmount { .. })
        ));
        assert_eq!(pool.ledger().participant_count(), 0);
    }

    #[test]
    fn test_withdraw_more_than_balance_rejected() {
        let mut pool = pool(1_000);
        let alice = participant(1);
        pool.deposit(alice, 100, GENESIS).unwrap();

        assert_eq!(
            pool.withdraw(alice, 101, at_epoch(3)),
            Err(FarmError::InvalidAmount { balance: 100, delta: -101 })
        );
        assert_eq!(pool.balance_of(&alice), 100);
    }

    #[test]
    fn test_withdraw_keeps_history() {
        let mut pool = pool(1_000);
        let alice = participant(1);
        pool.deposit(alice, 100, GENESIS).unwrap();
        pool.withdraw(alice, 100, at_epoch(3)).unwrap();

        assert_eq!(pool.epoch_stake(&alice, 3), 100);
        assert_eq!(pool.epoch_stake(&alice, 4), 0);

        let event = pool.mass_harvest(&alice, at_epoch(6)).unwrap();
        // rewarded for epochs 1..=3 only
        assert_eq!(event.epochs, 5);
        assert_eq!(event.amount, 300);
    }

    #[test]
    fn test_queries_follow_engine() {
        let mut pool = pool(1_000);
        let alice = participant(1);
        pool.deposit(alice, 100, GENESIS).unwrap();

        pool.init_epoch(2, at_epoch(4)).unwrap();
        assert_eq!(pool.last_initialized_epoch(), 2);
        assert_eq!(pool.current_epoch(at_epoch(4)), 4);
        assert_eq!(pool.pending_reward(&alice, at_epoch(4)).unwrap(), 300);

        pool.harvest(&alice, 1, at_epoch(4)).unwrap();
        assert_eq!(pool.last_harvested_epoch(&alice), 1);
        assert_eq!(pool.vault().balance_of(&alice), 100);
    }

    #[test]
    fn test_harvest_finalizes_elapsed_epochs() {
        let mut pool = pool(1_000);
        let alice = participant(1);
        pool.deposit(alice, 100, GENESIS).unwrap();

        pool.harvest(&alice, 1, at_epoch(4)).unwrap();
        assert_eq!(pool.ledger().finalized_through(), 3);

        // deposits still land after the finalized epochs
        let checkpoint = pool.deposit(alice, 50, at_epoch(4)).unwrap();
        assert_eq!(checkpoint.epoch, 5);
    }

    #[test]
    fn test_shared_pool_full_surface() {
        let shared = SharedStakingPool::new(pool(1_000));
        let alice = participant(1);

        shared.deposit(alice, 100, GENESIS).unwrap();
        shared.withdraw(alice, 40, at_epoch(2)).unwrap();
        shared.init_epoch(3, at_epoch(4)).unwrap();
        shared.harvest(&alice, 1, at_epoch(4)).unwrap();

        let pool = shared.lock();
        assert_eq!(pool.balance_of(&alice), 60);
        assert_eq!(pool.last_initialized_epoch(), 3);
        assert_eq!(pool.epoch_stake(&alice, 3), 60);
    }

    #[test]
    fn test_from_config() {
        let config = FarmConfig::from_toml_str(
            "[farm]\ngenesis_time = 1000000\nepoch_duration_secs = 1000\nreward_tokens = 1000\ndecimals = 0\nepoch_count = 10\n",
        )
        .unwrap();
        let pool = StakingPool::from_config(&config, CommunityVault::funded(1_000)).unwrap();

        assert_eq!(pool.engine().schedule().per_epoch_amount(), 100);
        assert_eq!(pool.current_epoch(at_epoch(7)), 7);
    }

    #[test]
    fn test_shared_pool_serializes_allowance_draws() {
        // allowance covers exactly three of the four participants
        let shared = SharedStakingPool::new(pool(1_000));
        let stakers: Vec<_> = (1..=4).map(participant).collect();
        for staker in &stakers {
            shared.deposit(*staker, 100, GENESIS).unwrap();
        }
        shared.lock().vault_mut().set_allowance(750);

        let handles: Vec<_> = stakers
            .iter()
            .map(|staker| {
                let shared = shared.clone();
                let staker = *staker;
                std::thread::spawn(move || shared.mass_harvest(&staker, at_epoch(11)))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let paid = results.iter().filter(|r| r.is_ok()).count();

        assert_eq!(paid, 3);
        let pool = shared.lock();
        assert_eq!(pool.vault().allowance(), 0);
        assert_eq!(pool.vault().total_paid(), 750);
    }
}
