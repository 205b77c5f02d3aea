//! # Reward Vault
//!
//! The custodian of the reward supply. The farm never holds rewards itself;
//! it asks the vault to pay a participant, and the vault honours the request
//! only up to the allowance it granted the farm.

use std::collections::HashMap;
use tracing::{debug, warn};
use yieldfarm_core::{Amount, FarmError, ParticipantId, Result};

/// Custodian that pays out rewards on the farm's behalf
pub trait RewardVault {
    /// Transfer `amount` to `to`, consuming allowance
    fn withdraw(&mut self, to: &ParticipantId, amount: Amount) -> Result<()>;

    /// Allowance still available to the farm
    fn allowance(&self) -> Amount;
}

/// In-memory community vault holding the reward supply
#[derive(Clone, Debug, Default)]
pub struct CommunityVault {
    /// Reward tokens held
    supply: Amount,

    /// Remaining amount the farm may draw
    allowance: Amount,

    /// Rewards credited to each participant
    balances: HashMap<ParticipantId, Amount>,

    /// Total paid out since creation
    total_paid: Amount,
}

impl CommunityVault {
    /// Create a vault holding `supply` with no allowance granted yet
    pub fn new(supply: Amount) -> Self {
        Self {
            supply,
            ..Self::default()
        }
    }

    /// Create a vault and authorize the whole supply
    pub fn funded(supply: Amount) -> Self {
        Self {
            supply,
            allowance: supply,
            ..Self::default()
        }
    }

    /// Replace the farm's allowance
    pub fn set_allowance(&mut self, allowance: Amount) {
        self.allowance = allowance;
    }

    /// Add reward tokens to the vault
    pub fn fund(&mut self, amount: Amount) -> Result<()> {
        self.supply = self
            .supply
            .checked_add(amount)
            .ok_or(FarmError::ArithmeticOverflow("vault supply"))?;
        Ok(())
    }

    /// Reward tokens still held
    pub fn supply(&self) -> Amount {
        self.supply
    }

    /// Rewards credited to `participant`
    pub fn balance_of(&self, participant: &ParticipantId) -> Amount {
        self.balances.get(participant).copied().unwrap_or(0)
    }

    pub fn total_paid(&self) -> Amount {
        self.total_paid
    }
}

impl RewardVault for CommunityVault {
    fn withdraw(&mut self, to: &ParticipantId, amount: Amount) -> Result<()> {
        if amount > self.allowance {
            warn!(
                participant = %to,
                requested = amount,
                allowance = self.allowance,
                "Vault withdrawal exceeds allowance"
            );
            return Err(FarmError::InsufficientAllowance {
                requested: amount,
                allowance: self.allowance,
            });
        }
        if amount > self.supply {
            warn!(
                participant = %to,
                requested = amount,
                available = self.supply,
                "Vault withdrawal exceeds supply"
            );
            return Err(FarmError::InsufficientSupply {
                requested: amount,
                available: self.supply,
            });
        }

        let balance = self.balance_of(to);
        let credited = balance
            .checked_add(amount)
            .ok_or(FarmError::ArithmeticOverflow("participant reward balance"))?;

        self.allowance -= amount;
        self.supply -= amount;
        self.total_paid += amount;
        self.balances.insert(*to, credited);

        debug!(participant = %to, amount, allowance = self.allowance, "Vault paid reward");
        Ok(())
    }

    fn allowance(&self) -> Amount {
        self.allowance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(id: u8) -> ParticipantId {
        ParticipantId::new([id; 32])
    }

    #[test]
    fn test_withdraw_within_allowance() {
        let mut vault = CommunityVault::funded(1_000);
        vault.withdraw(&participant(1), 400).unwrap();

        assert_eq!(vault.allowance(), 600);
        assert_eq!(vault.supply(), 600);
        assert_eq!(vault.balance_of(&participant(1)), 400);
        assert_eq!(vault.total_paid(), 400);
    }

    #[test]
    fn test_allowance_enforced() {
        let mut vault = CommunityVault::new(1_000);
        vault.set_allowance(100);

        assert_eq!(
            vault.withdraw(&participant(1), 101),
            Err(FarmError::InsufficientAllowance { requested: 101, allowance: 100 })
        );
        assert_eq!(vault.supply(), 1_000);
        assert_eq!(vault.balance_of(&participant(1)), 0);
    }

    #[test]
    fn test_supply_enforced() {
        let mut vault = CommunityVault::new(50);
        vault.set_allowance(1_000);

        assert!(matches!(
            vault.withdraw(&participant(1), 51),
            Err(FarmError::InsufficientSupply { .. })
        ));
        assert_eq!(vault.allowance(), 1_000);
    }

    #[test]
    fn test_zero_withdrawal_is_allowed() {
        let mut vault = CommunityVault::new(0);
        vault.withdraw(&participant(1), 0).unwrap();
        assert_eq!(vault.total_paid(), 0);
    }

    #[test]
    fn test_fund() {
        let mut vault = CommunityVault::new(10);
        vault.fund(5).unwrap();
        assert_eq!(vault.supply(), 15);
        assert!(vault.fund(u128::MAX).is_err());
    }
}
