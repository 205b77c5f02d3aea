//! Error types for ledger and harvest operations

use crate::types::{Amount, EpochId};
use thiserror::Error;

/// Result type alias for farm operations
pub type Result<T> = std::result::Result<T, FarmError>;

/// Errors that can occur while recording stake or harvesting rewards.
///
/// Every error aborts the call that raised it; no state is changed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FarmError {
    // === Harvest ===
    /// Harvest targets an epoch that has not fully elapsed
    #[error("This epoch is in the future: epoch {epoch}, current epoch {current}")]
    EpochInFuture { epoch: EpochId, current: EpochId },

    /// Harvest is not for the participant's next unharvested epoch
    #[error("Epochs needs to be harvested in order: requested {requested}, expected {expected}")]
    OutOfOrderHarvest { requested: EpochId, expected: EpochId },

    /// Epoch lies past the last epoch of the reward schedule
    #[error("Epoch {epoch} is beyond the reward schedule of {epoch_count} epochs")]
    EpochBeyondSchedule { epoch: EpochId, epoch_count: u64 },

    // === Epoch initialization ===
    /// Initialization requested for an epoch that is not final yet
    #[error("Epoch {epoch} has not elapsed yet (current epoch {current})")]
    EpochNotElapsed { epoch: EpochId, current: EpochId },

    /// Pool sizes would be cached from stake history that can still change
    #[error("Stake history for epoch {epoch} is not finalized (finalized through {finalized_through})")]
    EpochNotFinalized { epoch: EpochId, finalized_through: EpochId },

    // === Stake ledger ===
    /// Stake change would drive a balance negative or past the representable range
    #[error("Invalid amount: balance {balance} cannot absorb change {delta}")]
    InvalidAmount { balance: Amount, delta: i128 },

    /// Stake change targets an epoch before the latest recorded checkpoint
    #[error("Checkpoint at epoch {epoch} precedes latest checkpoint at epoch {latest}")]
    StaleCheckpoint { epoch: EpochId, latest: EpochId },

    /// Stake change targets an epoch whose stake history is already final
    #[error("Stake change at epoch {epoch} rewrites finalized history (finalized through {finalized_through})")]
    EpochFinalized { epoch: EpochId, finalized_through: EpochId },

    // === Reward vault ===
    /// Requested payout exceeds the allowance granted to the farm
    #[error("Insufficient allowance: requested {requested}, allowance {allowance}")]
    InsufficientAllowance { requested: Amount, allowance: Amount },

    /// Requested payout exceeds the vault's remaining supply
    #[error("Insufficient supply: requested {requested}, available {available}")]
    InsufficientSupply { requested: Amount, available: Amount },

    // === General ===
    /// Integer arithmetic left the representable range
    #[error("Arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),

    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FarmError {
    /// Stable numeric code for API responses
    pub fn code(&self) -> u32 {
        match self {
            Self::EpochInFuture { .. } => 2001,
            Self::OutOfOrderHarvest { .. } => 2002,
            Self::EpochBeyondSchedule { .. } => 2003,
            Self::EpochNotElapsed { .. } => 2004,
            Self::EpochNotFinalized { .. } => 2005,
            Self::InvalidAmount { .. } => 2101,
            Self::StaleCheckpoint { .. } => 2102,
            Self::EpochFinalized { .. } => 2103,
            Self::InsufficientAllowance { .. } => 2201,
            Self::InsufficientSupply { .. } => 2202,
            Self::ArithmeticOverflow(_) => 9001,
            Self::InvalidConfig(_) => 9002,
        }
    }

    /// Check if the same call may succeed once time advances or the vault is topped up
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::EpochInFuture { .. }
                | Self::EpochNotElapsed { .. }
                | Self::InsufficientAllowance { .. }
                | Self::InsufficientSupply { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = FarmError::EpochInFuture { epoch: 10, current: 8 };
        assert_eq!(err.code(), 2001);

        let err = FarmError::InsufficientAllowance { requested: 5, allowance: 1 };
        assert_eq!(err.code(), 2201);

        let err = FarmError::EpochFinalized { epoch: 2, finalized_through: 2 };
        assert_eq!(err.code(), 2103);
    }

    #[test]
    fn test_error_display() {
        let err = FarmError::OutOfOrderHarvest { requested: 3, expected: 1 };
        let msg = format!("{}", err);
        assert!(msg.contains("harvested in order"));
        assert!(msg.contains("requested 3"));
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(FarmError::EpochInFuture { epoch: 2, current: 1 }.is_recoverable());
        assert!(!FarmError::OutOfOrderHarvest { requested: 3, expected: 1 }.is_recoverable());
        assert!(!FarmError::InvalidAmount { balance: 0, delta: -1 }.is_recoverable());
    }
}
