//! Harvest events reported to external consumers

use serde::{Deserialize, Serialize};
use yieldfarm_core::{Amount, EpochId, ParticipantId};

/// A single-epoch harvest
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestEvent {
    pub participant: ParticipantId,
    pub epoch: EpochId,
    pub amount: Amount,
}

/// A batched harvest over every claimable epoch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MassHarvestEvent {
    pub participant: ParticipantId,
    /// Number of epochs harvested by this call (0 when nothing was claimable)
    pub epochs: u64,
    /// First epoch harvested by this call; `last_epoch + 1` when nothing was claimable
    pub first_epoch: EpochId,
    /// Participant's last harvested epoch after the call
    pub last_epoch: EpochId,
    /// Total paid out by this call
    pub amount: Amount,
}

/// Event journal entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FarmEvent {
    Harvest(HarvestEvent),
    MassHarvest(MassHarvestEvent),
}

impl FarmEvent {
    pub fn participant(&self) -> &ParticipantId {
        match self {
            Self::Harvest(e) => &e.participant,
            Self::MassHarvest(e) => &e.participant,
        }
    }

    pub fn amount(&self) -> Amount {
        match self {
            Self::Harvest(e) => e.amount,
            Self::MassHarvest(e) => e.amount,
        }
    }

    /// JSON encoding for external consumers
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<HarvestEvent> for FarmEvent {
    fn from(event: HarvestEvent) -> Self {
        Self::Harvest(event)
    }
}

impl From<MassHarvestEvent> for FarmEvent {
    fn from(event: MassHarvestEvent) -> Self {
        Self::MassHarvest(event)
    }
}
