//! Core type definitions shared by the ledger and the harvest engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Epoch index. Epoch 0 is the pre-genesis sentinel and never pays reward.
pub type EpochId = u64;

/// Amount in the smallest unit of the staked or rewarded asset
pub type Amount = u128;

/// ParticipantId - Identity of a staker
///
/// Derived from a public key hash, the same way network identities are.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId {
    id: [u8; 32],
}

impl ParticipantId {
    pub fn new(id: [u8; 32]) -> Self {
        Self { id }
    }

    pub fn from_public_key(public_key: &[u8]) -> Self {
        let hash = blake3::hash(public_key);
        Self {
            id: *hash.as_bytes(),
        }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.id
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.id)
    }

    /// Parse from hex string
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut id = [0u8; 32];
        hex::decode_to_slice(s, &mut id)?;
        Ok(Self { id })
    }
}

impl fmt::Debug for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParticipantId({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..12])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_from_public_key() {
        let a = ParticipantId::from_public_key(b"alice");
        let b = ParticipantId::from_public_key(b"bob");

        assert_ne!(a, b);
        assert_eq!(a, ParticipantId::from_public_key(b"alice"));
    }

    #[test]
    fn test_hex_roundtrip() {
        let id = ParticipantId::new([7u8; 32]);
        let parsed = ParticipantId::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_from_hex_rejects_short_input() {
        assert!(ParticipantId::from_hex("abcd").is_err());
    }

    #[test]
    fn test_display_is_truncated() {
        let id = ParticipantId::new([0xab; 32]);
        assert_eq!(format!("{}", id), "abababababab");
        assert_eq!(format!("{:?}", id), "ParticipantId(abababababab)");
    }
}
