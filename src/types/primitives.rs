// Primitives - Minimal shared types for the safety layer
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Block height
pub type BlockNumber = u64;

/// Unix timestamp in seconds (block time)
pub type Timestamp = u64;

/// Token amount in minimal units.
/// Signed so that a corrupted balance can be observed (and rejected) by invariants.
pub type Amount = i128;

/// Bonded voting power
pub type VotingPower = u128;

/// Display name of the staking token
pub const STAKE_DENOM_NAME: &str = "stake";

/// Minimal-unit denomination of the staking token
pub const STAKE_DENOM: &str = "stake-atto";

/// 1 whole staking token = 10^18 minimal units
pub const STAKE_UNIT: Amount = 1_000_000_000_000_000_000;

/// Convert whole staking tokens to minimal units
pub const fn tokens(whole: i128) -> Amount {
    whole * STAKE_UNIT
}

/// Account or validator address (32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId([u8; 32]);

impl AccountId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        AccountId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0[..8]))
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        AccountId(bytes)
    }
}

impl FromStr for AccountId {
    type Err = AccountIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw).map_err(|e| AccountIdParseError::InvalidHex(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| AccountIdParseError::InvalidLength(b.len()))?;
        Ok(AccountId(bytes))
    }
}

// Full hex on the wire, short form only for display
impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(self.0)))
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountIdParseError {
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Invalid account length: {0} bytes (expected 32)")]
    InvalidLength(usize),
}
