// Parameter store - Governance parameter subspace over a key/value store
//
// Layout: one entry per (tier, field) under the `gov/` prefix, 24 keys in total,
// e.g. `gov/CriticalThreshold`. Values are JSON: periods as whole seconds, the
// deposit as a coin list, fractions as decimal strings, max-num as an integer.
//
// This layer only marshals. Validation happens before a set reaches `set`,
// which is why it takes `ValidatedParams`.

use super::db::{DatabaseError, KvStore, WriteOp};
use crate::governance::{
    DepositProcedure, ParamsValidationError, ProposalTier, TallyingProcedure, TierProcedures,
    TieredGovernanceParams, ValidatedParams, VotingProcedure,
};
use crate::types::{Coins, Fraction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Key prefix of the governance parameter subspace
pub const GOV_SUBSPACE: &[u8] = b"gov/";

/// One stored field of a tier's procedures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamField {
    DepositPeriod,
    MinDeposit,
    VotingPeriod,
    MaxNum,
    Threshold,
    Veto,
    Participation,
    Penalty,
}

impl ParamField {
    pub const ALL: [ParamField; 8] = [
        ParamField::DepositPeriod,
        ParamField::MinDeposit,
        ParamField::VotingPeriod,
        ParamField::MaxNum,
        ParamField::Threshold,
        ParamField::Veto,
        ParamField::Participation,
        ParamField::Penalty,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            ParamField::DepositPeriod => "DepositPeriod",
            ParamField::MinDeposit => "MinDeposit",
            ParamField::VotingPeriod => "VotingPeriod",
            ParamField::MaxNum => "MaxNum",
            ParamField::Threshold => "Threshold",
            ParamField::Veto => "Veto",
            ParamField::Participation => "Participation",
            ParamField::Penalty => "Penalty",
        }
    }
}

/// Stable name of a parameter, without the subspace prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamKey {
    pub tier: ProposalTier,
    pub field: ParamField,
}

impl ParamKey {
    pub fn new(tier: ProposalTier, field: ParamField) -> Self {
        Self { tier, field }
    }

    /// All 24 keys, tier-major
    pub fn all() -> impl Iterator<Item = ParamKey> {
        ProposalTier::ALL
            .into_iter()
            .flat_map(|tier| ParamField::ALL.into_iter().map(move |field| ParamKey { tier, field }))
    }

    /// Full store key, prefix included
    pub fn store_key(&self) -> Vec<u8> {
        let mut key = GOV_SUBSPACE.to_vec();
        key.extend_from_slice(self.to_string().as_bytes());
        key
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.tier.name(), self.field.name())
    }
}

impl FromStr for ParamKey {
    type Err = StoreError;

    /// Accepts `CriticalThreshold` as well as `gov/CriticalThreshold`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_prefix("gov/").unwrap_or(s);
        ParamKey::all()
            .find(|k| k.to_string() == name)
            .ok_or_else(|| StoreError::UnknownKey(s.to_string()))
    }
}

/// Governance parameters persisted in a `KvStore`
pub struct GovParamStore<S> {
    db: S,
}

impl<S: KvStore> GovParamStore<S> {
    pub fn new(db: S) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &S {
        &self.db
    }

    /// Loads one tier's procedures
    pub fn get(&self, tier: ProposalTier) -> Result<TierProcedures, StoreError> {
        let read_secs = |field| -> Result<Duration, StoreError> {
            self.read::<u64>(ParamKey::new(tier, field)).map(Duration::from_secs)
        };
        let read_fraction = |field| self.read::<Fraction>(ParamKey::new(tier, field));

        Ok(TierProcedures {
            deposit: DepositProcedure {
                min_deposit: self.read::<Coins>(ParamKey::new(tier, ParamField::MinDeposit))?,
                max_deposit_period: read_secs(ParamField::DepositPeriod)?,
            },
            voting: VotingProcedure {
                voting_period: read_secs(ParamField::VotingPeriod)?,
                max_concurrent_proposals: self.read::<u64>(ParamKey::new(tier, ParamField::MaxNum))?,
            },
            tallying: TallyingProcedure {
                threshold: read_fraction(ParamField::Threshold)?,
                veto: read_fraction(ParamField::Veto)?,
                participation: read_fraction(ParamField::Participation)?,
                penalty: read_fraction(ParamField::Penalty)?,
            },
        })
    }

    /// Loads the whole tiered set
    pub fn get_all(&self) -> Result<TieredGovernanceParams, StoreError> {
        Ok(TieredGovernanceParams::new(
            self.get(ProposalTier::Critical)?,
            self.get(ProposalTier::Important)?,
            self.get(ProposalTier::Normal)?,
        ))
    }

    /// Writes every key of `params` in one atomic batch
    pub fn set(&self, params: &ValidatedParams) -> Result<(), StoreError> {
        let mut ops = Vec::with_capacity(24);
        for (tier, procedures) in params.iter() {
            for field in ParamField::ALL {
                let key = ParamKey::new(tier, field);
                let value = encode_field(key, procedures)?;
                ops.push(WriteOp::Put {
                    key: key.store_key(),
                    value,
                });
            }
        }

        let count = ops.len();
        self.db.batch_write(ops)?;
        debug!(keys = count, "Governance parameters written");
        Ok(())
    }

    /// True when no governance key has been written yet
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.db.scan_prefix(GOV_SUBSPACE)?.is_empty())
    }

    /// Writes the defaults into an empty subspace.
    /// Returns false and leaves the store untouched when parameters already exist.
    pub fn init_genesis(&self) -> Result<bool, StoreError> {
        if !self.is_empty()? {
            info!("Governance parameters already initialized, keeping stored values");
            return Ok(false);
        }

        let defaults = TieredGovernanceParams::default()
            .validated()
            .map_err(StoreError::InvalidDefaults)?;
        self.set(&defaults)?;
        info!("Governance parameters initialized with defaults");
        Ok(true)
    }

    /// Validates a proposed set and commits it; nothing is written on rejection
    pub fn apply_param_change(
        &self,
        proposed: TieredGovernanceParams,
    ) -> Result<ValidatedParams, ParamChangeError> {
        let validated = proposed.validated()?;
        self.set(&validated)?;
        info!("Governance parameter change applied");
        Ok(validated)
    }

    /// Stored raw value of `key`
    pub fn raw(&self, key: ParamKey) -> Result<Vec<u8>, StoreError> {
        self.db
            .get(&key.store_key())?
            .ok_or_else(|| StoreError::MissingKey(key.to_string()))
    }

    fn read<T: DeserializeOwned>(&self, key: ParamKey) -> Result<T, StoreError> {
        let bytes = self.raw(key)?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Codec {
            key: key.to_string(),
            message: e.to_string(),
        })
    }
}

fn encode_field(key: ParamKey, procedures: &TierProcedures) -> Result<Vec<u8>, StoreError> {
    fn json<T: Serialize + ?Sized>(key: ParamKey, value: &T) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(value).map_err(|e| StoreError::Codec {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    let tallying = &procedures.tallying;
    match key.field {
        ParamField::DepositPeriod => json(key, &procedures.deposit.max_deposit_period.as_secs()),
        ParamField::MinDeposit => json(key, &procedures.deposit.min_deposit),
        ParamField::VotingPeriod => json(key, &procedures.voting.voting_period.as_secs()),
        ParamField::MaxNum => json(key, &procedures.voting.max_concurrent_proposals),
        ParamField::Threshold => json(key, &tallying.threshold),
        ParamField::Veto => json(key, &tallying.veto),
        ParamField::Participation => json(key, &tallying.participation),
        ParamField::Penalty => json(key, &tallying.penalty),
    }
}

/// Renders a stored value for display, e.g. `72h0m0s` or `1000000000000000000000stake-atto`
pub fn describe(key: &str, bytes: &[u8]) -> Result<String, StoreError> {
    let key: ParamKey = key.parse()?;
    let codec = |e: serde_json::Error| StoreError::Codec {
        key: key.to_string(),
        message: e.to_string(),
    };

    let rendered = match key.field {
        ParamField::DepositPeriod | ParamField::VotingPeriod => {
            let secs: u64 = serde_json::from_slice(bytes).map_err(codec)?;
            format_duration(secs)
        }
        ParamField::MinDeposit => serde_json::from_slice::<Coins>(bytes).map_err(codec)?.to_string(),
        ParamField::MaxNum => serde_json::from_slice::<u64>(bytes).map_err(codec)?.to_string(),
        ParamField::Threshold | ParamField::Veto | ParamField::Participation | ParamField::Penalty => {
            serde_json::from_slice::<Fraction>(bytes).map_err(codec)?.to_string()
        }
    };
    Ok(rendered)
}

/// `90061` -> `25h1m1s`, `60` -> `1m0s`, `20` -> `20s`
fn format_duration(secs: u64) -> String {
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Missing parameter key: {0}")]
    MissingKey(String),

    #[error("Malformed value for {key}: {message}")]
    Codec { key: String, message: String },

    #[error("Unknown parameter key: {0}")]
    UnknownKey(String),

    #[error("Default parameters failed validation: {0}")]
    InvalidDefaults(ParamsValidationError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Why a parameter-change proposal was not applied
#[derive(Debug, thiserror::Error)]
pub enum ParamChangeError {
    #[error("Parameter change rejected: {0}")]
    Rejected(#[from] ParamsValidationError),

    #[error("Parameter change not stored: {0}")]
    Store(#[from] StoreError),
}
