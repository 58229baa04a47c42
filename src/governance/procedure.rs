// Procedures - Deposit, voting and tallying rules of one proposal tier
// Each validator is pure and reports the first violation in field order.

use crate::types::{tokens, Amount, Coins, Fraction, STAKE_DENOM};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Lowest accepted minimum deposit, in whole staking tokens
pub const LOWER_BOUND_DEPOSIT_TOKENS: i128 = 10;

/// Highest accepted minimum deposit, in whole staking tokens
pub const UPPER_BOUND_DEPOSIT_TOKENS: i128 = 10_000;

/// Shortest accepted deposit or voting period
pub const MIN_PERIOD: Duration = Duration::from_secs(20);

/// Longest accepted deposit or voting period (3 days)
pub const MAX_PERIOD: Duration = Duration::from_secs(3 * 24 * 3600);

/// Rules for funding a proposal before it may enter voting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositProcedure {
    /// Minimum total deposit to activate voting
    pub min_deposit: Coins,
    /// Time allowed to reach `min_deposit`
    #[serde(with = "duration_secs")]
    pub max_deposit_period: Duration,
}

impl DepositProcedure {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.min_deposit.is_empty() {
            return Err(ValidationError::MissingDeposit);
        }
        if let Some(coin) = self.min_deposit.iter().find(|c| c.denom != STAKE_DENOM) {
            return Err(ValidationError::WrongDenom {
                expected: STAKE_DENOM.to_string(),
                found: coin.denom.clone(),
            });
        }

        let amount = self.min_deposit.amount_of(STAKE_DENOM);
        if amount < tokens(LOWER_BOUND_DEPOSIT_TOKENS) || amount > tokens(UPPER_BOUND_DEPOSIT_TOKENS) {
            return Err(ValidationError::DepositOutOfRange { amount });
        }

        check_period(PeriodKind::Deposit, self.max_deposit_period)
    }
}

/// Rules for the voting window of a tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingProcedure {
    /// Length of the voting window
    #[serde(with = "duration_secs")]
    pub voting_period: Duration,
    /// Proposals of this tier that may be open at the same time
    pub max_concurrent_proposals: u64,
}

impl VotingProcedure {
    /// `min_num` is the tier-specific floor for `max_concurrent_proposals`
    pub fn validate(&self, min_num: u64) -> Result<(), ValidationError> {
        check_period(PeriodKind::Voting, self.voting_period)?;

        if self.max_concurrent_proposals < min_num {
            return Err(ValidationError::MaxNumTooLow {
                min: min_num,
                found: self.max_concurrent_proposals,
            });
        }
        Ok(())
    }
}

/// Decision thresholds applied when a voting period closes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyingProcedure {
    /// Yes share of (yes + no) that must be exceeded to pass
    pub threshold: Fraction,
    /// NoWithVeto share of all votes that vetoes the proposal
    pub veto: Fraction,
    /// Share of bonded power that must vote for the tally to count
    pub participation: Fraction,
    /// Stake fraction charged to validators that did not vote
    pub penalty: Fraction,
}

impl TallyingProcedure {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            (TallyField::Threshold, self.threshold),
            (TallyField::Veto, self.veto),
            (TallyField::Participation, self.participation),
            (TallyField::Penalty, self.penalty),
        ];
        for (field, value) in fields {
            if !value.is_open_unit() {
                return Err(ValidationError::FractionOutOfRange { field, value });
            }
        }
        Ok(())
    }
}

fn check_period(kind: PeriodKind, period: Duration) -> Result<(), ValidationError> {
    if period < MIN_PERIOD || period > MAX_PERIOD {
        return Err(ValidationError::PeriodOutOfRange {
            kind,
            secs: period.as_secs(),
        });
    }
    Ok(())
}

/// Which period failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodKind {
    Deposit,
    Voting,
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PeriodKind::Deposit => write!(f, "MaxDepositPeriod"),
            PeriodKind::Voting => write!(f, "VotingPeriod"),
        }
    }
}

/// Tallying fields, in validation order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TallyField {
    Threshold,
    Veto,
    Participation,
    Penalty,
}

impl fmt::Display for TallyField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            TallyField::Threshold => "threshold",
            TallyField::Veto => "veto",
            TallyField::Participation => "participation",
            TallyField::Penalty => "penalty",
        };
        write!(f, "{}", name)
    }
}

/// Field-level rejection of a procedure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("MinDeposit is empty")]
    MissingDeposit,

    #[error("MinDeposit should be {expected}, found {found}")]
    WrongDenom { expected: String, found: String },

    #[error("MinDeposit amount {amount} should be between 10 and 10000 whole tokens")]
    DepositOutOfRange { amount: Amount },

    #[error("{kind} ({secs}s) should be between 20s and 259200s")]
    PeriodOutOfRange { kind: PeriodKind, secs: u64 },

    #[error("Max concurrent proposals should be no less than {min}, found {found}")]
    MaxNumTooLow { min: u64, found: u64 },

    #[error("Invalid {field} ({value}): should be between 0 and 1")]
    FractionOutOfRange { field: TallyField, value: Fraction },
}

/// Durations travel as whole seconds
pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
