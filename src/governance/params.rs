// Tiered governance parameters
// One table of procedures per proposal tier, validated as a whole before any write.

use super::procedure::{DepositProcedure, TallyingProcedure, ValidationError, VotingProcedure};
use crate::types::{tokens, Coins, Fraction, STAKE_DENOM};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;
use std::time::Duration;

const ONE_DAY: Duration = Duration::from_secs(24 * 3600);
const TWO_DAYS: Duration = Duration::from_secs(2 * 24 * 3600);
const SIXTY_HOURS: Duration = Duration::from_secs(60 * 3600);
const THREE_DAYS: Duration = Duration::from_secs(3 * 24 * 3600);

/// Default minimum deposits, in whole staking tokens
pub const CRITICAL_DEPOSIT_TOKENS: i128 = 4_000;
pub const IMPORTANT_DEPOSIT_TOKENS: i128 = 2_000;
pub const NORMAL_DEPOSIT_TOKENS: i128 = 1_000;

/// Urgency class of a proposal, fixed at submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProposalTier {
    Critical,
    Important,
    Normal,
}

impl ProposalTier {
    /// Every tier, in validation and storage order
    pub const ALL: [ProposalTier; 3] = [
        ProposalTier::Critical,
        ProposalTier::Important,
        ProposalTier::Normal,
    ];

    pub const fn index(self) -> usize {
        match self {
            ProposalTier::Critical => 0,
            ProposalTier::Important => 1,
            ProposalTier::Normal => 2,
        }
    }

    /// Name used as the parameter key prefix
    pub const fn name(self) -> &'static str {
        match self {
            ProposalTier::Critical => "Critical",
            ProposalTier::Important => "Important",
            ProposalTier::Normal => "Normal",
        }
    }

    /// Floor for `max_concurrent_proposals`
    pub const fn min_max_num(self) -> u64 {
        match self {
            ProposalTier::Critical => 1,
            ProposalTier::Important => 2,
            ProposalTier::Normal => 1,
        }
    }
}

impl fmt::Display for ProposalTier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ProposalTier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProposalTier::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownTier(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown proposal tier '{0}' (expected critical, important or normal)")]
pub struct UnknownTier(pub String);

/// Deposit, voting and tallying procedures of one tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierProcedures {
    pub deposit: DepositProcedure,
    pub voting: VotingProcedure,
    pub tallying: TallyingProcedure,
}

impl TierProcedures {
    /// Validates deposit, then voting, then tallying
    pub fn validate(&self, tier: ProposalTier) -> Result<(), ValidationError> {
        self.deposit.validate()?;
        self.voting.validate(tier.min_max_num())?;
        self.tallying.validate()
    }

    fn defaults(tier: ProposalTier) -> Self {
        let (deposit_tokens, voting_period, tallying) = match tier {
            ProposalTier::Critical => (
                CRITICAL_DEPOSIT_TOKENS,
                THREE_DAYS,
                TallyingProcedure {
                    threshold: Fraction::from_prec(834, 3),
                    veto: Fraction::from_prec(334, 3),
                    participation: Fraction::from_prec(8572, 4),
                    penalty: Fraction::from_prec(9, 4),
                },
            ),
            ProposalTier::Important => (
                IMPORTANT_DEPOSIT_TOKENS,
                SIXTY_HOURS,
                TallyingProcedure {
                    threshold: Fraction::from_prec(8, 1),
                    veto: Fraction::from_prec(334, 3),
                    participation: Fraction::from_prec(834, 3),
                    penalty: Fraction::from_prec(7, 4),
                },
            ),
            ProposalTier::Normal => (
                NORMAL_DEPOSIT_TOKENS,
                TWO_DAYS,
                TallyingProcedure {
                    threshold: Fraction::from_prec(667, 3),
                    veto: Fraction::from_prec(334, 3),
                    participation: Fraction::from_prec(75, 2),
                    penalty: Fraction::from_prec(5, 4),
                },
            ),
        };

        Self {
            deposit: DepositProcedure {
                min_deposit: Coins::single(STAKE_DENOM, tokens(deposit_tokens)),
                max_deposit_period: ONE_DAY,
            },
            voting: VotingProcedure {
                voting_period,
                max_concurrent_proposals: tier.min_max_num(),
            },
            tallying,
        }
    }
}

/// The full governance parameter set: one `TierProcedures` per tier.
///
/// This is the unit persisted to the parameter store. Replacement is
/// all-or-nothing: a proposed set is validated in full before commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TieredParamsRepr", into = "TieredParamsRepr")]
pub struct TieredGovernanceParams {
    tiers: [TierProcedures; 3],
}

impl TieredGovernanceParams {
    pub fn new(critical: TierProcedures, important: TierProcedures, normal: TierProcedures) -> Self {
        Self {
            tiers: [critical, important, normal],
        }
    }

    /// Iterates tiers in Critical, Important, Normal order
    pub fn iter(&self) -> impl Iterator<Item = (ProposalTier, &TierProcedures)> {
        ProposalTier::ALL.into_iter().zip(self.tiers.iter())
    }

    /// Validates every tier in order, stopping at the first violation
    pub fn validate_all(&self) -> Result<(), ParamsValidationError> {
        for (tier, procedures) in self.iter() {
            procedures
                .validate(tier)
                .map_err(|error| ParamsValidationError { tier, error })?;
        }
        Ok(())
    }

    /// Consumes the set and returns it as proof of validation
    pub fn validated(self) -> Result<ValidatedParams, ParamsValidationError> {
        self.validate_all()?;
        Ok(ValidatedParams(self))
    }
}

impl Default for TieredGovernanceParams {
    fn default() -> Self {
        Self {
            tiers: ProposalTier::ALL.map(TierProcedures::defaults),
        }
    }
}

impl Index<ProposalTier> for TieredGovernanceParams {
    type Output = TierProcedures;

    fn index(&self, tier: ProposalTier) -> &TierProcedures {
        &self.tiers[tier.index()]
    }
}

impl IndexMut<ProposalTier> for TieredGovernanceParams {
    fn index_mut(&mut self, tier: ProposalTier) -> &mut TierProcedures {
        &mut self.tiers[tier.index()]
    }
}

/// A parameter set that passed `validate_all`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedParams(TieredGovernanceParams);

impl ValidatedParams {
    pub fn params(&self) -> &TieredGovernanceParams {
        &self.0
    }

    pub fn into_inner(self) -> TieredGovernanceParams {
        self.0
    }
}

impl std::ops::Deref for ValidatedParams {
    type Target = TieredGovernanceParams;

    fn deref(&self) -> &TieredGovernanceParams {
        &self.0
    }
}

/// First violation found in a parameter set, with its tier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{tier}: {error}")]
pub struct ParamsValidationError {
    pub tier: ProposalTier,
    #[source]
    pub error: ValidationError,
}

#[derive(Serialize, Deserialize)]
struct TieredParamsRepr {
    critical: TierProcedures,
    important: TierProcedures,
    normal: TierProcedures,
}

impl From<TieredParamsRepr> for TieredGovernanceParams {
    fn from(repr: TieredParamsRepr) -> Self {
        TieredGovernanceParams::new(repr.critical, repr.important, repr.normal)
    }
}

impl From<TieredGovernanceParams> for TieredParamsRepr {
    fn from(params: TieredGovernanceParams) -> Self {
        let [critical, important, normal] = params.tiers;
        TieredParamsRepr {
            critical,
            important,
            normal,
        }
    }
}
