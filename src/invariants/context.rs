// Block context - Read-only views of bank, stake and distribution state
// Invariant checks treat these snapshots as ground truth for the current block.

use crate::types::{AccountId, Amount, BlockNumber, Coin, VotingPower};
use serde::{Deserialize, Serialize};

/// Balances held by one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub account: AccountId,
    /// Raw coins as stored; a corrupt store may hold negative amounts
    pub coins: Vec<Coin>,
}

/// Bonded validator as seen by the staking collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSnapshot {
    pub id: AccountId,
    /// Bonded tokens, in stake minimal units
    #[serde(with = "crate::types::coin::amount_str")]
    pub tokens: Amount,
    pub power: VotingPower,
}

/// Reward accumulation of a validator and of its delegations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorAccumulation {
    pub validator: AccountId,
    #[serde(with = "crate::types::coin::amount_str")]
    pub validator_accum: Amount,
    #[serde(with = "amount_vec_str")]
    pub delegator_accums: Vec<Amount>,
}

pub trait BankView {
    fn all_account_balances(&self) -> Vec<AccountBalance>;
}

pub trait StakeView {
    /// Tokens bonded to validators, as recorded by the stake pool
    fn total_bonded_supply(&self) -> Amount;
    /// Staking tokens not bonded, as recorded by the stake pool
    fn total_loose_supply(&self) -> Amount;
    /// Staking tokens currently unbonding
    fn unbonding_supply(&self) -> Amount;
    fn validators(&self) -> Vec<ValidatorSnapshot>;
    fn validator_power(&self, id: &AccountId) -> Option<VotingPower>;

    /// Voting power eligible in a governance tally
    fn total_voting_power(&self) -> VotingPower {
        self.validators()
            .iter()
            .fold(0u128, |acc, v| acc.saturating_add(v.power))
    }
}

pub trait DistributionView {
    fn pending_distribution_accumulation(&self) -> Vec<ValidatorAccumulation>;
    /// Staking tokens held by the distribution module awaiting withdrawal
    fn outstanding_rewards(&self) -> Amount;
}

/// Everything an invariant may read, frozen for the duration of the check
#[derive(Clone, Copy)]
pub struct BlockContext<'a> {
    pub height: BlockNumber,
    pub bank: &'a dyn BankView,
    pub stake: &'a dyn StakeView,
    pub distribution: &'a dyn DistributionView,
}

impl<'a> BlockContext<'a> {
    pub fn new(
        height: BlockNumber,
        bank: &'a dyn BankView,
        stake: &'a dyn StakeView,
        distribution: &'a dyn DistributionView,
    ) -> Self {
        Self {
            height,
            bank,
            stake,
            distribution,
        }
    }
}

mod amount_vec_str {
    use crate::types::Amount;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amounts: &[Amount], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(amounts.iter().map(|a| a.to_string()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Amount>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|s| s.parse().map_err(serde::de::Error::custom))
            .collect()
    }
}
