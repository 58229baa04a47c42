// Ledger snapshot - In-memory bank/stake/distribution state
// Loaded from JSON by the `check` command; also the fixture for invariant tests.

use super::context::{
    AccountBalance, BankView, BlockContext, DistributionView, StakeView, ValidatorAccumulation,
    ValidatorSnapshot,
};
use crate::types::coin::amount_str;
use crate::types::{AccountId, Amount, BlockNumber, Coin, VotingPower, STAKE_DENOM};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub height: BlockNumber,
    #[serde(default)]
    pub accounts: Vec<AccountBalance>,
    #[serde(default)]
    pub validators: Vec<ValidatorSnapshot>,
    #[serde(default)]
    pub accumulations: Vec<ValidatorAccumulation>,
    #[serde(default, with = "amount_str")]
    pub bonded_supply: Amount,
    #[serde(default, with = "amount_str")]
    pub loose_supply: Amount,
    #[serde(default, with = "amount_str")]
    pub unbonding_supply: Amount,
    #[serde(default, with = "amount_str")]
    pub outstanding_rewards: Amount,
}

impl LedgerSnapshot {
    pub fn new(height: BlockNumber) -> Self {
        Self {
            height,
            ..Default::default()
        }
    }

    /// Load a snapshot from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SnapshotError::Read(format!("{}: {}", path.as_ref().display(), e)))?;
        serde_json::from_str(&content).map_err(|e| SnapshotError::Parse(e.to_string()))
    }

    /// Credit `coin` to `account`, keeping the loose supply in step
    pub fn fund(&mut self, account: AccountId, coin: Coin) -> &mut Self {
        if coin.denom == STAKE_DENOM {
            self.loose_supply = self.loose_supply.saturating_add(coin.amount);
        }
        match self.accounts.iter_mut().find(|a| a.account == account) {
            Some(existing) => existing.coins.push(coin),
            None => self.accounts.push(AccountBalance {
                account,
                coins: vec![coin],
            }),
        }
        self
    }

    /// Add a bonded validator, keeping the bonded supply in step
    pub fn bond(&mut self, id: AccountId, tokens: Amount, power: VotingPower) -> &mut Self {
        self.bonded_supply = self.bonded_supply.saturating_add(tokens);
        self.validators.push(ValidatorSnapshot { id, tokens, power });
        self
    }

    /// Record reward accumulation for a validator and its delegations
    pub fn accumulate(&mut self, validator: AccountId, delegator_accums: Vec<Amount>) -> &mut Self {
        let validator_accum = delegator_accums.iter().sum();
        self.accumulations.push(ValidatorAccumulation {
            validator,
            validator_accum,
            delegator_accums,
        });
        self
    }

    /// Add outstanding rewards held by distribution, keeping the loose supply in step
    pub fn hold_rewards(&mut self, amount: Amount) -> &mut Self {
        self.outstanding_rewards = self.outstanding_rewards.saturating_add(amount);
        self.loose_supply = self.loose_supply.saturating_add(amount);
        self
    }

    pub fn context(&self) -> BlockContext<'_> {
        BlockContext::new(self.height, self, self, self)
    }
}

impl BankView for LedgerSnapshot {
    fn all_account_balances(&self) -> Vec<AccountBalance> {
        self.accounts.clone()
    }
}

impl StakeView for LedgerSnapshot {
    fn total_bonded_supply(&self) -> Amount {
        self.bonded_supply
    }

    fn total_loose_supply(&self) -> Amount {
        self.loose_supply
    }

    fn unbonding_supply(&self) -> Amount {
        self.unbonding_supply
    }

    fn validators(&self) -> Vec<ValidatorSnapshot> {
        self.validators.clone()
    }

    fn validator_power(&self, id: &AccountId) -> Option<VotingPower> {
        self.validators.iter().find(|v| &v.id == id).map(|v| v.power)
    }
}

impl DistributionView for LedgerSnapshot {
    fn pending_distribution_accumulation(&self) -> Vec<ValidatorAccumulation> {
        self.accumulations.clone()
    }

    fn outstanding_rewards(&self) -> Amount {
        self.outstanding_rewards
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Failed to read snapshot: {0}")]
    Read(String),

    #[error("Failed to parse snapshot: {0}")]
    Parse(String),
}
