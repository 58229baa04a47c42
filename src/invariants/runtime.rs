// Runtime invariants - Economic and consensus-power properties checked after each block

use super::context::BlockContext;
use super::registry::Invariant;
use crate::types::{Amount, STAKE_DENOM};

/// No account holds a negative amount of any coin
pub struct NonnegativeBalance;

impl Invariant for NonnegativeBalance {
    fn name(&self) -> &str {
        "nonnegative-balance"
    }

    fn check(&self, ctx: &BlockContext<'_>) -> Result<(), String> {
        for balance in ctx.bank.all_account_balances() {
            if let Some(coin) = balance.coins.iter().find(|c| c.is_negative()) {
                return Err(format!(
                    "negative balance for account {}: {}",
                    balance.account, coin
                ));
            }
        }
        Ok(())
    }
}

/// Each validator's reward accumulation equals the sum of its delegations' accumulations
pub struct ValidatorAccumConsistency;

impl Invariant for ValidatorAccumConsistency {
    fn name(&self) -> &str {
        "validator-accumulation"
    }

    fn check(&self, ctx: &BlockContext<'_>) -> Result<(), String> {
        for accum in ctx.distribution.pending_distribution_accumulation() {
            if ctx.stake.validator_power(&accum.validator).is_none() {
                return Err(format!(
                    "accumulation recorded for unknown validator {}",
                    accum.validator
                ));
            }
            if accum.validator_accum < 0 || accum.delegator_accums.iter().any(|a| *a < 0) {
                return Err(format!(
                    "negative accumulation for validator {}",
                    accum.validator
                ));
            }

            let delegated = accum
                .delegator_accums
                .iter()
                .try_fold(0 as Amount, |acc, a| acc.checked_add(*a))
                .ok_or_else(|| format!("accumulation overflow for validator {}", accum.validator))?;

            if delegated != accum.validator_accum {
                return Err(format!(
                    "validator {} accumulation {} != sum of delegator accumulations {}",
                    accum.validator, accum.validator_accum, delegated
                ));
            }
        }
        Ok(())
    }
}

/// Stake pool bookkeeping matches the tokens actually held
pub struct SupplyConservation;

impl Invariant for SupplyConservation {
    fn name(&self) -> &str {
        "supply-conservation"
    }

    fn check(&self, ctx: &BlockContext<'_>) -> Result<(), String> {
        let overflow = || "supply overflow while summing balances".to_string();

        let mut loose: Amount = 0;
        for balance in ctx.bank.all_account_balances() {
            for coin in balance.coins.iter().filter(|c| c.denom == STAKE_DENOM) {
                loose = loose.checked_add(coin.amount).ok_or_else(overflow)?;
            }
        }
        loose = loose
            .checked_add(ctx.stake.unbonding_supply())
            .and_then(|l| l.checked_add(ctx.distribution.outstanding_rewards()))
            .ok_or_else(overflow)?;

        let recorded_loose = ctx.stake.total_loose_supply();
        if loose != recorded_loose {
            return Err(format!(
                "loose token invariance: pool loose tokens {}, sum of account, unbonding and reward tokens {}",
                recorded_loose, loose
            ));
        }

        let bonded = ctx
            .stake
            .validators()
            .iter()
            .try_fold(0 as Amount, |acc, v| acc.checked_add(v.tokens))
            .ok_or_else(overflow)?;

        let recorded_bonded = ctx.stake.total_bonded_supply();
        if bonded != recorded_bonded {
            return Err(format!(
                "bonded token invariance: pool bonded tokens {}, sum of validator tokens {}",
                recorded_bonded, bonded
            ));
        }
        Ok(())
    }
}

/// Every bonded validator has positive voting power
pub struct PositivePower;

impl Invariant for PositivePower {
    fn name(&self) -> &str {
        "positive-power"
    }

    fn check(&self, ctx: &BlockContext<'_>) -> Result<(), String> {
        for validator in ctx.stake.validators() {
            if validator.power == 0 {
                return Err(format!("validator {} has non-positive power", validator.id));
            }
            match ctx.stake.validator_power(&validator.id) {
                Some(power) if power == validator.power => {}
                other => {
                    return Err(format!(
                        "validator {} power lookup {:?} disagrees with validator set {}",
                        validator.id, other, validator.power
                    ));
                }
            }
        }
        Ok(())
    }
}
