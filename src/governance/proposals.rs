// Proposals - Governance proposal lifecycle
// Deposit period -> voting period -> tally at voting end, per proposal tier

use super::params::{ProposalTier, TieredGovernanceParams};
use super::tally::{penalize_non_voters, tally, NonVoterPenalizer, TallyOutcome, VoteTally};
use crate::invariants::StakeView;
use crate::types::{AccountId, Coins, Timestamp, VotingPower, STAKE_DENOM};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::{debug, info};

/// Unique identifier for a proposal
pub type ProposalId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteOption {
    Yes,
    No,
    Abstain,
    NoWithVeto,
}

/// Current status of a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// Collecting deposits until `min_deposit` is reached
    DepositPeriod,

    /// Voting is active
    VotingPeriod,

    Passed,
    Rejected,
    Vetoed,
    FailedQuorum,

    /// Deposit period ended without reaching `min_deposit`
    Dropped,
}

impl ProposalStatus {
    /// Deposit or voting period; counts against the tier's concurrency limit
    pub fn is_open(&self) -> bool {
        matches!(self, ProposalStatus::DepositPeriod | ProposalStatus::VotingPeriod)
    }
}

impl From<TallyOutcome> for ProposalStatus {
    fn from(outcome: TallyOutcome) -> Self {
        match outcome {
            TallyOutcome::Passed => ProposalStatus::Passed,
            TallyOutcome::Rejected => ProposalStatus::Rejected,
            TallyOutcome::Vetoed => ProposalStatus::Vetoed,
            TallyOutcome::FailedQuorum => ProposalStatus::FailedQuorum,
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Record of a single vote
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRecord {
    pub voter: AccountId,
    pub option: VoteOption,
    /// Validator power at the time of the vote
    pub power: VotingPower,
    pub timestamp: Timestamp,
}

/// A governance proposal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub tier: ProposalTier,
    pub proposer: AccountId,
    pub title: String,
    pub status: ProposalStatus,

    pub submit_time: Timestamp,

    /// Deposits are refused from this time on
    pub deposit_end_time: Timestamp,

    /// Set when the deposit reaches `min_deposit`
    pub voting_start_time: Option<Timestamp>,
    pub voting_end_time: Option<Timestamp>,

    pub total_deposit: Coins,
    pub deposits: Vec<(AccountId, Coins)>,
    pub votes: Vec<VoteRecord>,

    /// Set once the voting period has been tallied
    pub final_tally: Option<VoteTally>,
}

impl Proposal {
    pub fn has_voted(&self, voter: &AccountId) -> bool {
        self.votes.iter().any(|v| &v.voter == voter)
    }

    pub fn is_voting_open(&self, now: Timestamp) -> bool {
        self.status == ProposalStatus::VotingPeriod
            && self.voting_end_time.map_or(false, |end| now < end)
    }

    /// Sum of recorded votes; `total_bonded_power` is left to the caller
    pub fn vote_tally(&self) -> VoteTally {
        let mut t = VoteTally::default();
        for vote in &self.votes {
            let slot = match vote.option {
                VoteOption::Yes => &mut t.yes,
                VoteOption::No => &mut t.no,
                VoteOption::Abstain => &mut t.abstain,
                VoteOption::NoWithVeto => &mut t.no_with_veto,
            };
            *slot = slot.saturating_add(vote.power);
        }
        t
    }

    fn start_voting(&mut self, now: Timestamp, params: &TieredGovernanceParams) {
        let period = params[self.tier].voting.voting_period.as_secs();
        self.status = ProposalStatus::VotingPeriod;
        self.voting_start_time = Some(now);
        self.voting_end_time = Some(now.saturating_add(period));
    }
}

/// Tracks proposals and drives them through their lifecycle
#[derive(Debug)]
pub struct GovernanceKeeper {
    proposals: BTreeMap<ProposalId, Proposal>,
    next_proposal_id: ProposalId,
}

impl GovernanceKeeper {
    pub fn new() -> Self {
        Self {
            proposals: BTreeMap::new(),
            next_proposal_id: 1,
        }
    }

    pub fn get_proposal(&self, id: ProposalId) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.values()
    }

    /// Proposals of `tier` still in deposit or voting period
    pub fn open_count(&self, tier: ProposalTier) -> usize {
        self.proposals
            .values()
            .filter(|p| p.tier == tier && p.status.is_open())
            .count()
    }

    /// Create a new proposal with an optional initial deposit
    pub fn submit(
        &mut self,
        tier: ProposalTier,
        proposer: AccountId,
        title: impl Into<String>,
        initial_deposit: Coins,
        now: Timestamp,
        params: &TieredGovernanceParams,
    ) -> Result<ProposalId, GovernanceError> {
        check_deposit_coins(&initial_deposit)?;

        let procedures = &params[tier];
        let max = procedures.voting.max_concurrent_proposals;
        if self.open_count(tier) as u64 >= max {
            return Err(GovernanceError::TooManyProposals { tier, max });
        }

        let id = self.next_proposal_id;
        self.next_proposal_id += 1;

        let deposit_period = procedures.deposit.max_deposit_period.as_secs();
        let mut proposal = Proposal {
            id,
            tier,
            proposer,
            title: title.into(),
            status: ProposalStatus::DepositPeriod,
            submit_time: now,
            deposit_end_time: now.saturating_add(deposit_period),
            voting_start_time: None,
            voting_end_time: None,
            total_deposit: initial_deposit.clone(),
            deposits: Vec::new(),
            votes: Vec::new(),
            final_tally: None,
        };
        if !initial_deposit.is_empty() {
            proposal.deposits.push((proposer, initial_deposit));
        }

        if proposal.total_deposit.covers(&procedures.deposit.min_deposit) {
            proposal.start_voting(now, params);
        }

        info!(
            proposal = id,
            %tier,
            proposer = %proposer,
            status = %proposal.status,
            "Proposal submitted"
        );
        self.proposals.insert(id, proposal);
        Ok(id)
    }

    /// Add to a proposal's deposit; returns the resulting status
    pub fn deposit(
        &mut self,
        id: ProposalId,
        depositor: AccountId,
        amount: Coins,
        now: Timestamp,
        params: &TieredGovernanceParams,
    ) -> Result<ProposalStatus, GovernanceError> {
        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;

        if proposal.status != ProposalStatus::DepositPeriod || now >= proposal.deposit_end_time {
            return Err(GovernanceError::DepositPeriodClosed(id));
        }
        check_deposit_coins(&amount)?;
        if amount.is_empty() {
            return Err(GovernanceError::InvalidDeposit("empty deposit".to_string()));
        }

        proposal.total_deposit = proposal.total_deposit.plus(&amount);
        proposal.deposits.push((depositor, amount));

        if proposal.total_deposit.covers(&params[proposal.tier].deposit.min_deposit) {
            proposal.start_voting(now, params);
            info!(proposal = id, total_deposit = %proposal.total_deposit, "Voting period started");
        }

        Ok(proposal.status)
    }

    /// Cast a vote weighted by the voter's validator power
    pub fn vote(
        &mut self,
        id: ProposalId,
        voter: AccountId,
        option: VoteOption,
        now: Timestamp,
        stake: &dyn StakeView,
    ) -> Result<(), GovernanceError> {
        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;

        if !proposal.is_voting_open(now) {
            return Err(GovernanceError::VotingClosed(id));
        }
        if proposal.has_voted(&voter) {
            return Err(GovernanceError::AlreadyVoted);
        }

        let power = stake
            .validator_power(&voter)
            .filter(|p| *p > 0)
            .ok_or(GovernanceError::NoVotingPower)?;

        proposal.votes.push(VoteRecord {
            voter,
            option,
            power,
            timestamp: now,
        });
        debug!(proposal = id, voter = %voter, ?option, power, "Vote recorded");
        Ok(())
    }

    /// Close expired deposit and voting periods.
    /// Returns the status transitions, in proposal id order.
    pub fn end_block(
        &mut self,
        now: Timestamp,
        stake: &dyn StakeView,
        params: &TieredGovernanceParams,
        penalizer: &mut dyn NonVoterPenalizer,
    ) -> Vec<(ProposalId, ProposalStatus)> {
        let mut transitions = Vec::new();

        for proposal in self.proposals.values_mut() {
            match proposal.status {
                ProposalStatus::DepositPeriod if now >= proposal.deposit_end_time => {
                    proposal.status = ProposalStatus::Dropped;
                    info!(
                        proposal = proposal.id,
                        total_deposit = %proposal.total_deposit,
                        "Proposal dropped, minimum deposit not reached"
                    );
                }
                ProposalStatus::VotingPeriod
                    if proposal.voting_end_time.map_or(false, |end| now >= end) =>
                {
                    let procedure = &params[proposal.tier].tallying;
                    let mut votes = proposal.vote_tally();
                    votes.total_bonded_power = stake.total_voting_power();

                    let result = tally(procedure, &votes);
                    proposal.status = result.outcome.into();
                    proposal.final_tally = Some(votes);

                    if result.outcome == TallyOutcome::FailedQuorum {
                        let voted: HashSet<AccountId> =
                            proposal.votes.iter().map(|v| v.voter).collect();
                        let validators: Vec<AccountId> =
                            stake.validators().iter().map(|v| v.id).collect();
                        let penalized =
                            penalize_non_voters(procedure, &validators, &voted, penalizer);
                        info!(
                            proposal = proposal.id,
                            penalized,
                            penalty = %procedure.penalty,
                            "Non-voting validators penalized"
                        );
                    }

                    info!(
                        proposal = proposal.id,
                        tier = %proposal.tier,
                        status = %proposal.status,
                        participation = %result.participation,
                        "Voting period ended"
                    );
                }
                _ => continue,
            }
            transitions.push((proposal.id, proposal.status));
        }

        transitions
    }
}

impl Default for GovernanceKeeper {
    fn default() -> Self {
        Self::new()
    }
}

/// Deposits are positive amounts of the staking denomination
fn check_deposit_coins(coins: &Coins) -> Result<(), GovernanceError> {
    match coins.iter().find(|c| c.denom != STAKE_DENOM || c.amount <= 0) {
        Some(bad) => Err(GovernanceError::InvalidDeposit(format!(
            "{} (deposits must be positive {})",
            bad, STAKE_DENOM
        ))),
        None => Ok(()),
    }
}

/// Governance errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GovernanceError {
    #[error("Proposal {0} not found")]
    ProposalNotFound(ProposalId),

    #[error("Invalid deposit: {0}")]
    InvalidDeposit(String),

    #[error("Too many open {tier} proposals (max {max})")]
    TooManyProposals { tier: ProposalTier, max: u64 },

    #[error("Deposit period of proposal {0} is closed")]
    DepositPeriodClosed(ProposalId),

    #[error("Voting on proposal {0} is closed")]
    VotingClosed(ProposalId),

    #[error("No voting power")]
    NoVotingPower,

    #[error("Already voted on this proposal")]
    AlreadyVoted,
}
