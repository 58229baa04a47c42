// Tally - Decides the outcome of a closed voting period
//
// Evaluation order is fixed:
// 1. Quorum: participation below the tier minimum fails without looking at votes
// 2. Veto: NoWithVeto share at or above the veto fraction
// 3. Threshold: Yes share of (Yes + No) strictly above the threshold
//
// Boundary equality always takes the non-passing branch.

use super::procedure::TallyingProcedure;
use crate::types::{AccountId, Fraction, VotingPower};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Aggregated voting power per option, plus the power eligible to vote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub yes: VotingPower,
    pub no: VotingPower,
    pub abstain: VotingPower,
    pub no_with_veto: VotingPower,
    pub total_bonded_power: VotingPower,
}

impl VoteTally {
    /// Power that voted, any option
    pub fn total_votes(&self) -> VotingPower {
        self.yes
            .saturating_add(self.no)
            .saturating_add(self.abstain)
            .saturating_add(self.no_with_veto)
    }
}

/// Result of a tally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TallyOutcome {
    Passed,
    Rejected,
    Vetoed,
    FailedQuorum,
}

impl TallyOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, TallyOutcome::Passed)
    }
}

/// Outcome together with the inputs that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TallyResult {
    pub outcome: TallyOutcome,
    /// Share of bonded power that voted (zero when nothing is bonded)
    pub participation: Fraction,
    pub tally: VoteTally,
}

/// Computes the outcome of `tally` under `procedure`
pub fn tally(procedure: &TallyingProcedure, tally: &VoteTally) -> TallyResult {
    let voted = tally.total_votes();

    let participation = Fraction::new(voted, tally.total_bonded_power).unwrap_or_else(Fraction::zero);
    let outcome = decide(procedure, tally, voted, participation);

    debug!(
        ?outcome,
        %participation,
        yes = tally.yes,
        no = tally.no,
        abstain = tally.abstain,
        no_with_veto = tally.no_with_veto,
        "Tally computed"
    );

    TallyResult {
        outcome,
        participation,
        tally: *tally,
    }
}

fn decide(
    procedure: &TallyingProcedure,
    tally: &VoteTally,
    voted: VotingPower,
    participation: Fraction,
) -> TallyOutcome {
    if tally.total_bonded_power == 0 || participation < procedure.participation {
        return TallyOutcome::FailedQuorum;
    }

    // voted > 0 here: participation is positive after the quorum check
    if let Some(veto_ratio) = Fraction::new(tally.no_with_veto, voted) {
        if veto_ratio >= procedure.veto {
            return TallyOutcome::Vetoed;
        }
    }

    // Abstain is left out of the threshold denominator
    match Fraction::new(tally.yes, tally.yes.saturating_add(tally.no)) {
        Some(yes_ratio) if yes_ratio > procedure.threshold => TallyOutcome::Passed,
        _ => TallyOutcome::Rejected,
    }
}

/// Staking-side hook that charges validators who skipped a vote
pub trait NonVoterPenalizer {
    fn penalize(&mut self, validator: &AccountId, penalty: Fraction);
}

/// Invokes `penalizer` for every validator that did not vote.
/// Returns the number of validators penalized.
pub fn penalize_non_voters<'a>(
    procedure: &TallyingProcedure,
    validators: impl IntoIterator<Item = &'a AccountId>,
    voted: &HashSet<AccountId>,
    penalizer: &mut dyn NonVoterPenalizer,
) -> usize {
    let mut count = 0;
    for validator in validators {
        if !voted.contains(validator) {
            penalizer.penalize(validator, procedure.penalty);
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn procedure(threshold: Fraction, veto: Fraction, participation: Fraction) -> TallyingProcedure {
        TallyingProcedure {
            threshold,
            veto,
            participation,
            penalty: Fraction::from_prec(9, 4),
        }
    }

    fn half() -> Fraction {
        Fraction::from_prec(5, 1)
    }

    #[test]
    fn test_quorum_short_circuits() {
        let tp = procedure(half(), half(), half());
        let t = VoteTally { yes: 40, total_bonded_power: 100, ..Default::default() };
        let result = tally(&tp, &t);
        assert_eq!(result.outcome, TallyOutcome::FailedQuorum);
        assert_eq!(result.participation, Fraction::from_prec(4, 1));
    }

    #[test]
    fn test_quorum_boundary_is_met() {
        // participation exactly at the minimum is not below it
        let tp = procedure(half(), half(), half());
        let t = VoteTally { yes: 50, total_bonded_power: 100, ..Default::default() };
        assert_eq!(tally(&tp, &t).outcome, TallyOutcome::Passed);
    }

    #[test]
    fn test_nothing_bonded_fails_quorum() {
        let tp = procedure(half(), half(), half());
        let t = VoteTally::default();
        assert_eq!(tally(&tp, &t).outcome, TallyOutcome::FailedQuorum);
    }

    #[test]
    fn test_veto_boundary_inclusive() {
        let tp = procedure(half(), Fraction::from_prec(334, 3), half());
        let t = VoteTally {
            yes: 666,
            no_with_veto: 334,
            total_bonded_power: 1000,
            ..Default::default()
        };
        assert_eq!(tally(&tp, &t).outcome, TallyOutcome::Vetoed);

        let below = VoteTally { yes: 667, no_with_veto: 333, ..t };
        assert_eq!(tally(&tp, &below).outcome, TallyOutcome::Passed);
    }

    #[test]
    fn test_veto_counts_abstain_in_denominator() {
        let tp = procedure(half(), Fraction::from_prec(334, 3), half());
        let t = VoteTally {
            yes: 400,
            abstain: 300,
            no_with_veto: 300,
            total_bonded_power: 1000,
            ..Default::default()
        };
        // 300 / 1000 < 0.334, and yes / (yes + no) = 1
        assert_eq!(tally(&tp, &t).outcome, TallyOutcome::Passed);
    }

    #[test]
    fn test_threshold_strict() {
        let tp = procedure(half(), Fraction::from_prec(334, 3), Fraction::from_prec(1, 1));
        let tie = VoteTally { yes: 500, no: 500, total_bonded_power: 1000, ..Default::default() };
        assert_eq!(tally(&tp, &tie).outcome, TallyOutcome::Rejected);

        let over = VoteTally { yes: 501, no: 499, total_bonded_power: 1000, ..Default::default() };
        assert_eq!(tally(&tp, &over).outcome, TallyOutcome::Passed);
    }

    #[test]
    fn test_abstain_only_is_rejected() {
        let tp = procedure(half(), half(), half());
        let t = VoteTally { abstain: 90, total_bonded_power: 100, ..Default::default() };
        assert_eq!(tally(&tp, &t).outcome, TallyOutcome::Rejected);
    }

    #[test]
    fn test_large_powers_compare_exactly() {
        let tp = procedure(half(), half(), half());
        let big = u128::MAX / 8;
        let t = VoteTally { yes: big + 1, no: big, total_bonded_power: big * 3, ..Default::default() };
        assert_eq!(tally(&tp, &t).outcome, TallyOutcome::Passed);

        let tie = VoteTally { yes: big, no: big, ..t };
        assert_eq!(tally(&tp, &tie).outcome, TallyOutcome::Rejected);
    }

    struct Recorder(Vec<(AccountId, Fraction)>);

    impl NonVoterPenalizer for Recorder {
        fn penalize(&mut self, validator: &AccountId, penalty: Fraction) {
            self.0.push((*validator, penalty));
        }
    }

    #[test]
    fn test_penalize_only_non_voters() {
        let tp = procedure(half(), half(), half());
        let a = AccountId::from_bytes([1; 32]);
        let b = AccountId::from_bytes([2; 32]);
        let c = AccountId::from_bytes([3; 32]);
        let voted: HashSet<AccountId> = [b].into_iter().collect();

        let mut recorder = Recorder(Vec::new());
        let count = penalize_non_voters(&tp, [a, b, c].iter(), &voted, &mut recorder);

        assert_eq!(count, 2);
        assert_eq!(recorder.0, vec![(a, tp.penalty), (c, tp.penalty)]);
    }

    proptest! {
        #[test]
        fn prop_quorum_failure_ignores_composition(
            yes in 0u128..=40, no in 0u128..=40, veto in 0u128..=40,
        ) {
            let tp = procedure(half(), half(), half());
            let remaining = 40u128.saturating_sub(yes);
            let no = no.min(remaining);
            let veto = veto.min(remaining - no);
            let abstain = 40 - yes - no - veto;
            let t = VoteTally { yes, no, abstain, no_with_veto: veto, total_bonded_power: 100 };
            prop_assert_eq!(tally(&tp, &t).outcome, TallyOutcome::FailedQuorum);
        }

        #[test]
        fn prop_yes_above_threshold_passes(yes in 1u128..1_000, no in 0u128..1_000) {
            let tp = procedure(half(), Fraction::from_prec(334, 3), Fraction::from_prec(1, 2));
            let t = VoteTally { yes, no, total_bonded_power: yes + no, ..Default::default() };
            let expected = if yes > no { TallyOutcome::Passed } else { TallyOutcome::Rejected };
            prop_assert_eq!(tally(&tp, &t).outcome, expected);
        }
    }
}
