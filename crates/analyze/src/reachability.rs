//! Reachability and payoff comparison per effective party.
//!
//! For a focal party, every state is `base + delta` where `base` sums the
//! weights of taken options the party does not control and `delta` sums
//! those it does. States sharing a base form a clique of mutually reachable
//! states. Irreversible options then remove every transition that moves
//! them against their permitted direction.

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::stability::MoveContext;
use gmcr_core::{
    ConflictModel, ConflictSnapshot, EffectiveParty, FeasibleSet, ModelError, Party,
    PermittedDirection,
};
use rayon::prelude::*;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ReachabilityMatrices {
    generation: u64,
    parties: Vec<EffectiveParty>,
    feasibles: FeasibleSet,
    /// `reachable[party][state]`: sorted target states.
    reachable: Vec<Vec<Vec<usize>>>,
}

/// All subset sums of `weights`, starting from 0.
fn subset_sums(weights: &[u64]) -> Vec<u64> {
    let mut sums = vec![0u64];
    for w in weights {
        sums = sums.iter().flat_map(|s| [*s, s + w]).collect();
    }
    sums
}

fn party_reachability(
    snapshot: &ConflictSnapshot,
    party: &EffectiveParty,
    irreversible: &[(usize, PermittedDirection)],
) -> Vec<Vec<usize>> {
    let feasibles = snapshot.feasibles();
    let focal: Vec<u64> = party.option_indices().iter().map(|i| 1u64 << i).collect();
    let other: Vec<u64> = snapshot
        .other_option_indices(party)
        .iter()
        .map(|i| 1u64 << i)
        .collect();
    let deltas = subset_sums(&focal);
    let bases = subset_sums(&other);

    let mut rows = vec![Vec::new(); feasibles.len()];
    for base in bases {
        let mut group: Vec<usize> = deltas
            .iter()
            .filter_map(|d| feasibles.index_of(base + d))
            .collect();
        group.sort_unstable();
        for &from in &group {
            rows[from] = group
                .iter()
                .copied()
                .filter(|&to| to != from)
                .filter(|&to| {
                    irreversible.iter().all(|&(opt, dir)| {
                        dir.allows(feasibles.is_taken(from, opt), feasibles.is_taken(to, opt))
                    })
                })
                .collect();
        }
    }
    rows
}

impl ReachabilityMatrices {
    /// Build the matrices for every effective party of a snapshot.
    pub fn build(
        snapshot: &ConflictSnapshot,
        config: &AnalysisConfig,
    ) -> Result<Self, AnalysisError> {
        if snapshot.state_count() == 0 {
            return Err(ModelError::NoFeasibleStates.into());
        }
        let parties = snapshot.effective_parties(config.use_coalitions);
        let irreversible: Vec<(usize, PermittedDirection)> = snapshot
            .options()
            .iter()
            .filter(|o| o.permitted_direction != PermittedDirection::Both)
            .map(|o| (o.master_index, o.permitted_direction))
            .collect();

        let build_one = |party: &EffectiveParty| party_reachability(snapshot, party, &irreversible);
        let reachable: Vec<Vec<Vec<usize>>> = if config.parallel {
            parties.par_iter().map(build_one).collect()
        } else {
            parties.iter().map(build_one).collect()
        };

        debug!(
            parties = parties.len(),
            states = snapshot.state_count(),
            irreversible = irreversible.len(),
            "built reachability matrices"
        );

        Ok(ReachabilityMatrices {
            generation: snapshot.generation(),
            parties,
            feasibles: snapshot.feasibles().clone(),
            reachable,
        })
    }

    /// Model generation the matrices were built from.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Fail with `StaleSnapshot` if the model has been edited since.
    pub fn ensure_current(&self, model: &ConflictModel) -> Result<(), AnalysisError> {
        if model.generation() == self.generation {
            Ok(())
        } else {
            Err(AnalysisError::StaleSnapshot {
                analysis: self.generation,
                model: model.generation(),
            })
        }
    }

    pub fn parties(&self) -> &[EffectiveParty] {
        &self.parties
    }

    pub fn party_count(&self) -> usize {
        self.parties.len()
    }

    pub fn state_count(&self) -> usize {
        self.feasibles.len()
    }

    pub fn feasibles(&self) -> &FeasibleSet {
        &self.feasibles
    }

    pub fn party(&self, index: usize) -> Result<&EffectiveParty, AnalysisError> {
        self.parties.get(index).ok_or(AnalysisError::UnknownParty {
            index,
            count: self.parties.len(),
        })
    }

    /// Index of the party with the given name (coalitions use the joined
    /// member names, e.g. `"A, B"`).
    pub fn party_index(&self, name: &str) -> Result<usize, AnalysisError> {
        self.parties
            .iter()
            .position(|p| p.name() == name)
            .ok_or_else(|| AnalysisError::UnknownPartyName(name.to_string()))
    }

    pub fn check_state(&self, state: usize) -> Result<(), AnalysisError> {
        if state < self.state_count() {
            Ok(())
        } else {
            Err(AnalysisError::UnknownState {
                state,
                count: self.state_count(),
            })
        }
    }

    /// States the party can move to from `state` in one unilateral move.
    pub fn reachable(&self, party: usize, state: usize) -> Result<&[usize], AnalysisError> {
        self.party(party)?;
        self.check_state(state)?;
        Ok(&self.reachable[party][state])
    }

    pub fn is_reachable(&self, party: usize, from: usize, to: usize) -> bool {
        self.reachable
            .get(party)
            .and_then(|rows| rows.get(from))
            .is_some_and(|row| row.binary_search(&to).is_ok())
    }

    /// Reachable states that the party strictly prefers to `reference`
    /// (default: `state` itself).
    pub fn unilateral_improvements(
        &self,
        party: usize,
        state: usize,
        reference: Option<usize>,
    ) -> Result<Vec<usize>, AnalysisError> {
        if let Some(r) = reference {
            self.check_state(r)?;
        }
        self.reachable(party, state)?;
        Ok(crate::stability::improvements(self, party, state, reference))
    }

    /// Signed preference change for the party moving `from` -> `to`.
    pub fn payoff_change(&self, party: usize, from: usize, to: usize) -> Result<i64, AnalysisError> {
        let p = self.party(party)?;
        self.check_state(from)?;
        self.check_state(to)?;
        Ok(p.compare(from, to))
    }

    /// Dense boolean form of a party's reachability.
    pub fn reachability_matrix(&self, party: usize) -> Result<Vec<Vec<bool>>, AnalysisError> {
        self.party(party)?;
        let n = self.state_count();
        Ok(self.reachable[party]
            .iter()
            .map(|row| {
                let mut dense = vec![false; n];
                for &to in row {
                    dense[to] = true;
                }
                dense
            })
            .collect())
    }

    /// Dense payoff comparison matrix: `[i][j]` is the preference change of
    /// moving from `i` to `j`.
    pub fn comparison_matrix(&self, party: usize) -> Result<Vec<Vec<i64>>, AnalysisError> {
        let p = self.party(party)?;
        let n = self.state_count();
        Ok((0..n)
            .map(|i| (0..n).map(|j| p.compare(i, j)).collect())
            .collect())
    }
}

impl MoveContext for ReachabilityMatrices {
    fn party_count(&self) -> usize {
        self.parties.len()
    }

    fn reachable_from(&self, party: usize, state: usize) -> &[usize] {
        &self.reachable[party][state]
    }

    fn compare(&self, party: usize, from: usize, to: usize) -> i64 {
        self.parties[party].compare(from, to)
    }

    fn decimal(&self, state: usize) -> u64 {
        self.feasibles.decimal[state]
    }

    fn state_index(&self, decimal: u64) -> Option<usize> {
        self.feasibles.index_of(decimal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmcr_core::{Condition, OptionId};

    fn two_dm_model(dir_a: PermittedDirection) -> (ConflictModel, OptionId, OptionId) {
        let mut model = ConflictModel::new();
        let a = model.add_option("a", dir_a).unwrap();
        let b = model.add_option("b", PermittedDirection::Both).unwrap();
        let dm1 = model.add_decision_maker("DM1");
        let dm2 = model.add_decision_maker("DM2");
        model.assign_option(dm1, a).unwrap();
        model.assign_option(dm2, b).unwrap();
        model
            .set_preferences(dm1, vec![Condition::simple(vec![(a, true)])])
            .unwrap();
        model
            .set_preferences(dm2, vec![Condition::simple(vec![(b, true)])])
            .unwrap();
        (model, a, b)
    }

    fn build(model: &ConflictModel) -> ReachabilityMatrices {
        ReachabilityMatrices::build(&model.snapshot().unwrap(), &AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn test_subset_sums() {
        assert_eq!(subset_sums(&[]), vec![0]);
        let mut sums = subset_sums(&[1, 4]);
        sums.sort_unstable();
        assert_eq!(sums, vec![0, 1, 4, 5]);
    }

    #[test]
    fn test_one_option_each() {
        let (model, _, _) = two_dm_model(PermittedDirection::Both);
        let rm = build(&model);
        // NN=0, YN=1, NY=2, YY=3; DM1 flips the first option only.
        assert_eq!(rm.reachable(0, 0).unwrap(), &[1]);
        assert_eq!(rm.reachable(0, 1).unwrap(), &[0]);
        assert_eq!(rm.reachable(0, 2).unwrap(), &[3]);
        assert_eq!(rm.reachable(0, 3).unwrap(), &[2]);
        assert_eq!(rm.reachable(1, 0).unwrap(), &[2]);
        assert_eq!(rm.reachable(1, 1).unwrap(), &[3]);
    }

    #[test]
    fn test_infeasible_state_shrinks_matrices() {
        let (mut model, a, b) = two_dm_model(PermittedDirection::Both);
        model
            .add_infeasible(Condition::simple(vec![(a, true), (b, true)]))
            .unwrap();
        let rm = build(&model);
        assert_eq!(rm.state_count(), 3);
        let dense = rm.reachability_matrix(0).unwrap();
        assert_eq!(dense.len(), 3);
        assert!(dense.iter().all(|row| row.len() == 3));
        assert_eq!(rm.reachable(0, 2).unwrap(), &[] as &[usize]);
        assert_eq!(rm.reachable(1, 0).unwrap(), &[2]);
    }

    #[test]
    fn test_forward_only_blocks_withdrawal() {
        let (model, _, _) = two_dm_model(PermittedDirection::Forward);
        let rm = build(&model);
        assert!(rm.is_reachable(0, 0, 1));
        assert!(!rm.is_reachable(0, 1, 0));
        assert!(!rm.is_reachable(0, 3, 2));
    }

    #[test]
    fn test_improvements_and_comparison() {
        let (model, _, _) = two_dm_model(PermittedDirection::Both);
        let rm = build(&model);
        // DM1 likes option a taken: 0 -> 1 improves, 1 -> 0 does not.
        assert_eq!(rm.unilateral_improvements(0, 0, None).unwrap(), vec![1]);
        assert!(rm.unilateral_improvements(0, 1, None).unwrap().is_empty());
        // From 1, moving to 0 is still worse than reference 1.
        assert!(rm.unilateral_improvements(0, 1, Some(1)).unwrap().is_empty());
        assert_eq!(rm.payoff_change(0, 0, 1).unwrap(), 1);
        assert_eq!(rm.comparison_matrix(0).unwrap()[1][0], -1);
    }

    #[test]
    fn test_invalid_arguments() {
        let (model, _, _) = two_dm_model(PermittedDirection::Both);
        let rm = build(&model);
        assert_eq!(
            rm.reachable(5, 0).unwrap_err(),
            AnalysisError::UnknownParty { index: 5, count: 2 }
        );
        assert_eq!(
            rm.reachable(0, 9).unwrap_err(),
            AnalysisError::UnknownState { state: 9, count: 4 }
        );
        assert!(matches!(
            rm.party_index("nobody"),
            Err(AnalysisError::UnknownPartyName(_))
        ));
    }

    #[test]
    fn test_party_without_options_has_no_moves() {
        let (mut model, _, _) = two_dm_model(PermittedDirection::Both);
        model.add_decision_maker("Bystander");
        let rm = build(&model);
        let bystander = rm.party_index("Bystander").unwrap();
        assert!((0..4).all(|s| rm.reachable(bystander, s).unwrap().is_empty()));
    }

    #[test]
    fn test_stale_generation_detected() {
        let (mut model, _, _) = two_dm_model(PermittedDirection::Both);
        let rm = build(&model);
        assert!(rm.ensure_current(&model).is_ok());
        model.add_decision_maker("Late");
        assert!(matches!(
            rm.ensure_current(&model),
            Err(AnalysisError::StaleSnapshot { .. })
        ));
    }
}
