//! Immutable analysis view of a conflict model.

use crate::feasible::FeasibleSet;
use crate::model::ConflictModel;
use crate::option::PermittedDirection;
use crate::party::{CoalitionProfile, DecisionMakerProfile, EffectiveParty, Party};
use crate::pattern::dec_to_yn;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionSummary {
    pub name: String,
    pub permitted_direction: PermittedDirection,
    pub master_index: usize,
}

/// Everything the solvers read, resolved at one model generation.
#[derive(Debug, Clone, Serialize)]
pub struct ConflictSnapshot {
    generation: u64,
    options: Vec<OptionSummary>,
    feasibles: FeasibleSet,
    decision_makers: Vec<DecisionMakerProfile>,
    coalitions: Vec<Vec<usize>>,
}

impl ConflictSnapshot {
    pub(crate) fn new(
        generation: u64,
        options: Vec<OptionSummary>,
        feasibles: FeasibleSet,
        decision_makers: Vec<DecisionMakerProfile>,
        coalitions: Vec<Vec<usize>>,
    ) -> Self {
        ConflictSnapshot {
            generation,
            options,
            feasibles,
            decision_makers,
            coalitions,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the model has not been edited since this snapshot was taken.
    pub fn is_current(&self, model: &ConflictModel) -> bool {
        model.generation() == self.generation
    }

    pub fn options(&self) -> &[OptionSummary] {
        &self.options
    }

    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    pub fn feasibles(&self) -> &FeasibleSet {
        &self.feasibles
    }

    pub fn state_count(&self) -> usize {
        self.feasibles.len()
    }

    pub fn decision_makers(&self) -> &[DecisionMakerProfile] {
        &self.decision_makers
    }

    pub fn coalitions(&self) -> &[Vec<usize>] {
        &self.coalitions
    }

    /// Y/N string of a feasible state.
    pub fn yn(&self, state: usize) -> String {
        dec_to_yn(self.feasibles.decimal[state], self.options.len())
    }

    /// Parties the solvers iterate over.
    ///
    /// With coalitions on, each coalition group becomes one party; a group of
    /// one is just that decision maker. With coalitions off every decision
    /// maker stands alone.
    pub fn effective_parties(&self, use_coalitions: bool) -> Vec<EffectiveParty> {
        if !use_coalitions {
            return self
                .decision_makers
                .iter()
                .cloned()
                .map(EffectiveParty::DecisionMaker)
                .collect();
        }
        self.coalitions
            .iter()
            .filter_map(|group| match group.as_slice() {
                [single] => self
                    .decision_makers
                    .get(*single)
                    .cloned()
                    .map(EffectiveParty::DecisionMaker),
                members => {
                    let profiles: Vec<&DecisionMakerProfile> = members
                        .iter()
                        .filter_map(|m| self.decision_makers.get(*m))
                        .collect();
                    Some(EffectiveParty::Coalition(CoalitionProfile::new(&profiles)))
                }
            })
            .collect()
    }

    /// Master indices of every option the party does not control, including
    /// options no decision maker controls.
    pub fn other_option_indices(&self, party: &impl Party) -> Vec<usize> {
        let focal = party.option_indices();
        (0..self.options.len()).filter(|i| !focal.contains(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;

    fn three_party_model() -> ConflictModel {
        let mut model = ConflictModel::new();
        let a = model.add_option("a", PermittedDirection::Both).unwrap();
        let b = model.add_option("b", PermittedDirection::Both).unwrap();
        let c = model.add_option("c", PermittedDirection::Both).unwrap();
        model.add_option("free", PermittedDirection::Both).unwrap();
        for (name, opt) in [("A", a), ("B", b), ("C", c)] {
            let dm = model.add_decision_maker(name);
            model.assign_option(dm, opt).unwrap();
            model
                .set_preferences(dm, vec![Condition::simple(vec![(opt, true)])])
                .unwrap();
        }
        model
    }

    #[test]
    fn test_effective_parties_follow_coalitions() {
        let mut model = three_party_model();
        model.set_coalitions(vec![vec![0, 2], vec![1]]).unwrap();
        let snap = model.snapshot().unwrap();

        let parties = snap.effective_parties(true);
        assert_eq!(parties.len(), 2);
        assert!(parties[0].is_coalition());
        assert_eq!(parties[0].name(), "A, C");
        assert_eq!(parties[0].option_indices(), &[0, 2]);
        assert!(!parties[1].is_coalition());

        let parties = snap.effective_parties(false);
        assert_eq!(parties.len(), 3);
        assert!(parties.iter().all(|p| !p.is_coalition()));
    }

    #[test]
    fn test_other_options_include_uncontrolled() {
        let model = three_party_model();
        let snap = model.snapshot().unwrap();
        let parties = snap.effective_parties(true);
        assert_eq!(snap.other_option_indices(&parties[0]), vec![1, 2, 3]);
    }

    #[test]
    fn test_snapshot_goes_stale_after_edit() {
        let mut model = three_party_model();
        let snap = model.snapshot().unwrap();
        assert!(snap.is_current(&model));
        model.add_decision_maker("D");
        assert!(!snap.is_current(&model));
    }

    #[test]
    fn test_yn_uses_master_order() {
        let model = three_party_model();
        let snap = model.snapshot().unwrap();
        assert_eq!(snap.state_count(), 16);
        assert_eq!(snap.yn(5), "YNYN");
    }
}
