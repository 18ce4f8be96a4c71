//! The editable conflict model.
//!
//! Every structural edit goes through a method here so the model can bump
//! its generation counter and recompute the feasible state set in one place.
//! Analysis never reads the model directly; it takes a [`ConflictSnapshot`]
//! which records the generation it was taken at.

use crate::condition::{self, Condition};
use crate::error::ModelError;
use crate::feasible::FeasibleSet;
use crate::option::{OptionId, OptionList, PermittedDirection};
use crate::party::{DecisionMaker, DecisionMakerProfile};
use crate::preference::{payoffs_from_priorities, Ranking};
use crate::snapshot::{ConflictSnapshot, OptionSummary};
use tracing::{debug, warn};

/// Largest option count a `u64` state bitfield can hold.
pub const MAX_OPTIONS: usize = 63;

/// Most preference statements one decision maker may hold. Priority weights
/// run up to `2^(n-1)`, so payoffs and their differences stay within `i64`.
pub const MAX_PREFERENCES: usize = 63;

#[derive(Debug, Clone, Default)]
pub struct ConflictModel {
    options: OptionList,
    decision_makers: Vec<DecisionMaker>,
    infeasibles: Vec<Condition>,
    /// Explicit coalition groups (decision maker indices). `None` means one
    /// singleton coalition per decision maker.
    coalitions: Option<Vec<Vec<usize>>>,
    use_manual_ranking: bool,
    feasibles: FeasibleSet,
    /// States removed by each infeasible condition, index-aligned.
    states_removed: Vec<u64>,
    generation: u64,
}

impl ConflictModel {
    pub fn new() -> Self {
        let mut model = ConflictModel::default();
        model.recalculate_feasible_states(true);
        model
    }

    // ── Read access ──────────────────────────────────────────────────

    pub fn options(&self) -> &OptionList {
        &self.options
    }

    pub fn decision_makers(&self) -> &[DecisionMaker] {
        &self.decision_makers
    }

    pub fn decision_maker(&self, index: usize) -> Result<&DecisionMaker, ModelError> {
        self.decision_makers
            .get(index)
            .ok_or(ModelError::UnknownDecisionMaker {
                index,
                count: self.decision_makers.len(),
            })
    }

    pub fn infeasibles(&self) -> &[Condition] {
        &self.infeasibles
    }

    pub fn states_removed(&self) -> &[u64] {
        &self.states_removed
    }

    pub fn coalitions(&self) -> Option<&[Vec<usize>]> {
        self.coalitions.as_deref()
    }

    pub fn use_manual_ranking(&self) -> bool {
        self.use_manual_ranking
    }

    pub fn feasibles(&self) -> &FeasibleSet {
        &self.feasibles
    }

    /// Monotonic counter bumped by every edit.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ── Options ──────────────────────────────────────────────────────

    pub fn add_option(
        &mut self,
        name: impl Into<String>,
        direction: PermittedDirection,
    ) -> Result<OptionId, ModelError> {
        if self.options.len() >= MAX_OPTIONS {
            return Err(ModelError::TooManyOptions {
                count: self.options.len() + 1,
                max: MAX_OPTIONS,
            });
        }
        let id = self.options.push(name, direction);
        self.touch();
        Ok(id)
    }

    /// Remove an option from the conflict, from every decision maker that
    /// controls it, and prune every condition that referenced it.
    pub fn remove_option(&mut self, id: OptionId) -> Result<(), ModelError> {
        self.options
            .remove(id)
            .ok_or(ModelError::UnknownOption(id))?;
        for dm in &mut self.decision_makers {
            dm.options.retain(|o| *o != id);
        }
        let pruned = condition::prune_invalid(&mut self.infeasibles, &self.options);
        if pruned > 0 {
            warn!(option = %id, pruned, "pruned infeasible conditions referencing removed option");
        }
        for dm in &mut self.decision_makers {
            let pruned = condition::prune_invalid(&mut dm.preferences, &self.options);
            if pruned > 0 {
                warn!(dm = %dm.name, option = %id, pruned, "pruned preferences referencing removed option");
            }
        }
        self.touch();
        Ok(())
    }

    pub fn set_permitted_direction(
        &mut self,
        id: OptionId,
        direction: PermittedDirection,
    ) -> Result<(), ModelError> {
        let option = self
            .options
            .get_mut(id)
            .ok_or(ModelError::UnknownOption(id))?;
        option.permitted_direction = direction;
        self.touch();
        Ok(())
    }

    /// Reorder the master option list so decision makers' options come
    /// first, grouped by decision maker in decision maker order.
    pub fn reorder_options_by_dm(&mut self) {
        let mut order: Vec<OptionId> = Vec::new();
        for dm in &self.decision_makers {
            for id in &dm.options {
                if !order.contains(id) {
                    order.push(*id);
                }
            }
        }
        self.options.reorder_front(&order);
        self.touch();
    }

    // ── Decision makers ──────────────────────────────────────────────

    pub fn add_decision_maker(&mut self, name: impl Into<String>) -> usize {
        self.decision_makers.push(DecisionMaker::new(name));
        if let Some(groups) = &mut self.coalitions {
            groups.push(vec![self.decision_makers.len() - 1]);
        }
        self.touch();
        self.decision_makers.len() - 1
    }

    /// Remove a decision maker, releasing its options and dropping it from
    /// any coalition.
    pub fn remove_decision_maker(&mut self, index: usize) -> Result<(), ModelError> {
        let dm = self.decision_maker(index)?.clone();
        for id in &dm.options {
            if let Some(option) = self.options.get_mut(*id) {
                option.refs = option.refs.saturating_sub(1);
            }
        }
        self.decision_makers.remove(index);
        if let Some(groups) = &mut self.coalitions {
            for group in groups.iter_mut() {
                group.retain(|m| *m != index);
                for m in group.iter_mut() {
                    if *m > index {
                        *m -= 1;
                    }
                }
            }
            groups.retain(|g| !g.is_empty());
        }
        self.touch();
        Ok(())
    }

    /// Give control of an option to a decision maker.
    pub fn assign_option(&mut self, dm: usize, id: OptionId) -> Result<(), ModelError> {
        let count = self.decision_makers.len();
        if !self.options.contains(id) {
            return Err(ModelError::UnknownOption(id));
        }
        let maker = self
            .decision_makers
            .get_mut(dm)
            .ok_or(ModelError::UnknownDecisionMaker { index: dm, count })?;
        if maker.controls(id) {
            return Ok(());
        }
        maker.options.push(id);
        if let Some(option) = self.options.get_mut(id) {
            option.refs += 1;
        }
        self.touch();
        Ok(())
    }

    pub fn release_option(&mut self, dm: usize, id: OptionId) -> Result<(), ModelError> {
        let count = self.decision_makers.len();
        let maker = self
            .decision_makers
            .get_mut(dm)
            .ok_or(ModelError::UnknownDecisionMaker { index: dm, count })?;
        if maker.controls(id) {
            maker.options.retain(|o| *o != id);
            if let Some(option) = self.options.get_mut(id) {
                option.refs = option.refs.saturating_sub(1);
            }
            self.touch();
        }
        Ok(())
    }

    /// Replace a decision maker's priority-ordered preference statements.
    /// Duplicates (by name) are dropped.
    pub fn set_preferences(&mut self, dm: usize, preferences: Vec<Condition>) -> Result<(), ModelError> {
        self.check_conditions(&preferences)?;
        let count = self.decision_makers.len();
        let mut unique = Vec::with_capacity(preferences.len());
        for pref in preferences {
            condition::push_unique(&mut unique, pref, &self.options);
        }
        let maker = self
            .decision_makers
            .get_mut(dm)
            .ok_or(ModelError::UnknownDecisionMaker { index: dm, count })?;
        if unique.len() > MAX_PREFERENCES {
            return Err(ModelError::TooManyPreferences {
                dm: maker.name.clone(),
                count: unique.len(),
                max: MAX_PREFERENCES,
            });
        }
        maker.preferences = unique;
        self.touch();
        Ok(())
    }

    /// Set a decision maker's explicit ranking (feasible-state indices).
    /// Validation happens when a snapshot is taken.
    pub fn set_ranking(&mut self, dm: usize, ranking: Ranking) -> Result<(), ModelError> {
        let count = self.decision_makers.len();
        let maker = self
            .decision_makers
            .get_mut(dm)
            .ok_or(ModelError::UnknownDecisionMaker { index: dm, count })?;
        maker.ranking = Some(ranking);
        self.touch();
        Ok(())
    }

    pub fn set_use_manual_ranking(&mut self, manual: bool) {
        self.use_manual_ranking = manual;
        self.touch();
    }

    // ── Infeasible states ────────────────────────────────────────────

    /// Add an infeasible condition. Returns false for a duplicate.
    pub fn add_infeasible(&mut self, condition: Condition) -> Result<bool, ModelError> {
        self.check_conditions(std::slice::from_ref(&condition))?;
        let added = condition::push_unique(&mut self.infeasibles, condition, &self.options);
        if added {
            self.touch();
        }
        Ok(added)
    }

    pub fn remove_infeasible(&mut self, index: usize) -> Option<Condition> {
        if index >= self.infeasibles.len() {
            return None;
        }
        let removed = self.infeasibles.remove(index);
        self.touch();
        Some(removed)
    }

    // ── Coalitions ───────────────────────────────────────────────────

    /// Set explicit coalitions. The groups must partition the decision makers.
    pub fn set_coalitions(&mut self, groups: Vec<Vec<usize>>) -> Result<(), ModelError> {
        validate_partition(&groups, self.decision_makers.len())?;
        self.coalitions = Some(groups);
        self.touch();
        Ok(())
    }

    /// Drop explicit coalitions in favour of one singleton per decision maker.
    pub fn reset_coalitions(&mut self) {
        self.coalitions = None;
        self.touch();
    }

    /// Effective coalition groups: the explicit ones, or singletons.
    pub fn coalition_groups(&self) -> Vec<Vec<usize>> {
        match &self.coalitions {
            Some(groups) => groups.clone(),
            None => (0..self.decision_makers.len()).map(|i| vec![i]).collect(),
        }
    }

    // ── Derived state ────────────────────────────────────────────────

    fn check_conditions(&self, conditions: &[Condition]) -> Result<(), ModelError> {
        for cond in conditions {
            let terms: Vec<OptionId> = match cond {
                Condition::Simple(c) => c.terms.iter().map(|(id, _)| *id).collect(),
                Condition::Compound(members) => members
                    .iter()
                    .flat_map(|c| c.terms.iter().map(|(id, _)| *id))
                    .collect(),
            };
            if let Some(missing) = terms.into_iter().find(|id| !self.options.contains(*id)) {
                return Err(ModelError::UnknownOption(missing));
            }
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.generation += 1;
        self.recalculate_feasible_states(false);
    }

    /// Recompute the feasible state set from the infeasible conditions.
    ///
    /// When the set of feasible states changes, explicit rankings no longer
    /// line up with state indices, so manual ranking mode is switched off.
    fn recalculate_feasible_states(&mut self, initial: bool) {
        let old = std::mem::take(&mut self.feasibles.decimal);
        let patterns: Vec<String> = self
            .infeasibles
            .iter()
            .flat_map(|c| c.patterns(&self.options))
            .collect();
        let (feasibles, removed_per_pattern) = FeasibleSet::compute(self.options.len(), &patterns);

        // Fold per-pattern counts back onto their (possibly compound) conditions.
        let mut removed = Vec::with_capacity(self.infeasibles.len());
        let mut counts = removed_per_pattern.into_iter();
        for cond in &self.infeasibles {
            let n = cond.patterns(&self.options).len();
            removed.push(counts.by_ref().take(n).sum());
        }

        let changed = feasibles.decimal != old;
        self.feasibles = feasibles;
        self.states_removed = removed;
        debug!(
            generation = self.generation,
            feasible = self.feasibles.len(),
            "recalculated feasible states"
        );
        if changed && !initial && self.use_manual_ranking {
            warn!("feasible states changed; manual preference ranking disabled");
            self.use_manual_ranking = false;
        }
    }

    /// Validate the model and resolve it into an immutable analysis snapshot.
    pub fn snapshot(&self) -> Result<ConflictSnapshot, ModelError> {
        if self.options.is_empty() {
            return Err(ModelError::NoOptions);
        }
        if self.feasibles.is_empty() {
            return Err(ModelError::NoFeasibleStates);
        }
        if self.decision_makers.is_empty() {
            return Err(ModelError::NoDecisionMakers);
        }
        let groups = self.coalition_groups();
        validate_partition(&groups, self.decision_makers.len())?;

        let state_count = self.feasibles.len();
        let mut profiles = Vec::with_capacity(self.decision_makers.len());
        for (index, dm) in self.decision_makers.iter().enumerate() {
            let valid_prefs: Vec<Condition> = dm
                .preferences
                .iter()
                .filter(|c| c.is_valid(&self.options))
                .cloned()
                .collect();
            let (payoffs, ranking) = if self.use_manual_ranking {
                let ranking = dm.ranking.clone().ok_or_else(|| ModelError::MissingRanking {
                    dm: dm.name.clone(),
                })?;
                ranking
                    .validate(state_count)
                    .map_err(|problem| ModelError::InvalidRanking {
                        dm: dm.name.clone(),
                        problem,
                    })?;
                (ranking.payoffs(state_count), ranking)
            } else {
                if valid_prefs.len() > MAX_PREFERENCES {
                    return Err(ModelError::TooManyPreferences {
                        dm: dm.name.clone(),
                        count: valid_prefs.len(),
                        max: MAX_PREFERENCES,
                    });
                }
                payoffs_from_priorities(&valid_prefs, &self.options, &self.feasibles)
            };
            let option_indices = dm
                .options
                .iter()
                .filter_map(|id| self.options.index_of(*id))
                .collect();
            profiles.push(DecisionMakerProfile {
                index,
                name: dm.name.clone(),
                option_indices,
                payoffs,
                ranking,
            });
        }

        let options = self
            .options
            .iter()
            .enumerate()
            .map(|(master_index, o)| OptionSummary {
                name: o.name.clone(),
                permitted_direction: o.permitted_direction,
                master_index,
            })
            .collect();

        Ok(ConflictSnapshot::new(
            self.generation,
            options,
            self.feasibles.clone(),
            profiles,
            groups,
        ))
    }
}

/// Check that coalition groups cover every decision maker exactly once.
pub fn validate_partition(groups: &[Vec<usize>], dm_count: usize) -> Result<(), ModelError> {
    let mut seen = vec![false; dm_count];
    for group in groups {
        if group.is_empty() {
            return Err(ModelError::CoalitionPartition {
                reason: "empty coalition".to_string(),
            });
        }
        for &m in group {
            match seen.get_mut(m) {
                None => {
                    return Err(ModelError::CoalitionPartition {
                        reason: format!("unknown decision maker {}", m),
                    })
                }
                Some(true) => {
                    return Err(ModelError::CoalitionPartition {
                        reason: format!("decision maker {} is in more than one coalition", m),
                    })
                }
                Some(flag) => *flag = true,
            }
        }
    }
    if let Some(missing) = seen.iter().position(|s| !s) {
        return Err(ModelError::CoalitionPartition {
            reason: format!("decision maker {} is in no coalition", missing),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preference::RankEntry;

    fn two_by_two() -> (ConflictModel, OptionId, OptionId) {
        let mut model = ConflictModel::new();
        let a = model.add_option("a", PermittedDirection::Both).unwrap();
        let b = model.add_option("b", PermittedDirection::Both).unwrap();
        let dm1 = model.add_decision_maker("DM1");
        let dm2 = model.add_decision_maker("DM2");
        model.assign_option(dm1, a).unwrap();
        model.assign_option(dm2, b).unwrap();
        (model, a, b)
    }

    /// Seven free options controlled by one decision maker "A": 128 states.
    fn seven_options() -> (ConflictModel, Vec<OptionId>) {
        let mut model = ConflictModel::new();
        let ids: Vec<OptionId> = (0..7)
            .map(|i| model.add_option(format!("o{i}"), PermittedDirection::Both).unwrap())
            .collect();
        let dm = model.add_decision_maker("A");
        for &id in &ids {
            model.assign_option(dm, id).unwrap();
        }
        (model, ids)
    }

    /// `count` distinct two-option statements (at most 84 over seven options).
    fn pair_statements(ids: &[OptionId], count: usize) -> Vec<Condition> {
        let mut out = Vec::new();
        for i in 0..ids.len() {
            for j in i + 1..ids.len() {
                for (x, y) in [(true, true), (true, false), (false, true), (false, false)] {
                    out.push(Condition::simple(vec![(ids[i], x), (ids[j], y)]));
                }
            }
        }
        out.truncate(count);
        out
    }

    #[test]
    fn test_generation_bumps_on_every_edit() {
        let (mut model, a, _) = two_by_two();
        let g = model.generation();
        model.set_permitted_direction(a, PermittedDirection::Forward).unwrap();
        assert!(model.generation() > g);
    }

    #[test]
    fn test_infeasible_shrinks_state_set() {
        let (mut model, a, b) = two_by_two();
        assert_eq!(model.feasibles().len(), 4);
        assert!(model
            .add_infeasible(Condition::simple(vec![(a, true), (b, true)]))
            .unwrap());
        assert_eq!(model.feasibles().len(), 3);
        assert_eq!(model.states_removed(), &[1]);
        assert!(!model
            .add_infeasible(Condition::simple(vec![(a, true), (b, true)]))
            .unwrap());
    }

    #[test]
    fn test_remove_option_prunes_conditions_and_dm_options() {
        let (mut model, a, b) = two_by_two();
        model
            .add_infeasible(Condition::simple(vec![(a, true), (b, true)]))
            .unwrap();
        model
            .set_preferences(1, vec![Condition::simple(vec![(a, false)])])
            .unwrap();
        model.remove_option(a).unwrap();
        assert!(model.infeasibles().is_empty());
        assert!(model.decision_makers()[1].preferences.is_empty());
        assert!(model.decision_makers()[0].options.is_empty());
        assert_eq!(model.feasibles().len(), 2);
    }

    #[test]
    fn test_feasible_change_disables_manual_ranking() {
        let (mut model, a, b) = two_by_two();
        model.set_use_manual_ranking(true);
        assert!(model.use_manual_ranking());
        model
            .add_infeasible(Condition::simple(vec![(a, true), (b, true)]))
            .unwrap();
        assert!(!model.use_manual_ranking());
    }

    #[test]
    fn test_reorder_options_by_dm() {
        let mut model = ConflictModel::new();
        let a = model.add_option("a", PermittedDirection::Both).unwrap();
        let b = model.add_option("b", PermittedDirection::Both).unwrap();
        let dm = model.add_decision_maker("DM1");
        model.assign_option(dm, b).unwrap();
        model.reorder_options_by_dm();
        assert_eq!(model.options().index_of(b), Some(0));
        assert_eq!(model.options().index_of(a), Some(1));
    }

    #[test]
    fn test_snapshot_rejects_empty_conflicts() {
        let model = ConflictModel::new();
        assert_eq!(model.snapshot().unwrap_err(), ModelError::NoOptions);

        let mut model = ConflictModel::new();
        let a = model.add_option("a", PermittedDirection::Both).unwrap();
        model.add_infeasible(Condition::simple(vec![(a, true)])).unwrap();
        model.add_infeasible(Condition::simple(vec![(a, false)])).unwrap();
        assert_eq!(model.snapshot().unwrap_err(), ModelError::NoFeasibleStates);
    }

    #[test]
    fn test_snapshot_validates_manual_ranking() {
        let (mut model, _, _) = two_by_two();
        model
            .set_ranking(0, Ranking(vec![RankEntry::State(0), RankEntry::State(1)]))
            .unwrap();
        model
            .set_ranking(1, Ranking((0..4).map(RankEntry::State).collect()))
            .unwrap();
        model.set_use_manual_ranking(true);
        match model.snapshot().unwrap_err() {
            ModelError::InvalidRanking { dm, problem } => {
                assert_eq!(dm, "DM1");
                assert_eq!(problem.missing, vec![2, 3]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_coalition_partition_checked() {
        let (mut model, _, _) = two_by_two();
        assert!(model.set_coalitions(vec![vec![0]]).is_err());
        assert!(model.set_coalitions(vec![vec![0, 1], vec![1]]).is_err());
        model.set_coalitions(vec![vec![0, 1]]).unwrap();
        assert_eq!(model.coalition_groups(), vec![vec![0, 1]]);
    }

    #[test]
    fn test_remove_decision_maker_updates_coalitions() {
        let (mut model, _, _) = two_by_two();
        let dm3 = model.add_decision_maker("DM3");
        model.set_coalitions(vec![vec![0, dm3], vec![1]]).unwrap();
        model.remove_decision_maker(0).unwrap();
        assert_eq!(model.coalition_groups(), vec![vec![1], vec![0]]);
    }

    #[test]
    fn test_preference_count_limit() {
        let (mut model, ids) = seven_options();
        model
            .set_preferences(0, pair_statements(&ids, MAX_PREFERENCES))
            .unwrap();
        let snap = model.snapshot().unwrap();
        let payoffs = &snap.decision_makers()[0].payoffs;
        assert_eq!(payoffs.len(), 128);
        assert!(payoffs.iter().all(|p| *p >= 0));

        // The top statement outweighs all 62 below it.
        let top = &model.decision_makers()[0].preferences[0];
        let (hit, miss): (Vec<usize>, Vec<usize>) = (0..128)
            .partition(|&s| top.test(model.options(), model.feasibles().decimal[s]));
        let worst_hit = hit.iter().map(|&s| payoffs[s]).min().unwrap();
        let best_miss = miss.iter().map(|&s| payoffs[s]).max().unwrap();
        assert!(worst_hit > best_miss);

        let generation = model.generation();
        let err = model
            .set_preferences(0, pair_statements(&ids, MAX_PREFERENCES + 1))
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::TooManyPreferences {
                dm: "A".to_string(),
                count: 64,
                max: MAX_PREFERENCES,
            }
        );
        assert_eq!(model.decision_makers()[0].preferences.len(), MAX_PREFERENCES);
        assert_eq!(model.generation(), generation);
    }
}
