//! Preferences and payoffs.
//!
//! A decision maker states preferences either as a priority-ordered list of
//! conditions or as an explicit ranking of feasible states. Both are reduced
//! to a payoff per feasible state; only the order of payoffs matters.

use crate::condition::Condition;
use crate::error::RankingProblem;
use crate::feasible::FeasibleSet;
use crate::option::OptionList;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One position in a ranking: a single state or a group of equally
/// preferred states. States are feasible-set indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RankEntry {
    State(usize),
    Tied(Vec<usize>),
}

impl RankEntry {
    pub fn states(&self) -> &[usize] {
        match self {
            RankEntry::State(s) => std::slice::from_ref(s),
            RankEntry::Tied(group) => group,
        }
    }
}

/// A ranking of feasible states, most preferred first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ranking(pub Vec<RankEntry>);

impl Ranking {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> &[RankEntry] {
        &self.0
    }

    /// Position of the entry containing `state`.
    pub fn position_of(&self, state: usize) -> Option<usize> {
        self.0.iter().position(|e| e.states().contains(&state))
    }

    /// Check that every feasible state appears exactly once.
    pub fn validate(&self, state_count: usize) -> Result<(), RankingProblem> {
        let mut seen = vec![0usize; state_count];
        let mut unknown = Vec::new();
        for entry in &self.0 {
            for &s in entry.states() {
                match seen.get_mut(s) {
                    Some(count) => *count += 1,
                    None => unknown.push(s),
                }
            }
        }
        let problem = RankingProblem {
            missing: (0..state_count).filter(|s| seen[*s] == 0).collect(),
            duplicated: (0..state_count).filter(|s| seen[*s] > 1).collect(),
            unknown,
        };
        if problem.is_empty() {
            Ok(())
        } else {
            Err(problem)
        }
    }

    /// Payoff table for a validated ranking: the entry at position `i`
    /// scores `state_count - i`, tied states share their entry's score.
    pub fn payoffs(&self, state_count: usize) -> Vec<i64> {
        let mut payoffs = vec![0i64; state_count];
        for (i, entry) in self.0.iter().enumerate() {
            for &s in entry.states() {
                if let Some(p) = payoffs.get_mut(s) {
                    *p = state_count as i64 - i as i64;
                }
            }
        }
        payoffs
    }

    /// Group states by descending payoff.
    pub fn from_payoffs(payoffs: &[i64]) -> Ranking {
        let mut groups: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (state, pay) in payoffs.iter().enumerate() {
            groups.entry(*pay).or_default().push(state);
        }
        Ranking(
            groups
                .into_values()
                .rev()
                .map(|group| {
                    if group.len() == 1 {
                        RankEntry::State(group[0])
                    } else {
                        RankEntry::Tied(group)
                    }
                })
                .collect(),
        )
    }
}

/// Weight of the preference at `priority` among `count`: the most important
/// statement outweighs all lower ones combined. `count` is at most
/// [`MAX_PREFERENCES`](crate::MAX_PREFERENCES).
pub fn priority_weight(priority: usize, count: usize) -> i64 {
    1i64 << (count - priority - 1)
}

/// Payoffs (and the implied ranking) from a priority-ordered list of
/// preference conditions.
pub fn payoffs_from_priorities(
    preferences: &[Condition],
    options: &OptionList,
    feasibles: &FeasibleSet,
) -> (Vec<i64>, Ranking) {
    let count = preferences.len();
    let payoffs: Vec<i64> = feasibles
        .decimal
        .iter()
        .map(|&state| {
            preferences
                .iter()
                .enumerate()
                .filter(|(_, cond)| cond.test(options, state))
                .map(|(idx, _)| priority_weight(idx, count))
                .sum()
        })
        .collect();
    let ranking = Ranking::from_payoffs(&payoffs);
    (payoffs, ranking)
}
