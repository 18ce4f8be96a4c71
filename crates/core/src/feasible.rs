//! The feasible state set.
//!
//! Feasible states are held in three index-aligned forms: decimal value,
//! Y/N string and dense ordered rank. States are sorted by decimal value, so
//! a state's index *is* its ordered rank.

use crate::pattern::{expand_pattern, remove_pattern, yn_to_dec};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Default, Serialize)]
pub struct FeasibleSet {
    /// Compact disjoint dash patterns covering exactly the feasible states.
    pub dash: Vec<String>,
    pub decimal: Vec<u64>,
    pub yn: Vec<String>,
    /// Dense 0-based rank; `ordered[i] == i`.
    pub ordered: Vec<usize>,
    #[serde(skip)]
    to_ordered: HashMap<u64, usize>,
}

impl FeasibleSet {
    /// Build the feasible set for `option_count` options by removing every
    /// infeasible pattern in turn.
    ///
    /// Returns the set plus, for each infeasible pattern, how many states
    /// it removed (patterns removing only already-removed states count 0).
    pub fn compute(option_count: usize, infeasible: &[String]) -> (FeasibleSet, Vec<u64>) {
        let mut dash = vec!["-".repeat(option_count)];
        let mut removed = Vec::with_capacity(infeasible.len());
        for pattern in infeasible {
            let (kept, count) = remove_pattern(&dash, pattern);
            dash = kept;
            removed.push(count);
        }
        (FeasibleSet::from_patterns(dash), removed)
    }

    /// Expand dash patterns into the sorted, de-duplicated state set.
    pub fn from_patterns(dash: Vec<String>) -> FeasibleSet {
        let states: BTreeSet<(u64, String)> = dash
            .iter()
            .flat_map(|p| expand_pattern(p))
            .map(|yn| (yn_to_dec(&yn), yn))
            .collect();

        let mut decimal = Vec::with_capacity(states.len());
        let mut yn = Vec::with_capacity(states.len());
        for (d, s) in states {
            decimal.push(d);
            yn.push(s);
        }
        let ordered = (0..decimal.len()).collect();
        let to_ordered = decimal.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        FeasibleSet {
            dash,
            decimal,
            yn,
            ordered,
            to_ordered,
        }
    }

    pub fn len(&self) -> usize {
        self.decimal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decimal.is_empty()
    }

    /// Index (ordered rank) of a decimal state, if it is feasible.
    pub fn index_of(&self, decimal: u64) -> Option<usize> {
        self.to_ordered.get(&decimal).copied()
    }

    pub fn contains(&self, decimal: u64) -> bool {
        self.to_ordered.contains_key(&decimal)
    }

    /// Whether option `option_index` is taken in state `state`.
    pub fn is_taken(&self, state: usize, option_index: usize) -> bool {
        self.decimal[state] & (1u64 << option_index) != 0
    }

    /// Display form used in narration and listings: 1-based rank plus decimal.
    pub fn label(&self, state: usize) -> String {
        format!("{:3}  [{}]", state + 1, self.decimal[state])
    }
}
