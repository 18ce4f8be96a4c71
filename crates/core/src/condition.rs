//! Conditions: partial option assignments tested against states.
//!
//! A simple condition pins a subset of options to taken / not taken. A
//! compound condition is the union of several simple ones. Conditions are
//! used both for infeasible combinations and for preference statements.

use crate::option::{OptionId, OptionList};
use crate::pattern::dec_to_yn;

/// A partial assignment of options to taken (`true`) / not taken (`false`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleCondition {
    pub terms: Vec<(OptionId, bool)>,
}

impl SimpleCondition {
    pub fn new(terms: Vec<(OptionId, bool)>) -> Self {
        SimpleCondition { terms }
    }

    /// Y/N/dash notation over the current master option order.
    pub fn ynd(&self, options: &OptionList) -> String {
        let mut ynd = vec!['-'; options.len()];
        for (id, taken) in &self.terms {
            if let Some(idx) = options.index_of(*id) {
                ynd[idx] = if *taken { 'Y' } else { 'N' };
            }
        }
        ynd.into_iter().collect()
    }

    /// True when the decimal state satisfies every term.
    pub fn test(&self, options: &OptionList, state: u64) -> bool {
        let yn = dec_to_yn(state, options.len());
        let yn = yn.as_bytes();
        self.terms.iter().all(|(id, taken)| match options.index_of(*id) {
            Some(idx) => (yn[idx] == b'Y') == *taken,
            None => false,
        })
    }

    /// False once any referenced option has left the master list.
    pub fn is_valid(&self, options: &OptionList) -> bool {
        self.terms.iter().all(|(id, _)| options.contains(*id))
    }

    pub fn references(&self, option: OptionId) -> bool {
        self.terms.iter().any(|(id, _)| *id == option)
    }
}

/// A condition as stored in infeasible and preference lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Simple(SimpleCondition),
    /// Satisfied when any member is satisfied.
    Compound(Vec<SimpleCondition>),
}

impl Condition {
    pub fn simple(terms: Vec<(OptionId, bool)>) -> Self {
        Condition::Simple(SimpleCondition::new(terms))
    }

    pub fn compound(members: Vec<Vec<(OptionId, bool)>>) -> Self {
        Condition::Compound(members.into_iter().map(SimpleCondition::new).collect())
    }

    /// The Y/N/dash patterns covered by this condition.
    pub fn patterns(&self, options: &OptionList) -> Vec<String> {
        match self {
            Condition::Simple(c) => vec![c.ynd(options)],
            Condition::Compound(members) => members.iter().map(|c| c.ynd(options)).collect(),
        }
    }

    /// Display name; also the key used to reject duplicates.
    pub fn name(&self, options: &OptionList) -> String {
        match self {
            Condition::Simple(c) => c.ynd(options),
            Condition::Compound(_) => {
                let mut names = self.patterns(options);
                names.sort();
                names.join(", ")
            }
        }
    }

    pub fn test(&self, options: &OptionList, state: u64) -> bool {
        match self {
            Condition::Simple(c) => c.test(options, state),
            Condition::Compound(members) => members.iter().any(|c| c.test(options, state)),
        }
    }

    pub fn is_valid(&self, options: &OptionList) -> bool {
        match self {
            Condition::Simple(c) => c.is_valid(options),
            Condition::Compound(members) => members.iter().all(|c| c.is_valid(options)),
        }
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, Condition::Compound(_))
    }
}

/// Append `condition` unless a condition with the same name is already present.
///
/// Returns whether the condition was added.
pub fn push_unique(list: &mut Vec<Condition>, condition: Condition, options: &OptionList) -> bool {
    let name = condition.name(options);
    if list.iter().any(|c| c.name(options) == name) {
        tracing::debug!(condition = %name, "duplicate condition ignored");
        return false;
    }
    list.push(condition);
    true
}

/// Drop every condition that references a removed option. Returns how many
/// were pruned.
pub fn prune_invalid(list: &mut Vec<Condition>, options: &OptionList) -> usize {
    let before = list.len();
    list.retain(|c| c.is_valid(options));
    before - list.len()
}
