//! Decision makers, coalitions and the query surface they share.
//!
//! Editing happens on [`DecisionMaker`]; analysis works on the resolved
//! profiles held by a snapshot. Both [`DecisionMakerProfile`] and
//! [`CoalitionProfile`] implement [`Party`], and [`EffectiveParty`] is the
//! tagged union the solvers iterate over.

use crate::condition::Condition;
use crate::option::OptionId;
use crate::preference::Ranking;
use serde::Serialize;

/// A decision maker as edited in the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionMaker {
    pub name: String,
    pub options: Vec<OptionId>,
    /// Priority-ordered preference statements, most important first.
    pub preferences: Vec<Condition>,
    /// Explicit ranking, authoritative only in manual ranking mode.
    pub ranking: Option<Ranking>,
}

impl DecisionMaker {
    pub fn new(name: impl Into<String>) -> Self {
        DecisionMaker {
            name: name.into(),
            options: Vec::new(),
            preferences: Vec::new(),
            ranking: None,
        }
    }

    pub fn controls(&self, option: OptionId) -> bool {
        self.options.contains(&option)
    }
}

/// The capability set shared by decision makers and coalitions.
pub trait Party {
    fn name(&self) -> &str;

    /// Master indices of the options this party moves.
    fn option_indices(&self) -> &[usize];

    /// Payoff at a state, formatted for narration.
    fn payoff_label(&self, state: usize) -> String;

    /// Preference comparison of moving `from` -> `to`. Positive means `to`
    /// is an improvement.
    fn compare(&self, from: usize, to: usize) -> i64;
}

/// A decision maker resolved against one feasible state set.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionMakerProfile {
    pub index: usize,
    pub name: String,
    pub option_indices: Vec<usize>,
    pub payoffs: Vec<i64>,
    pub ranking: Ranking,
}

impl Party for DecisionMakerProfile {
    fn name(&self) -> &str {
        &self.name
    }

    fn option_indices(&self) -> &[usize] {
        &self.option_indices
    }

    fn payoff_label(&self, state: usize) -> String {
        self.payoffs[state].to_string()
    }

    fn compare(&self, from: usize, to: usize) -> i64 {
        self.payoffs[to] - self.payoffs[from]
    }
}

/// Two or more decision makers acting together. A move only counts as an
/// improvement when every member strictly gains.
#[derive(Debug, Clone, Serialize)]
pub struct CoalitionProfile {
    pub name: String,
    pub members: Vec<usize>,
    pub option_indices: Vec<usize>,
    pub member_payoffs: Vec<Vec<i64>>,
}

impl CoalitionProfile {
    pub fn new(members: &[&DecisionMakerProfile]) -> Self {
        let mut option_indices: Vec<usize> = members
            .iter()
            .flat_map(|dm| dm.option_indices.iter().copied())
            .collect();
        option_indices.sort_unstable();
        option_indices.dedup();
        CoalitionProfile {
            name: members
                .iter()
                .map(|dm| dm.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            members: members.iter().map(|dm| dm.index).collect(),
            option_indices,
            member_payoffs: members.iter().map(|dm| dm.payoffs.clone()).collect(),
        }
    }
}

impl Party for CoalitionProfile {
    fn name(&self) -> &str {
        &self.name
    }

    fn option_indices(&self) -> &[usize] {
        &self.option_indices
    }

    fn payoff_label(&self, state: usize) -> String {
        let pays: Vec<String> = self
            .member_payoffs
            .iter()
            .map(|p| p[state].to_string())
            .collect();
        format!("[{}]", pays.join(", "))
    }

    fn compare(&self, from: usize, to: usize) -> i64 {
        let unanimous = self.member_payoffs.iter().all(|p| p[to] - p[from] > 0);
        i64::from(unanimous)
    }
}

/// A party as seen by the solvers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectiveParty {
    DecisionMaker(DecisionMakerProfile),
    Coalition(CoalitionProfile),
}

impl EffectiveParty {
    /// Decision maker indices represented by this party.
    pub fn members(&self) -> Vec<usize> {
        match self {
            EffectiveParty::DecisionMaker(dm) => vec![dm.index],
            EffectiveParty::Coalition(co) => co.members.clone(),
        }
    }

    pub fn is_coalition(&self) -> bool {
        matches!(self, EffectiveParty::Coalition(_))
    }
}

impl Party for EffectiveParty {
    fn name(&self) -> &str {
        match self {
            EffectiveParty::DecisionMaker(dm) => dm.name(),
            EffectiveParty::Coalition(co) => co.name(),
        }
    }

    fn option_indices(&self) -> &[usize] {
        match self {
            EffectiveParty::DecisionMaker(dm) => dm.option_indices(),
            EffectiveParty::Coalition(co) => co.option_indices(),
        }
    }

    fn payoff_label(&self, state: usize) -> String {
        match self {
            EffectiveParty::DecisionMaker(dm) => dm.payoff_label(state),
            EffectiveParty::Coalition(co) => co.payoff_label(state),
        }
    }

    fn compare(&self, from: usize, to: usize) -> i64 {
        match self {
            EffectiveParty::DecisionMaker(dm) => dm.compare(from, to),
            EffectiveParty::Coalition(co) => co.compare(from, to),
        }
    }
}
