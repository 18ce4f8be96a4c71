//! Typed structs for the conflict definition JSON file.
//!
//! Field names follow the file format (camelCase). Older files used
//! `useManualPreferenceVectors` and `preferenceVector`; both are accepted as
//! aliases on input and never written.

use gmcr_core::PermittedDirection;
use serde::{Deserialize, Serialize};

/// A complete conflict as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictDefinition {
    #[serde(default, alias = "useManualPreferenceVectors")]
    pub use_manual_preference_ranking: bool,
    pub options: Vec<OptionDef>,
    pub decision_makers: Vec<DecisionMakerDef>,
    #[serde(default)]
    pub infeasibles: Vec<ConditionDef>,
    /// Missing means one singleton coalition per decision maker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coalitions: Option<Vec<CoalitionDef>>,
    /// Written for the visualizer; ignored on input.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coalitions_full: Vec<CoalitionSummaryDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionDef {
    pub name: String,
    #[serde(default)]
    pub permitted_direction: PermittedDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionMakerDef {
    pub name: String,
    /// Indices into the top-level option list.
    #[serde(default)]
    pub options: Vec<usize>,
    /// Priority-ordered preference conditions, most important first.
    #[serde(default)]
    pub preferences: Vec<ConditionDef>,
    /// 1-based ordered state numbers, most preferred first.
    #[serde(
        default,
        alias = "preferenceVector",
        skip_serializing_if = "Option::is_none"
    )]
    pub preference_ranking: Option<Vec<RankingEntryDef>>,
    /// Derived payoffs, written for reference and ignored on input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payoffs: Option<Vec<i64>>,
}

/// Whether a condition term requires its option taken (`"Y"`) or not (`"N"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Taken {
    #[serde(rename = "Y")]
    Yes,
    #[serde(rename = "N")]
    No,
}

impl From<bool> for Taken {
    fn from(taken: bool) -> Self {
        if taken {
            Taken::Yes
        } else {
            Taken::No
        }
    }
}

impl From<Taken> for bool {
    fn from(taken: Taken) -> Self {
        taken == Taken::Yes
    }
}

/// One `[optionIndex, "Y"|"N"]` term.
pub type TermDef = (usize, Taken);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionDef {
    Simple(Vec<TermDef>),
    Compound(CompoundConditionDef),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundConditionDef {
    pub compound: bool,
    pub members: Vec<Vec<TermDef>>,
}

/// A coalition entry: a lone decision maker index or a group of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoalitionDef {
    Single(usize),
    Group(Vec<usize>),
}

impl CoalitionDef {
    pub fn members(&self) -> Vec<usize> {
        match self {
            CoalitionDef::Single(i) => vec![*i],
            CoalitionDef::Group(g) => g.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoalitionSummaryDef {
    pub name: String,
    pub options: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RankingEntryDef {
    State(usize),
    Tied(Vec<usize>),
}
