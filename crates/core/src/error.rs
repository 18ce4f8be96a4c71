use crate::option::OptionId;

/// Errors raised while editing a conflict or taking an analysis snapshot of it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// The conflict has no options, so there is no state space to analyze.
    #[error("conflict has no options")]
    NoOptions,

    /// Every option combination is excluded by an infeasible condition.
    #[error("conflict has no feasible states")]
    NoFeasibleStates,

    /// The conflict has no decision makers.
    #[error("conflict has no decision makers")]
    NoDecisionMakers,

    /// More options than a state bitfield can encode.
    #[error("conflict has {count} options; at most {max} are supported")]
    TooManyOptions { count: usize, max: usize },

    /// More preference statements than distinct `i64` priority weights.
    #[error("decision maker '{dm}' has {count} preference statements; at most {max} are supported")]
    TooManyPreferences { dm: String, count: usize, max: usize },

    /// An option id that is not (or no longer) part of the master option list.
    #[error("unknown option id {0}")]
    UnknownOption(OptionId),

    /// A decision maker index outside the decision maker list.
    #[error("unknown decision maker index {index} (conflict has {count})")]
    UnknownDecisionMaker { index: usize, count: usize },

    /// Coalitions must partition the decision makers exactly.
    #[error("coalitions do not partition the decision makers: {reason}")]
    CoalitionPartition { reason: String },

    /// Manual ranking mode is on but a decision maker has no ranking.
    #[error("decision maker '{dm}' has no preference ranking")]
    MissingRanking { dm: String },

    /// A manual ranking that omits, repeats or invents states.
    #[error("preference ranking for '{dm}' is invalid: {problem}")]
    InvalidRanking { dm: String, problem: RankingProblem },
}

/// What exactly is wrong with a manual preference ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingProblem {
    pub missing: Vec<usize>,
    pub duplicated: Vec<usize>,
    pub unknown: Vec<usize>,
}

impl RankingProblem {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.duplicated.is_empty() && self.unknown.is_empty()
    }
}

impl std::fmt::Display for RankingProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if !self.missing.is_empty() {
            parts.push(format!("missing states {:?}", self.missing));
        }
        if !self.duplicated.is_empty() {
            parts.push(format!("duplicated states {:?}", self.duplicated));
        }
        if !self.unknown.is_empty() {
            parts.push(format!("unknown states {:?}", self.unknown));
        }
        write!(f, "{}", parts.join("; "))
    }
}
