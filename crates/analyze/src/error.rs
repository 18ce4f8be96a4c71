use gmcr_core::ModelError;

/// Errors raised by the reachability builder and the solvers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    /// The model failed validation when the snapshot was taken.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A party index that is not one of the effective parties.
    #[error("unknown party {index} (analysis has {count} parties)")]
    UnknownParty { index: usize, count: usize },

    /// A party name that matches no effective party.
    #[error("no party named '{0}'")]
    UnknownPartyName(String),

    /// A state index outside the feasible state set.
    #[error("state {state} is not a feasible state index (conflict has {count} states)")]
    UnknownState { state: usize, count: usize },

    /// The model was edited after the matrices were built.
    #[error("model generation {model} does not match analysis generation {analysis}; rebuild the analysis")]
    StaleSnapshot { analysis: u64, model: u64 },

    /// A vary range with bounds out of order or beyond the ranking.
    #[error("vary range {start}..{end} for '{dm}' is invalid (ranking has {len} entries)")]
    InvalidVaryRange {
        dm: String,
        start: usize,
        end: usize,
        len: usize,
    },

    /// More vary ranges than decision makers.
    #[error("{given} vary ranges given for {count} decision makers")]
    TooManyVaryRanges { given: usize, count: usize },

    /// The inverse request names no target state.
    #[error("no target equilibrium state given")]
    MissingTarget,

    /// The inverse or goal request has no decision makers to vary.
    #[error("conflict has no decision makers")]
    NoDecisionMakers,

    /// A goal request with no goals.
    #[error("no goals given")]
    NoGoals,

    /// The inverse enumeration would exceed the configured ceiling.
    #[error("{count} candidate rankings exceed the limit of {max}")]
    TooManyCandidates { count: u128, max: u64 },

    /// A cancellation token was triggered during the computation.
    #[error("analysis cancelled")]
    Cancelled,

    /// The analysis configuration file could not be parsed.
    #[error("invalid analysis configuration: {0}")]
    Config(String),
}
