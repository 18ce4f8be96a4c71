use gmcr_core::ModelError;

/// Errors raised while reading or building a conflict definition.
#[derive(Debug, thiserror::Error)]
pub enum InterchangeError {
    /// The file is not valid conflict definition JSON.
    #[error("invalid conflict definition: {0}")]
    Json(#[from] serde_json::Error),

    /// An option index outside the top-level option list.
    #[error("{context} refers to option {index}, but the conflict has {count} options")]
    UnknownOption {
        context: String,
        index: usize,
        count: usize,
    },

    /// A decision maker index outside the decision maker list.
    #[error("{context} refers to decision maker {index}, but the conflict has {count}")]
    UnknownDecisionMaker {
        context: String,
        index: usize,
        count: usize,
    },

    /// A preference ranking entry that is not a 1-based feasible state number.
    #[error("preference ranking for '{dm}' contains state {state}, but the conflict has {count} feasible states")]
    UnknownRankedState { dm: String, state: usize, count: usize },

    /// The definition parsed but the resulting model was rejected.
    #[error(transparent)]
    Model(#[from] ModelError),
}
