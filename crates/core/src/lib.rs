//! gmcr-core: the Graph Model for Conflict Resolution conflict model.
//!
//! Holds the editable conflict (options, decision makers, infeasible
//! conditions, preferences, coalitions), derives its feasible state set, and
//! resolves it into an immutable [`ConflictSnapshot`] for analysis.
//!
//! # Public API
//!
//! - [`ConflictModel`] -- editable conflict with a generation counter
//! - [`ConflictSnapshot`] -- validated, payoff-resolved view for the solvers
//! - [`Party`] -- query surface shared by decision makers and coalitions
//! - [`ModelError`] -- validation and edit errors

/// Program name written into exported conflict files.
pub const PROGRAM_NAME: &str = "gmcr-rs";
/// Version written into exported conflict files.
pub const PROGRAM_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod condition;
pub mod error;
pub mod feasible;
pub mod model;
pub mod option;
pub mod party;
pub mod pattern;
pub mod preference;
pub mod snapshot;

// ── Convenience re-exports ───────────────────────────────────────────

pub use condition::{Condition, SimpleCondition};
pub use error::{ModelError, RankingProblem};
pub use feasible::FeasibleSet;
pub use model::{ConflictModel, MAX_OPTIONS, MAX_PREFERENCES};
pub use option::{ConflictOption, OptionId, OptionList, PermittedDirection};
pub use party::{CoalitionProfile, DecisionMaker, DecisionMakerProfile, EffectiveParty, Party};
pub use preference::{RankEntry, Ranking};
pub use snapshot::{ConflictSnapshot, OptionSummary};
