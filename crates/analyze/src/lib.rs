//! GMCR stability analysis.
//!
//! The analyzer works on an immutable [`gmcr_core::ConflictSnapshot`]:
//! reachability matrices are built per effective party, the forward solver
//! evaluates the five stability concepts for every state, and the inverse
//! solver and goal seeker ask which preferences would make chosen states
//! stable. The `analyze()` function runs the forward pass and aggregates
//! the results into an `AnalysisReport`.

pub mod cancel;
pub mod config;
pub mod error;
pub mod export;
pub mod goals;
pub mod inverse;
pub mod narration;
pub mod reachability;
pub mod report;
pub mod requirements;
pub mod solver;
pub mod stability;

pub use cancel::CancellationToken;
pub use config::AnalysisConfig;
pub use error::AnalysisError;
pub use export::{visualizer_export, VisualizerEdge, VisualizerExport, VisualizerNode};
pub use goals::{Goal, GoalRequirements, GoalSeeker, GoalStatement};
pub use inverse::{
    CandidateResult, ConceptCounts, InverseRequest, InverseResults, InverseSolver,
    SymbolicAnalysis, VaryRange,
};
pub use narration::{narrate, state_snippet};
pub use reachability::ReachabilityMatrices;
pub use report::{AnalysisReport, Finding, FindingSeverity, ModelSummary, StateSummary};
pub use requirements::{Conflict, Consistency, PreferenceEdge, Requirement, Simplified};
pub use solver::{Equilibria, Explanation, LogicalSolver, PartyStability};
pub use stability::{
    CounteredSanction, ImprovementResponse, Move, MoveContext, Sanction, StabilityCheck,
    StabilityConcept,
};

use gmcr_core::Party;
use gmcr_interchange::LoadedConflict;

/// Run the forward analysis on a loaded conflict.
///
/// Snapshots the model, finds the equilibria under every concept, builds
/// the per-state table and extracts findings.
pub fn analyze(
    loaded: &LoadedConflict,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, AnalysisError> {
    let snapshot = loaded.model.snapshot()?;
    let solver = LogicalSolver::new(&snapshot, config)?;
    let equilibria = solver.find_equilibria()?;

    let mut report = AnalysisReport::new();
    report.model = Some(ModelSummary {
        options: snapshot.options().iter().map(|o| o.name.clone()).collect(),
        parties: solver
            .matrices()
            .parties()
            .iter()
            .map(|p| p.name().to_string())
            .collect(),
        state_count: snapshot.state_count(),
        coalitions_reset: loaded.coalitions_reset,
        duplicate_infeasibles: loaded.duplicate_infeasibles,
        states_removed: loaded.model.states_removed().to_vec(),
    });
    let feasibles = snapshot.feasibles();
    report.states = report::state_summaries(&equilibria, &feasibles.decimal, &feasibles.yn);
    report.equilibria = Some(equilibria);
    report.analyses_run = vec!["model".to_string(), "equilibria".to_string()];

    report.extract_findings();

    Ok(report)
}
