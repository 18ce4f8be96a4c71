//! Visualizer export: the conflict definition plus per-state reachability
//! and payoff changes.

use crate::error::AnalysisError;
use crate::reachability::ReachabilityMatrices;
use gmcr_core::{ConflictModel, Party};
use gmcr_interchange::{to_definition, ConflictDefinition};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizerExport {
    #[serde(flatten)]
    pub definition: ConflictDefinition,
    pub nodes: Vec<VisualizerNode>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizerNode {
    pub id: usize,
    pub decimal: String,
    /// 1-based position in the feasible set.
    pub ordered: String,
    pub state: String,
    pub reachable: Vec<VisualizerEdge>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizerEdge {
    pub target: usize,
    /// `dm<k>`, `k` being the effective party index.
    pub dm: String,
    pub payoff_change: i64,
}

/// Build the export. The matrices must be current for `model`.
pub fn visualizer_export(
    model: &ConflictModel,
    matrices: &ReachabilityMatrices,
) -> Result<VisualizerExport, AnalysisError> {
    matrices.ensure_current(model)?;
    let feasibles = matrices.feasibles();
    let nodes = (0..matrices.state_count())
        .map(|state| {
            let mut reachable = Vec::new();
            for (k, party) in matrices.parties().iter().enumerate() {
                for &target in matrices.reachable(k, state)? {
                    reachable.push(VisualizerEdge {
                        target,
                        dm: format!("dm{}", k),
                        payoff_change: party.compare(state, target),
                    });
                }
            }
            Ok(VisualizerNode {
                id: state,
                decimal: feasibles.decimal[state].to_string(),
                ordered: (feasibles.ordered[state] + 1).to_string(),
                state: feasibles.yn[state].clone(),
                reachable,
            })
        })
        .collect::<Result<Vec<_>, AnalysisError>>()?;
    Ok(VisualizerExport {
        definition: to_definition(model),
        nodes,
    })
}
