//! AnalysisReport: the equilibria of a conflict plus notable findings.
//!
//! The report collects the model summary and the stability table and
//! extracts findings (warnings, info) for summary display.

use crate::solver::Equilibria;
use crate::stability::StabilityConcept;
use serde::Serialize;

/// Severity level for an analysis finding.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum FindingSeverity {
    Info,
    Warning,
}

/// A notable finding from analysis.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub analysis: String,
    pub severity: FindingSeverity,
    pub message: String,
    pub entity_id: Option<String>,
    pub details: Option<serde_json::Value>,
}

/// Shape of the analyzed conflict and what was repaired while loading it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModelSummary {
    pub options: Vec<String>,
    pub parties: Vec<String>,
    pub state_count: usize,
    pub coalitions_reset: bool,
    pub duplicate_infeasibles: usize,
    /// States removed by each infeasible condition, in order.
    pub states_removed: Vec<u64>,
}

/// One row of the per-state table.
#[derive(Debug, Clone, Serialize)]
pub struct StateSummary {
    pub index: usize,
    pub decimal: u64,
    pub yn: String,
    /// Labels of the concepts under which the state is an equilibrium.
    pub equilibrium_under: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub model: Option<ModelSummary>,
    pub equilibria: Option<Equilibria>,
    pub states: Vec<StateSummary>,
    pub analyses_run: Vec<String>,
    pub findings: Vec<Finding>,
}

impl AnalysisReport {
    /// Create a new empty report.
    pub fn new() -> Self {
        AnalysisReport {
            model: None,
            equilibria: None,
            states: Vec::new(),
            analyses_run: Vec::new(),
            findings: Vec::new(),
        }
    }

    /// Extract findings from populated results.
    pub fn extract_findings(&mut self) {
        self.findings.clear();

        if let Some(ref model) = self.model {
            if model.coalitions_reset {
                self.findings.push(Finding {
                    analysis: "model".to_string(),
                    severity: FindingSeverity::Warning,
                    message: "Coalitions did not partition the decision makers and were reset to singletons".to_string(),
                    entity_id: None,
                    details: None,
                });
            }
            if model.duplicate_infeasibles > 0 {
                self.findings.push(Finding {
                    analysis: "model".to_string(),
                    severity: FindingSeverity::Info,
                    message: format!(
                        "{} duplicate infeasible condition(s) dropped",
                        model.duplicate_infeasibles
                    ),
                    entity_id: None,
                    details: Some(serde_json::json!({
                        "duplicate_infeasibles": model.duplicate_infeasibles,
                    })),
                });
            }
            for (i, removed) in model.states_removed.iter().enumerate() {
                if *removed == 0 {
                    self.findings.push(Finding {
                        analysis: "model".to_string(),
                        severity: FindingSeverity::Info,
                        message: format!(
                            "Infeasible condition {} removes no states not already removed",
                            i + 1
                        ),
                        entity_id: Some(format!("infeasible{}", i + 1)),
                        details: None,
                    });
                }
            }
        }

        if let Some(ref eq) = self.equilibria {
            if !eq.nash.iter().any(|e| *e) {
                self.findings.push(Finding {
                    analysis: "equilibria".to_string(),
                    severity: FindingSeverity::Warning,
                    message: "No Nash equilibria".to_string(),
                    entity_id: None,
                    details: None,
                });
            }
            let empty: Vec<&str> = eq
                .rows()
                .iter()
                .filter(|(_, row)| !row.iter().any(|e| *e))
                .map(|(label, _)| *label)
                .collect();
            if empty.len() == eq.rows().len() {
                self.findings.push(Finding {
                    analysis: "equilibria".to_string(),
                    severity: FindingSeverity::Warning,
                    message: "No state is an equilibrium under any concept".to_string(),
                    entity_id: None,
                    details: None,
                });
            }
            for state in &self.states {
                if state.equilibrium_under.len() == eq.rows().len() {
                    self.findings.push(Finding {
                        analysis: "equilibria".to_string(),
                        severity: FindingSeverity::Info,
                        message: format!(
                            "State {} ({}) is an equilibrium under every concept",
                            state.index + 1,
                            state.yn
                        ),
                        entity_id: Some(format!("state{}", state.index + 1)),
                        details: None,
                    });
                }
            }
            // A state stable by SMR but not SEQ is legitimate but rarely expected.
            let smr_only: Vec<usize> = eq
                .states(StabilityConcept::Smr)
                .into_iter()
                .filter(|s| !eq.seq[*s])
                .map(|s| s + 1)
                .collect();
            if !smr_only.is_empty() {
                self.findings.push(Finding {
                    analysis: "equilibria".to_string(),
                    severity: FindingSeverity::Info,
                    message: format!(
                        "SMR equilibria that are not SEQ equilibria: {}",
                        smr_only
                            .iter()
                            .map(|s| s.to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                    entity_id: None,
                    details: Some(serde_json::json!({ "states": smr_only })),
                });
            }
        }

        // Sort findings for deterministic output
        self.findings.sort_by(|a, b| {
            a.analysis
                .cmp(&b.analysis)
                .then_with(|| format!("{:?}", a.severity).cmp(&format!("{:?}", b.severity)))
                .then_with(|| a.message.cmp(&b.message))
        });
    }
}

impl Default for AnalysisReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-state rows of a stability table.
pub fn state_summaries(eq: &Equilibria, decimals: &[u64], yn: &[String]) -> Vec<StateSummary> {
    (0..eq.nash.len())
        .map(|s| StateSummary {
            index: s,
            decimal: decimals.get(s).copied().unwrap_or_default(),
            yn: yn.get(s).cloned().unwrap_or_default(),
            equilibrium_under: eq
                .rows()
                .iter()
                .filter(|(_, row)| row[s])
                .map(|(label, _)| label.to_string())
                .collect(),
        })
        .collect()
}
