//! Goal seeking: what must preferences look like for chosen states to be
//! stable (or unstable)?

use crate::cancel::CancellationToken;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::reachability::ReachabilityMatrices;
use crate::requirements::{concept_requirement, Consistency, Requirement};
use crate::stability::{SearchLimits, StabilityConcept};
use gmcr_core::{ConflictModel, ConflictSnapshot, Party};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub state: usize,
    pub stable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalStatement {
    pub goal: Goal,
    pub requirement: Requirement,
}

/// Requirements for every goal under one concept.
#[derive(Debug, Clone, Serialize)]
pub struct GoalRequirements {
    pub concept: StabilityConcept,
    pub statements: Vec<GoalStatement>,
    /// Whether all goals can hold together.
    pub consistency: Consistency,
}

impl GoalRequirements {
    /// The conjunction of every goal's requirement.
    pub fn combined(&self) -> Requirement {
        Requirement::all(self.statements.iter().map(|s| s.requirement.clone()).collect())
    }

    pub fn render(&self) -> String {
        let blocks: Vec<String> = self
            .statements
            .iter()
            .map(|s| {
                let body = match &s.requirement {
                    r @ (Requirement::And(_) | Requirement::Or(_)) => r.render_indented(" |"),
                    leaf => Requirement::And(vec![leaf.clone()]).render_indented(" |"),
                };
                format!(
                    " |For {} to be {} by {}:\n{}",
                    s.goal.state + 1,
                    if s.goal.stable { "stable" } else { "unstable" },
                    self.concept,
                    body
                )
            })
            .collect();
        let mut out = format!(
            "Conditions for goals using {}:\n{}",
            self.concept,
            blocks.join("AND\n")
        );
        match &self.consistency {
            Consistency::Satisfiable { .. } => out.push_str("\nThe goals can be met together.\n"),
            Consistency::Unsatisfiable {
                conflict: Some(conflict),
            } => out.push_str(&format!("\nIMPOSSIBLE: {}\n", conflict)),
            Consistency::Unsatisfiable { conflict: None } => {
                out.push_str("\nIMPOSSIBLE: a goal has no way to hold\n")
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct GoalSeeker {
    matrices: ReachabilityMatrices,
    names: Vec<String>,
    goals: Vec<Goal>,
    limits: SearchLimits,
}

impl GoalSeeker {
    pub fn new(
        snapshot: &ConflictSnapshot,
        goals: Vec<Goal>,
        config: &AnalysisConfig,
    ) -> Result<Self, AnalysisError> {
        if goals.is_empty() {
            return Err(AnalysisError::NoGoals);
        }
        let count = snapshot.state_count();
        if let Some(bad) = goals.iter().find(|g| g.state >= count) {
            return Err(AnalysisError::UnknownState {
                state: bad.state,
                count,
            });
        }
        let matrices = ReachabilityMatrices::build(snapshot, config)?;
        let names = matrices.parties().iter().map(|p| p.name().to_string()).collect();
        Ok(GoalSeeker {
            matrices,
            names,
            goals,
            limits: SearchLimits::new(config, CancellationToken::new()),
        })
    }

    pub fn for_model(
        model: &ConflictModel,
        goals: Vec<Goal>,
        config: &AnalysisConfig,
    ) -> Result<Self, AnalysisError> {
        let snapshot = model.snapshot()?;
        Self::new(&snapshot, goals, config)
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.limits.cancel = cancel;
        self
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn requirements(&self, concept: StabilityConcept) -> Result<GoalRequirements, AnalysisError> {
        let statements = self
            .goals
            .iter()
            .map(|&goal| {
                let stable =
                    concept_requirement(&self.matrices, &self.names, concept, goal.state, &self.limits)?;
                Ok(GoalStatement {
                    goal,
                    requirement: if goal.stable { stable } else { stable.negate() },
                })
            })
            .collect::<Result<Vec<_>, AnalysisError>>()?;
        let combined = Requirement::all(statements.iter().map(|s| s.requirement.clone()).collect());
        let consistency = combined.check();
        debug!(
            concept = %concept,
            goals = statements.len(),
            satisfiable = consistency.is_satisfiable(),
            "goal requirements built"
        );
        Ok(GoalRequirements {
            concept,
            statements,
            consistency,
        })
    }

    pub fn nash(&self) -> Result<GoalRequirements, AnalysisError> {
        self.requirements(StabilityConcept::Nash)
    }

    pub fn seq(&self) -> Result<GoalRequirements, AnalysisError> {
        self.requirements(StabilityConcept::Seq)
    }
}
