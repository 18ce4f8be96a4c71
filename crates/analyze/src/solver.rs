//! Forward stability analysis: given preferences, find the equilibria.

use crate::cancel::CancellationToken;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::narration::narrate;
use crate::reachability::ReachabilityMatrices;
use crate::stability::{check_stability, is_stable, SearchLimits, StabilityCheck, StabilityConcept};
use gmcr_core::{ConflictModel, ConflictSnapshot, Party};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

/// A stability check together with its narration.
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub check: StabilityCheck,
    pub narration: String,
}

/// Per-state stability of one party under every concept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartyStability {
    pub party: String,
    pub nash: Vec<bool>,
    pub gmr: Vec<bool>,
    pub seq: Vec<bool>,
    pub sim: Vec<bool>,
    pub smr: Vec<bool>,
}

impl PartyStability {
    pub fn concept(&self, concept: StabilityConcept) -> &[bool] {
        match concept {
            StabilityConcept::Nash => &self.nash,
            StabilityConcept::Gmr => &self.gmr,
            StabilityConcept::Seq => &self.seq,
            StabilityConcept::Sim => &self.sim,
            StabilityConcept::Smr => &self.smr,
        }
    }
}

/// A state is an equilibrium under a concept when every party is stable
/// there. `seq_sim` holds where both SEQ and SIM do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Equilibria {
    pub nash: Vec<bool>,
    pub gmr: Vec<bool>,
    pub seq: Vec<bool>,
    pub sim: Vec<bool>,
    pub seq_sim: Vec<bool>,
    pub smr: Vec<bool>,
    pub parties: Vec<PartyStability>,
}

impl Equilibria {
    /// Table rows in display order: Nash, GMR, SEQ, SIM, SEQ&SIM, SMR.
    pub fn rows(&self) -> [(&'static str, &[bool]); 6] {
        [
            ("Nash", self.nash.as_slice()),
            ("GMR", self.gmr.as_slice()),
            ("SEQ", self.seq.as_slice()),
            ("SIM", self.sim.as_slice()),
            ("SEQ & SIM", self.seq_sim.as_slice()),
            ("SMR", self.smr.as_slice()),
        ]
    }

    pub fn concept(&self, concept: StabilityConcept) -> &[bool] {
        match concept {
            StabilityConcept::Nash => &self.nash,
            StabilityConcept::Gmr => &self.gmr,
            StabilityConcept::Seq => &self.seq,
            StabilityConcept::Sim => &self.sim,
            StabilityConcept::Smr => &self.smr,
        }
    }

    /// Indices of the states that are equilibria under `concept`.
    pub fn states(&self, concept: StabilityConcept) -> Vec<usize> {
        self.concept(concept)
            .iter()
            .enumerate()
            .filter_map(|(s, &eq)| eq.then_some(s))
            .collect()
    }
}

/// Forward solver over one snapshot.
#[derive(Debug, Clone)]
pub struct LogicalSolver {
    matrices: ReachabilityMatrices,
    limits: SearchLimits,
    parallel: bool,
}

impl LogicalSolver {
    pub fn new(snapshot: &ConflictSnapshot, config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        let matrices = ReachabilityMatrices::build(snapshot, config)?;
        Ok(LogicalSolver {
            matrices,
            limits: SearchLimits::new(config, CancellationToken::new()),
            parallel: config.parallel,
        })
    }

    /// Snapshot `model` and build a solver for it.
    pub fn for_model(model: &ConflictModel, config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        let snapshot = model.snapshot()?;
        Self::new(&snapshot, config)
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.limits.cancel = cancel;
        self
    }

    pub fn matrices(&self) -> &ReachabilityMatrices {
        &self.matrices
    }

    /// Fail with `StaleSnapshot` if `model` was edited after the snapshot.
    pub fn verify_current(&self, model: &ConflictModel) -> Result<(), AnalysisError> {
        self.matrices.ensure_current(model)
    }

    pub fn check(
        &self,
        concept: StabilityConcept,
        party: usize,
        state: usize,
    ) -> Result<StabilityCheck, AnalysisError> {
        self.matrices.party(party)?;
        self.matrices.check_state(state)?;
        check_stability(&self.matrices, concept, party, state, &self.limits)
    }

    pub fn explain(
        &self,
        concept: StabilityConcept,
        party: usize,
        state: usize,
    ) -> Result<Explanation, AnalysisError> {
        let check = self.check(concept, party, state)?;
        let narration = narrate(&self.matrices, &check);
        Ok(Explanation { check, narration })
    }

    fn verdict(
        &self,
        concept: StabilityConcept,
        party: usize,
        state: usize,
    ) -> Result<(bool, String), AnalysisError> {
        let e = self.explain(concept, party, state)?;
        Ok((e.check.stable, e.narration))
    }

    pub fn nash(&self, party: usize, state: usize) -> Result<(bool, String), AnalysisError> {
        self.verdict(StabilityConcept::Nash, party, state)
    }

    pub fn gmr(&self, party: usize, state: usize) -> Result<(bool, String), AnalysisError> {
        self.verdict(StabilityConcept::Gmr, party, state)
    }

    pub fn seq(&self, party: usize, state: usize) -> Result<(bool, String), AnalysisError> {
        self.verdict(StabilityConcept::Seq, party, state)
    }

    pub fn sim(&self, party: usize, state: usize) -> Result<(bool, String), AnalysisError> {
        self.verdict(StabilityConcept::Sim, party, state)
    }

    pub fn smr(&self, party: usize, state: usize) -> Result<(bool, String), AnalysisError> {
        self.verdict(StabilityConcept::Smr, party, state)
    }

    fn party_stability(&self, party: usize) -> Result<PartyStability, AnalysisError> {
        let n = self.matrices.state_count();
        let mut row = PartyStability {
            party: self.matrices.party(party)?.name().to_string(),
            nash: vec![false; n],
            gmr: vec![false; n],
            seq: vec![false; n],
            sim: vec![false; n],
            smr: vec![false; n],
        };
        for state in 0..n {
            self.limits.cancel.check()?;
            // Nash stability implies the other four.
            if is_stable(&self.matrices, StabilityConcept::Nash, party, state, &self.limits)? {
                row.nash[state] = true;
                row.gmr[state] = true;
                row.seq[state] = true;
                row.sim[state] = true;
                row.smr[state] = true;
                continue;
            }
            row.gmr[state] = is_stable(&self.matrices, StabilityConcept::Gmr, party, state, &self.limits)?;
            row.seq[state] = is_stable(&self.matrices, StabilityConcept::Seq, party, state, &self.limits)?;
            row.sim[state] = is_stable(&self.matrices, StabilityConcept::Sim, party, state, &self.limits)?;
            row.smr[state] = is_stable(&self.matrices, StabilityConcept::Smr, party, state, &self.limits)?;
        }
        Ok(row)
    }

    /// Evaluate every concept for every party and state.
    pub fn find_equilibria(&self) -> Result<Equilibria, AnalysisError> {
        let count = self.matrices.party_count();
        let parties: Vec<PartyStability> = if self.parallel {
            (0..count)
                .into_par_iter()
                .map(|p| self.party_stability(p))
                .collect::<Result<_, _>>()?
        } else {
            (0..count)
                .map(|p| self.party_stability(p))
                .collect::<Result<_, _>>()?
        };

        let n = self.matrices.state_count();
        let all = |concept: StabilityConcept| -> Vec<bool> {
            (0..n)
                .map(|s| parties.iter().all(|p| p.concept(concept)[s]))
                .collect()
        };
        let nash = all(StabilityConcept::Nash);
        let gmr = all(StabilityConcept::Gmr);
        let seq = all(StabilityConcept::Seq);
        let sim = all(StabilityConcept::Sim);
        let smr = all(StabilityConcept::Smr);
        let seq_sim = seq.iter().zip(&sim).map(|(a, b)| *a && *b).collect();

        debug!(parties = count, states = n, "stability table complete");
        info!(
            nash = nash.iter().filter(|e| **e).count(),
            gmr = gmr.iter().filter(|e| **e).count(),
            seq = seq.iter().filter(|e| **e).count(),
            sim = sim.iter().filter(|e| **e).count(),
            smr = smr.iter().filter(|e| **e).count(),
            "equilibria found"
        );

        Ok(Equilibria {
            nash,
            gmr,
            seq,
            sim,
            seq_sim,
            smr,
            parties,
        })
    }
}
