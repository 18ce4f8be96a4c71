//! Inverse analysis: which preference rankings make a target state an
//! equilibrium.
//!
//! Each decision maker may let one contiguous span of its ranking vary.
//! Every permutation of every span is a candidate; the candidates are the
//! Cartesian product over decision makers, ordered with the last decision
//! maker's permutation changing fastest. Alternatively the requirements
//! can be derived symbolically as a [`Requirement`] tree and reduced
//! against the relations the vary ranges leave fixed.

use crate::cancel::CancellationToken;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::reachability::ReachabilityMatrices;
use crate::requirements::{concept_requirement, party_requirement, Consistency, Requirement, Simplified};
use crate::stability::{improvements, is_stable, MoveContext, SearchLimits, StabilityConcept};
use gmcr_core::{ConflictModel, ConflictSnapshot, Ranking};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, info};

const REFINEMENT_HEADER: &str = "    With the given preference rankings and vary range:";
const ALWAYS_STABLE: &str = "    equilibrium exists under all selected rankings";

/// Ranking entries `start..end` (0-based, end exclusive) may be permuted.
/// An empty range keeps the ranking fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VaryRange {
    pub start: usize,
    pub end: usize,
}

impl VaryRange {
    pub fn new(start: usize, end: usize) -> Self {
        VaryRange { start, end }
    }

    pub fn is_fixed(&self) -> bool {
        self.start >= self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InverseRequest {
    /// Desired equilibrium, as a feasible state index.
    pub target: Option<usize>,
    /// One range per decision maker, in decision maker order. Missing
    /// trailing ranges are fixed.
    pub vary: Vec<VaryRange>,
}

/// Stability of the target under one candidate set of rankings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateResult {
    pub index: usize,
    pub rankings: Vec<Ranking>,
    pub nash: bool,
    pub gmr: bool,
    pub seq: bool,
    pub sim: bool,
    pub smr: bool,
}

impl CandidateResult {
    pub fn is(&self, concept: StabilityConcept) -> bool {
        match concept {
            StabilityConcept::Nash => self.nash,
            StabilityConcept::Gmr => self.gmr,
            StabilityConcept::Seq => self.seq,
            StabilityConcept::Sim => self.sim,
            StabilityConcept::Smr => self.smr,
        }
    }
}

/// Number of candidates under which the target is an equilibrium, per
/// concept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConceptCounts {
    pub nash: usize,
    pub gmr: usize,
    pub seq: usize,
    pub sim: usize,
    pub smr: usize,
}

impl ConceptCounts {
    pub fn get(&self, concept: StabilityConcept) -> usize {
        match concept {
            StabilityConcept::Nash => self.nash,
            StabilityConcept::Gmr => self.gmr,
            StabilityConcept::Seq => self.seq,
            StabilityConcept::Sim => self.sim,
            StabilityConcept::Smr => self.smr,
        }
    }

    fn tally(results: &[CandidateResult]) -> Self {
        let count = |concept| results.iter().filter(|r| r.is(concept)).count();
        ConceptCounts {
            nash: count(StabilityConcept::Nash),
            gmr: count(StabilityConcept::Gmr),
            seq: count(StabilityConcept::Seq),
            sim: count(StabilityConcept::Sim),
            smr: count(StabilityConcept::Smr),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InverseResults {
    pub target: usize,
    pub candidates: Vec<CandidateResult>,
    pub counts: ConceptCounts,
}

impl InverseResults {
    /// Candidates stable under every concept in `required`, with the
    /// per-concept counts over all candidates.
    pub fn filter(&self, required: &[StabilityConcept]) -> (Vec<&CandidateResult>, ConceptCounts) {
        let matching = self
            .candidates
            .iter()
            .filter(|c| required.iter().all(|r| c.is(*r)))
            .collect();
        (matching, self.counts)
    }
}

/// Symbolic requirements for one concept.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolicAnalysis {
    pub concept: StabilityConcept,
    pub requirement: Requirement,
    /// The requirement with every relation the vary ranges fix resolved.
    pub under_vary: Simplified,
    pub consistency: Consistency,
}

impl SymbolicAnalysis {
    pub fn render(&self, target: usize) -> String {
        let mut out = format!(
            "Requirements for {} to be stable by {}:\n{}",
            target + 1,
            self.concept,
            self.requirement.render_annotated()
        );
        out.push('\n');
        out.push_str(REFINEMENT_HEADER);
        out.push('\n');
        out.push_str(&describe_simplified(&self.under_vary));
        out
    }
}

fn describe_simplified(simplified: &Simplified) -> String {
    match simplified {
        Simplified::Always => format!("{}\n", ALWAYS_STABLE),
        Simplified::Never => "    Equilibrium not possible under the selected rankings\n".to_string(),
        Simplified::Open(r) => r
            .render()
            .lines()
            .map(|line| format!("    {}\n", line))
            .collect(),
    }
}

fn labels(states: &[usize]) -> String {
    format!(
        "[{}]",
        states
            .iter()
            .map(|s| (s + 1).to_string())
            .collect::<Vec<_>>()
            .join(", ")
    )
}

fn factorial(n: usize) -> Option<u128> {
    (1..=n as u128).try_fold(1u128, |acc, k| acc.checked_mul(k))
}

/// The `index`-th permutation of `items` in lexicographic order of
/// positions.
fn nth_permutation<T: Clone>(items: &[T], mut index: u128) -> Vec<T> {
    let mut pool = items.to_vec();
    let mut out = Vec::with_capacity(pool.len());
    while !pool.is_empty() {
        let block = factorial(pool.len() - 1).unwrap_or(u128::MAX);
        let pos = usize::try_from(index / block).unwrap_or(0).min(pool.len() - 1);
        index %= block;
        out.push(pool.remove(pos));
    }
    out
}

/// Matrix reachability with one candidate's payoffs.
struct CandidateContext<'a> {
    matrices: &'a ReachabilityMatrices,
    payoffs: Vec<Vec<i64>>,
}

impl MoveContext for CandidateContext<'_> {
    fn party_count(&self) -> usize {
        self.payoffs.len()
    }

    fn reachable_from(&self, party: usize, state: usize) -> &[usize] {
        self.matrices.reachable_from(party, state)
    }

    fn compare(&self, party: usize, from: usize, to: usize) -> i64 {
        self.payoffs[party][to] - self.payoffs[party][from]
    }

    fn decimal(&self, state: usize) -> u64 {
        self.matrices.decimal(state)
    }

    fn state_index(&self, decimal: u64) -> Option<usize> {
        self.matrices.state_index(decimal)
    }
}

#[derive(Debug, Clone)]
pub struct InverseSolver {
    /// Built without coalitions: rankings belong to decision makers.
    matrices: ReachabilityMatrices,
    names: Vec<String>,
    base: Vec<Ranking>,
    base_payoffs: Vec<Vec<i64>>,
    vary: Vec<VaryRange>,
    /// `entry_of[dm][state]`: ranking entry holding the state.
    entry_of: Vec<Vec<usize>>,
    radices: Vec<u128>,
    target: usize,
    candidate_count: usize,
    limits: SearchLimits,
    parallel: bool,
}

impl InverseSolver {
    pub fn new(
        snapshot: &ConflictSnapshot,
        request: &InverseRequest,
        config: &AnalysisConfig,
    ) -> Result<Self, AnalysisError> {
        let target = request.target.ok_or(AnalysisError::MissingTarget)?;
        let state_count = snapshot.state_count();
        if target >= state_count {
            return Err(AnalysisError::UnknownState {
                state: target,
                count: state_count,
            });
        }
        let dms = snapshot.decision_makers();
        if dms.is_empty() {
            return Err(AnalysisError::NoDecisionMakers);
        }
        if request.vary.len() > dms.len() {
            return Err(AnalysisError::TooManyVaryRanges {
                given: request.vary.len(),
                count: dms.len(),
            });
        }
        let mut vary = request.vary.clone();
        vary.resize(dms.len(), VaryRange::default());

        for (dm, range) in dms.iter().zip(&vary) {
            if range.start > range.end || range.end > dm.ranking.len() {
                return Err(AnalysisError::InvalidVaryRange {
                    dm: dm.name.clone(),
                    start: range.start,
                    end: range.end,
                    len: dm.ranking.len(),
                });
            }
        }

        let radices: Vec<u128> = vary
            .iter()
            .map(|r| factorial(r.len()).unwrap_or(u128::MAX))
            .collect();
        let count = radices
            .iter()
            .try_fold(1u128, |acc, r| acc.checked_mul(*r))
            .unwrap_or(u128::MAX);
        let too_many = AnalysisError::TooManyCandidates {
            count,
            max: config.max_candidates,
        };
        if count > u128::from(config.max_candidates) {
            return Err(too_many);
        }
        let candidate_count = usize::try_from(count).map_err(|_| too_many)?;

        let matrices = ReachabilityMatrices::build(
            snapshot,
            &AnalysisConfig {
                use_coalitions: false,
                ..config.clone()
            },
        )?;
        let base: Vec<Ranking> = dms.iter().map(|dm| dm.ranking.clone()).collect();
        let base_payoffs = base.iter().map(|r| r.payoffs(state_count)).collect();
        let entry_of = base
            .iter()
            .map(|r| {
                (0..state_count)
                    .map(|s| r.position_of(s).unwrap_or(usize::MAX))
                    .collect()
            })
            .collect();

        debug!(target, candidates = candidate_count, "inverse solver ready");
        Ok(InverseSolver {
            matrices,
            names: dms.iter().map(|dm| dm.name.clone()).collect(),
            base,
            base_payoffs,
            vary,
            entry_of,
            radices,
            target,
            candidate_count,
            limits: SearchLimits::new(config, CancellationToken::new()),
            parallel: config.parallel,
        })
    }

    pub fn for_model(
        model: &ConflictModel,
        request: &InverseRequest,
        config: &AnalysisConfig,
    ) -> Result<Self, AnalysisError> {
        let snapshot = model.snapshot()?;
        Self::new(&snapshot, request, config)
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.limits.cancel = cancel;
        self
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn candidate_count(&self) -> usize {
        self.candidate_count
    }

    pub fn matrices(&self) -> &ReachabilityMatrices {
        &self.matrices
    }

    pub fn decision_maker_names(&self) -> &[String] {
        &self.names
    }

    fn varies(&self) -> bool {
        self.vary.iter().any(|r| !r.is_fixed())
    }

    /// Ordering of `a` against `b` for a decision maker when every
    /// candidate agrees on it; `None` while the vary range leaves it open.
    pub fn relation(&self, dm: usize, a: usize, b: usize) -> Option<Ordering> {
        let range = self.vary.get(dm)?;
        let entry_a = self.entry_of[dm][a];
        let entry_b = self.entry_of[dm][b];
        let varied = |e: usize| e >= range.start && e < range.end;
        if a != b && entry_a != entry_b && varied(entry_a) && varied(entry_b) {
            None
        } else {
            Some(self.base_payoffs[dm][a].cmp(&self.base_payoffs[dm][b]))
        }
    }

    /// The rankings of candidate `index`.
    pub fn candidate_rankings(&self, index: usize) -> Vec<Ranking> {
        let mut rest = index as u128;
        let mut digits = vec![0u128; self.radices.len()];
        for (digit, radix) in digits.iter_mut().zip(&self.radices).rev() {
            *digit = rest % radix;
            rest /= radix;
        }
        self.base
            .iter()
            .zip(&self.vary)
            .zip(digits)
            .map(|((ranking, range), digit)| {
                if range.is_fixed() {
                    return ranking.clone();
                }
                let entries = ranking.entries();
                let mut out = entries[..range.start].to_vec();
                out.extend(nth_permutation(&entries[range.start..range.end], digit));
                out.extend_from_slice(&entries[range.end..]);
                Ranking(out)
            })
            .collect()
    }

    /// Evaluate all five concepts at the target under candidate `index`.
    pub fn evaluate(&self, index: usize) -> Result<CandidateResult, AnalysisError> {
        self.limits.cancel.check()?;
        let rankings = self.candidate_rankings(index);
        let n = self.matrices.state_count();
        let ctx = CandidateContext {
            matrices: &self.matrices,
            payoffs: rankings.iter().map(|r| r.payoffs(n)).collect(),
        };
        let nash_by_dm: Vec<bool> = (0..ctx.party_count())
            .map(|dm| improvements(&ctx, dm, self.target, None).is_empty())
            .collect();
        let nash = nash_by_dm.iter().all(|s| *s);

        let mut result = CandidateResult {
            index,
            rankings,
            nash,
            gmr: nash,
            seq: nash,
            sim: nash,
            smr: nash,
        };
        if nash {
            return Ok(result);
        }
        for concept in [
            StabilityConcept::Gmr,
            StabilityConcept::Seq,
            StabilityConcept::Sim,
            StabilityConcept::Smr,
        ] {
            let mut stable = true;
            for (dm, nash_stable) in nash_by_dm.iter().enumerate() {
                if !nash_stable && !is_stable(&ctx, concept, dm, self.target, &self.limits)? {
                    stable = false;
                    break;
                }
            }
            match concept {
                StabilityConcept::Gmr => result.gmr = stable,
                StabilityConcept::Seq => result.seq = stable,
                StabilityConcept::Sim => result.sim = stable,
                StabilityConcept::Smr => result.smr = stable,
                StabilityConcept::Nash => {}
            }
        }
        Ok(result)
    }

    /// Enumerate every candidate.
    pub fn solve(&self) -> Result<InverseResults, AnalysisError> {
        debug!(candidates = self.candidate_count, "enumerating candidate rankings");
        let candidates: Vec<CandidateResult> = if self.parallel {
            (0..self.candidate_count)
                .into_par_iter()
                .map(|i| self.evaluate(i))
                .collect::<Result<_, _>>()?
        } else {
            (0..self.candidate_count)
                .map(|i| self.evaluate(i))
                .collect::<Result<_, _>>()?
        };
        let counts = ConceptCounts::tally(&candidates);
        info!(
            target = self.target,
            candidates = candidates.len(),
            nash = counts.nash,
            gmr = counts.gmr,
            seq = counts.seq,
            sim = counts.sim,
            smr = counts.smr,
            "inverse analysis complete"
        );
        Ok(InverseResults {
            target: self.target,
            candidates,
            counts,
        })
    }

    /// Requirements on the rankings for the target to be stable under
    /// `concept`, independent of the vary ranges.
    pub fn requirement(&self, concept: StabilityConcept) -> Result<Requirement, AnalysisError> {
        concept_requirement(&self.matrices, &self.names, concept, self.target, &self.limits)
    }

    pub fn symbolic(&self, concept: StabilityConcept) -> Result<SymbolicAnalysis, AnalysisError> {
        let requirement = self.requirement(concept)?;
        let under_vary = requirement.simplify(&|dm, a, b| self.relation(dm, a, b));
        let consistency = match &under_vary {
            Simplified::Always => Consistency::Satisfiable {
                relations: Vec::new(),
            },
            Simplified::Never => Consistency::Unsatisfiable { conflict: None },
            Simplified::Open(open) => open.check(),
        };
        Ok(SymbolicAnalysis {
            concept,
            requirement,
            under_vary,
            consistency,
        })
    }

    fn refinement(&self, concept: StabilityConcept, dm: usize) -> Result<String, AnalysisError> {
        let requirement =
            party_requirement(&self.matrices, &self.names, concept, dm, self.target, &self.limits)?;
        Ok(describe_simplified(
            &requirement.simplify(&|d, a, b| self.relation(d, a, b)),
        ))
    }

    fn no_moves(&self, dm: usize) -> String {
        format!(
            "For DM {}: Always stable as there are no moves from {}",
            self.names[dm],
            self.target + 1
        )
    }

    /// Conditions for the target to be a Nash equilibrium, per decision
    /// maker.
    pub fn nash_conditions(&self) -> String {
        let target = self.target;
        let mut sections = Vec::new();
        for (dm, name) in self.names.iter().enumerate() {
            let reach = self.matrices.reachable_from(dm, target);
            if reach.is_empty() {
                sections.push(self.no_moves(dm));
            } else {
                sections.push(format!(
                    "For DM {}: {} must be more preferred than {}",
                    name,
                    target + 1,
                    labels(reach)
                ));
            }
            if !self.varies() {
                continue;
            }
            sections.push(REFINEMENT_HEADER.to_string());
            let mut lines = String::new();
            for &s1 in reach {
                match self.relation(dm, target, s1) {
                    None => lines.push_str(&format!(
                        "    {} must be more preferred than {}.\n",
                        target + 1,
                        s1 + 1
                    )),
                    Some(Ordering::Less) => {
                        lines = format!(
                            "    Equilibrium not possible as {} is always more preferred than {}",
                            s1 + 1,
                            target + 1
                        );
                        break;
                    }
                    Some(_) => {}
                }
            }
            if lines.is_empty() {
                lines = ALWAYS_STABLE.to_string();
            }
            sections.push(lines);
        }
        sections.join("\n\n")
    }

    /// Conditions for the target to be a GMR equilibrium.
    pub fn gmr_conditions(&self) -> Result<String, AnalysisError> {
        let target = self.target;
        let mut sections = Vec::new();
        for (dm, name) in self.names.iter().enumerate() {
            let reach = self.matrices.reachable_from(dm, target);
            if reach.is_empty() {
                sections.push(self.no_moves(dm));
            } else {
                let mut sanctions: Vec<usize> = reach
                    .iter()
                    .flat_map(|&s1| {
                        (0..self.names.len())
                            .filter(move |o| *o != dm)
                            .flat_map(move |o| self.matrices.reachable_from(o, s1).iter().copied())
                    })
                    .collect();
                sanctions.sort_unstable();
                sanctions.dedup();
                sections.push(format!(
                    "For DM {}: {} must be more preferred than {}\n\n  or at least one of {} must be less preferred than {}",
                    name,
                    target + 1,
                    labels(reach),
                    labels(&sanctions),
                    target + 1
                ));
            }
            if self.varies() {
                sections.push(REFINEMENT_HEADER.to_string());
                sections.push(self.refinement(StabilityConcept::Gmr, dm)?);
            }
        }
        Ok(sections.join("\n\n"))
    }

    /// Conditions for the target to be a SEQ equilibrium.
    pub fn seq_conditions(&self) -> Result<String, AnalysisError> {
        let target = self.target;
        let mut sections = Vec::new();
        for (dm, name) in self.names.iter().enumerate() {
            let reach = self.matrices.reachable_from(dm, target);
            if reach.is_empty() {
                sections.push(self.no_moves(dm));
            } else {
                let mut message = format!(
                    "For DM {}: {} must be more preferred than {}",
                    name,
                    target + 1,
                    labels(reach)
                );
                for (opponent, opponent_name) in self.names.iter().enumerate() {
                    if opponent == dm {
                        continue;
                    }
                    for &s1 in reach {
                        for &s2 in self.matrices.reachable_from(opponent, s1) {
                            message.push_str(&format!(
                                "\n\n  or if {} is preferred to {} for DM {}, {} must be less preferred than {} for DM {}",
                                s2 + 1,
                                s1 + 1,
                                opponent_name,
                                s2 + 1,
                                target + 1,
                                name
                            ));
                        }
                    }
                }
                sections.push(message);
            }
            if self.varies() {
                sections.push(REFINEMENT_HEADER.to_string());
                sections.push(self.refinement(StabilityConcept::Seq, dm)?);
            }
        }
        Ok(sections.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmcr_core::{Condition, PermittedDirection, RankEntry};

    fn prisoners() -> ConflictModel {
        let mut model = ConflictModel::new();
        let a = model.add_option("A confesses", PermittedDirection::Both).unwrap();
        let b = model.add_option("B confesses", PermittedDirection::Both).unwrap();
        let dm_a = model.add_decision_maker("A");
        let dm_b = model.add_decision_maker("B");
        model.assign_option(dm_a, a).unwrap();
        model.assign_option(dm_b, b).unwrap();
        model
            .set_preferences(
                dm_a,
                vec![
                    Condition::simple(vec![(b, false)]),
                    Condition::simple(vec![(a, true)]),
                ],
            )
            .unwrap();
        model
            .set_preferences(
                dm_b,
                vec![
                    Condition::simple(vec![(a, false)]),
                    Condition::simple(vec![(b, true)]),
                ],
            )
            .unwrap();
        model
    }

    fn solver(target: Option<usize>, vary: Vec<VaryRange>) -> Result<InverseSolver, AnalysisError> {
        InverseSolver::for_model(
            &prisoners(),
            &InverseRequest { target, vary },
            &AnalysisConfig::default(),
        )
    }

    fn top_two() -> Vec<VaryRange> {
        vec![VaryRange::new(0, 2), VaryRange::new(0, 2)]
    }

    fn states(r: &Ranking) -> Vec<usize> {
        r.entries().iter().flat_map(|e| e.states().to_vec()).collect()
    }

    #[test]
    fn test_four_candidates_in_product_order() {
        let s = solver(Some(0), top_two()).unwrap();
        assert_eq!(s.candidate_count(), 4);
        let a: Vec<Vec<usize>> = (0..4).map(|i| states(&s.candidate_rankings(i)[0])).collect();
        let b: Vec<Vec<usize>> = (0..4).map(|i| states(&s.candidate_rankings(i)[1])).collect();
        assert_eq!(a[0], vec![1, 0, 3, 2]);
        assert_eq!(a[1], vec![1, 0, 3, 2]);
        assert_eq!(a[2], vec![0, 1, 3, 2]);
        assert_eq!(b[0], vec![2, 0, 3, 1]);
        assert_eq!(b[1], vec![0, 2, 3, 1]);
        assert_eq!(b[3], vec![0, 2, 3, 1]);
    }

    #[test]
    fn test_truth_table_at_mutual_cooperation() {
        let results = solver(Some(0), top_two()).unwrap().solve().unwrap();
        let column = |c: StabilityConcept| -> Vec<bool> {
            results.candidates.iter().map(|r| r.is(c)).collect()
        };
        assert_eq!(column(StabilityConcept::Nash), vec![false, false, false, true]);
        assert_eq!(column(StabilityConcept::Gmr), vec![true; 4]);
        assert_eq!(column(StabilityConcept::Seq), vec![true; 4]);
        assert_eq!(column(StabilityConcept::Sim), vec![true, false, false, true]);
        assert_eq!(results.counts.nash, 1);
        assert_eq!(results.counts.sim, 2);
    }

    #[test]
    fn test_filter_keeps_counts_over_all_candidates() {
        let results = solver(Some(0), top_two()).unwrap().solve().unwrap();
        let (rows, counts) = results.filter(&[StabilityConcept::Nash]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].index, 3);
        assert_eq!(counts.gmr, 4);
        let (rows, _) = results.filter(&[StabilityConcept::Sim, StabilityConcept::Seq]);
        assert_eq!(rows.iter().map(|r| r.index).collect::<Vec<_>>(), vec![0, 3]);
        assert_eq!(results.filter(&[]).0.len(), 4);
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let request = InverseRequest {
            target: Some(0),
            vary: vec![VaryRange::new(0, 4), VaryRange::new(1, 3)],
        };
        let run = |parallel| {
            InverseSolver::for_model(
                &prisoners(),
                &request,
                &AnalysisConfig {
                    parallel,
                    ..AnalysisConfig::default()
                },
            )
            .unwrap()
            .solve()
            .unwrap()
            .candidates
        };
        let seq = run(false);
        assert_eq!(seq.len(), 48);
        assert_eq!(seq, run(true));
    }

    #[test]
    fn test_symbolic_agrees_with_enumeration() {
        let s = solver(Some(0), vec![VaryRange::new(0, 4), VaryRange::new(0, 3)]).unwrap();
        let results = s.solve().unwrap();
        let n = s.matrices().state_count();
        for concept in StabilityConcept::ALL {
            let tree = s.requirement(concept).unwrap();
            for candidate in &results.candidates {
                let payoffs: Vec<Vec<i64>> =
                    candidate.rankings.iter().map(|r| r.payoffs(n)).collect();
                let prefers = |p: usize, a: usize, b: usize| payoffs[p][a].cmp(&payoffs[p][b]);
                assert_eq!(tree.holds(&prefers), candidate.is(concept), "{concept}");
            }
        }
    }

    #[test]
    fn test_relation_open_only_inside_vary_range() {
        let s = solver(Some(0), vec![VaryRange::new(0, 2)]).unwrap();
        // A ranks 1, 0, 3, 2: the top two are open.
        assert_eq!(s.relation(0, 0, 1), None);
        assert_eq!(s.relation(0, 0, 3), Some(Ordering::Greater));
        assert_eq!(s.relation(0, 0, 0), Some(Ordering::Equal));
        // B's range was padded to fixed.
        assert_eq!(s.relation(1, 0, 2), Some(Ordering::Less));
        assert_eq!(s.candidate_count(), 2);
    }

    #[test]
    fn test_tied_entries_move_together() {
        let mut model = prisoners();
        model
            .set_ranking(
                0,
                Ranking(vec![
                    RankEntry::Tied(vec![0, 1]),
                    RankEntry::State(3),
                    RankEntry::State(2),
                ]),
            )
            .unwrap();
        model
            .set_ranking(1, Ranking((0..4).map(RankEntry::State).collect()))
            .unwrap();
        model.set_use_manual_ranking(true);
        let s = InverseSolver::for_model(
            &model,
            &InverseRequest {
                target: Some(0),
                vary: vec![VaryRange::new(0, 2)],
            },
            &AnalysisConfig::default(),
        )
        .unwrap();
        assert_eq!(s.candidate_count(), 2);
        assert_eq!(s.relation(0, 0, 1), Some(Ordering::Equal));
        assert_eq!(s.relation(0, 0, 3), None);
        let second = &s.candidate_rankings(1)[0];
        assert_eq!(second.entries()[1], RankEntry::Tied(vec![0, 1]));
    }

    #[test]
    fn test_request_validation() {
        assert_eq!(solver(None, top_two()).unwrap_err(), AnalysisError::MissingTarget);
        assert_eq!(
            solver(Some(4), top_two()).unwrap_err(),
            AnalysisError::UnknownState { state: 4, count: 4 }
        );
        assert_eq!(
            solver(Some(0), vec![VaryRange::default(); 3]).unwrap_err(),
            AnalysisError::TooManyVaryRanges { given: 3, count: 2 }
        );
        assert!(matches!(
            solver(Some(0), vec![VaryRange::new(3, 1)]),
            Err(AnalysisError::InvalidVaryRange { start: 3, end: 1, .. })
        ));
        assert!(matches!(
            solver(Some(0), vec![VaryRange::new(0, 5)]),
            Err(AnalysisError::InvalidVaryRange { len: 4, .. })
        ));
    }

    #[test]
    fn test_candidate_ceiling() {
        let err = InverseSolver::for_model(
            &prisoners(),
            &InverseRequest {
                target: Some(0),
                vary: vec![VaryRange::new(0, 4), VaryRange::new(0, 4)],
            },
            &AnalysisConfig {
                max_candidates: 100,
                ..AnalysisConfig::default()
            },
        )
        .unwrap_err();
        assert_eq!(err, AnalysisError::TooManyCandidates { count: 576, max: 100 });
    }

    #[test]
    fn test_cancelled_enumeration() {
        let cancel = CancellationToken::new();
        let s = solver(Some(0), top_two()).unwrap().with_cancellation(cancel.clone());
        cancel.cancel();
        assert_eq!(s.solve().unwrap_err(), AnalysisError::Cancelled);
    }

    #[test]
    fn test_nash_conditions_text() {
        let s = solver(Some(0), top_two()).unwrap();
        let text = s.nash_conditions();
        assert!(text.starts_with("For DM A: 1 must be more preferred than [2]"));
        assert!(text.contains(REFINEMENT_HEADER));
        assert!(text.contains("    1 must be more preferred than 2.\n"));

        let fixed = solver(Some(0), Vec::new()).unwrap();
        assert!(!fixed.nash_conditions().contains(REFINEMENT_HEADER));

        // A always prefers 2 to 1 when only the bottom two entries vary.
        let s = solver(Some(0), vec![VaryRange::new(2, 4)]).unwrap();
        assert!(s
            .nash_conditions()
            .contains("    Equilibrium not possible as 2 is always more preferred than 1"));
    }

    #[test]
    fn test_gmr_and_seq_conditions_text() {
        let s = solver(Some(0), top_two()).unwrap();
        let gmr = s.gmr_conditions().unwrap();
        assert!(gmr.contains("  or at least one of [4] must be less preferred than 1"));
        // Fixed relations already sanction both moves.
        assert!(gmr.contains(ALWAYS_STABLE));
        let seq = s.seq_conditions().unwrap();
        assert!(seq.contains(
            "  or if 4 is preferred to 2 for DM B, 4 must be less preferred than 1 for DM A"
        ));
    }

    #[test]
    fn test_symbolic_summary() {
        let s = solver(Some(0), top_two()).unwrap();
        let nash = s.symbolic(StabilityConcept::Nash).unwrap();
        assert!(matches!(nash.under_vary, Simplified::Open(_)));
        assert!(nash.consistency.is_satisfiable());
        let gmr = s.symbolic(StabilityConcept::Gmr).unwrap();
        assert_eq!(gmr.under_vary, Simplified::Always);
        assert!(gmr.render(0).starts_with("Requirements for 1 to be stable by GMR:\n"));
    }
}
