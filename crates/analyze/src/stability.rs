//! Stability definitions.
//!
//! The five concepts are evaluated against any [`MoveContext`]: the forward
//! solver uses the reachability matrices directly, the inverse solver wraps
//! them with a candidate payoff table. Improvements need a strict gain;
//! a sanction only needs the focal party to end up no better off than it
//! started.

use crate::cancel::CancellationToken;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// How often (in combinations) the simultaneous search polls for cancellation.
const CANCEL_POLL_INTERVAL: u64 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StabilityConcept {
    Nash,
    Gmr,
    Seq,
    Sim,
    Smr,
}

impl StabilityConcept {
    pub const ALL: [StabilityConcept; 5] = [
        StabilityConcept::Nash,
        StabilityConcept::Gmr,
        StabilityConcept::Seq,
        StabilityConcept::Sim,
        StabilityConcept::Smr,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StabilityConcept::Nash => "Nash",
            StabilityConcept::Gmr => "GMR",
            StabilityConcept::Seq => "SEQ",
            StabilityConcept::Sim => "SIM",
            StabilityConcept::Smr => "SMR",
        }
    }
}

impl fmt::Display for StabilityConcept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StabilityConcept {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nash" => Ok(StabilityConcept::Nash),
            "gmr" => Ok(StabilityConcept::Gmr),
            "seq" => Ok(StabilityConcept::Seq),
            "sim" => Ok(StabilityConcept::Sim),
            "smr" => Ok(StabilityConcept::Smr),
            other => Err(format!(
                "unknown stability concept '{}' (expected nash, gmr, seq, sim or smr)",
                other
            )),
        }
    }
}

/// What the stability definitions need to know about a conflict.
pub trait MoveContext: Sync {
    fn party_count(&self) -> usize;

    /// Sorted states reachable by `party` from `state`.
    fn reachable_from(&self, party: usize, state: usize) -> &[usize];

    /// Preference change for `party` moving `from` -> `to`; positive is better.
    fn compare(&self, party: usize, from: usize, to: usize) -> i64;

    fn decimal(&self, state: usize) -> u64;

    fn state_index(&self, decimal: u64) -> Option<usize>;
}

/// Reachable states from `state` that `party` strictly prefers to
/// `reference` (default: `state`).
pub fn improvements<M: MoveContext + ?Sized>(
    ctx: &M,
    party: usize,
    state: usize,
    reference: Option<usize>,
) -> Vec<usize> {
    let reference = reference.unwrap_or(state);
    ctx.reachable_from(party, state)
        .iter()
        .copied()
        .filter(|&to| ctx.compare(party, reference, to) > 0)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Move {
    pub party: usize,
    pub from: usize,
    pub to: usize,
}

/// A witness that an improvement is deterred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sanction {
    /// Opponent moves: a chain for sequential responses, or the set of
    /// moves taken together from the original state for SIM.
    pub moves: Vec<Move>,
    /// State the focal party ends up in.
    pub outcome: usize,
    pub simultaneous: bool,
}

/// A sanction the focal party escapes by moving on to a state it prefers
/// to where it started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounteredSanction {
    pub sanction: Sanction,
    pub countermoves: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImprovementResponse {
    pub improvement: usize,
    /// Number of first responses open to opponents.
    pub opponent_moves: usize,
    pub sanction: Option<Sanction>,
    pub countered: Vec<CounteredSanction>,
}

/// Outcome of one (party, state, concept) evaluation. Responses stop at the
/// first unsanctioned improvement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StabilityCheck {
    pub concept: StabilityConcept,
    pub party: usize,
    pub state: usize,
    pub stable: bool,
    pub responses: Vec<ImprovementResponse>,
}

/// Bounds on the sanction searches.
#[derive(Debug, Clone, Default)]
pub struct SearchLimits {
    pub max_depth: Option<usize>,
    pub cancel: CancellationToken,
}

impl SearchLimits {
    pub fn new(config: &AnalysisConfig, cancel: CancellationToken) -> Self {
        SearchLimits {
            max_depth: config.max_sanction_depth,
            cancel,
        }
    }

    pub(crate) fn depth(&self, opponents: usize) -> usize {
        self.max_depth.map_or(opponents, |max| max.min(opponents))
    }
}

#[derive(Debug, Clone, Copy)]
enum Response {
    Improvements,
    AnyMove,
}

pub(crate) fn unconsulted_opponents(
    party_count: usize,
    focal: usize,
    consulted: &[usize],
) -> impl Iterator<Item = usize> + '_ {
    (0..party_count).filter(move |o| *o != focal && !consulted.contains(o))
}

/// Depth-bounded search over chains of opponent moves. Each step is taken by
/// an opponent that has not yet moved in the chain.
struct ChainSearch<'a, M: ?Sized> {
    ctx: &'a M,
    focal: usize,
    origin: usize,
    response: Response,
    countermoves: bool,
    countered: Vec<CounteredSanction>,
}

impl<M: MoveContext + ?Sized> ChainSearch<'_, M> {
    fn responses(&self, party: usize, at: usize) -> Vec<usize> {
        match self.response {
            Response::Improvements => improvements(self.ctx, party, at, None),
            Response::AnyMove => self.ctx.reachable_from(party, at).to_vec(),
        }
    }

    fn first_moves(&self, at: usize) -> usize {
        unconsulted_opponents(self.ctx.party_count(), self.focal, &[])
            .map(|o| self.responses(o, at).len())
            .sum()
    }

    fn search(
        &mut self,
        at: usize,
        consulted: &[usize],
        path: &mut Vec<Move>,
        depth: usize,
    ) -> Option<Sanction> {
        if depth == 0 {
            return None;
        }
        let candidates: Vec<usize> =
            unconsulted_opponents(self.ctx.party_count(), self.focal, consulted).collect();
        for opponent in candidates {
            for to in self.responses(opponent, at) {
                path.push(Move {
                    party: opponent,
                    from: at,
                    to,
                });
                if self.ctx.compare(self.focal, self.origin, to) <= 0 {
                    let sanction = Sanction {
                        moves: path.clone(),
                        outcome: to,
                        simultaneous: false,
                    };
                    if !self.countermoves {
                        return Some(sanction);
                    }
                    let counters = improvements(self.ctx, self.focal, to, Some(self.origin));
                    if counters.is_empty() {
                        return Some(sanction);
                    }
                    self.countered.push(CounteredSanction {
                        sanction,
                        countermoves: counters,
                    });
                }
                let mut next = consulted.to_vec();
                next.push(opponent);
                if let Some(found) = self.search(to, &next, path, depth - 1) {
                    return Some(found);
                }
                path.pop();
            }
        }
        None
    }
}

/// Advance a mixed-radix odometer. Returns false after the last value.
pub(crate) fn advance(digits: &mut [usize], radices: &[usize]) -> bool {
    for (digit, radix) in digits.iter_mut().zip(radices) {
        *digit += 1;
        if *digit < *radix {
            return true;
        }
        *digit = 0;
    }
    false
}

/// Combine moves made simultaneously from the state with decimal `origin`.
///
/// Each move flips the option bits that separate its target from `origin`.
/// Two moves that change a common option cannot both happen and yield
/// `None`. With disjoint option sets this equals summing the decimal deltas.
pub(crate) fn compose_moves(origin: u64, targets: impl IntoIterator<Item = u64>) -> Option<u64> {
    let mut changed = 0u64;
    for target in targets {
        let flips = origin ^ target;
        if flips & changed != 0 {
            return None;
        }
        changed |= flips;
    }
    Some(origin ^ changed)
}

/// Search the opponents' simultaneous responses from `origin` to the focal
/// move `origin -> improvement`.
///
/// Each opponent either stays or takes one of its improvements from
/// `origin`; at least one opponent moves. The joint outcome is skipped when
/// the moves clash on a shared option or land on an infeasible state.
fn simultaneous_sanction<M: MoveContext + ?Sized>(
    ctx: &M,
    focal: usize,
    origin: usize,
    improvement: usize,
    cancel: &CancellationToken,
) -> Result<(usize, Option<Sanction>), AnalysisError> {
    let opponents: Vec<usize> = (0..ctx.party_count()).filter(|o| *o != focal).collect();
    let choices: Vec<Vec<usize>> = opponents
        .iter()
        .map(|&o| improvements(ctx, o, origin, None))
        .collect();
    let first_moves = choices.iter().map(Vec::len).sum();
    let radices: Vec<usize> = choices.iter().map(|c| c.len() + 1).collect();
    let mut digits = vec![0usize; opponents.len()];

    let start = ctx.decimal(origin);
    let mut examined = 0u64;
    let mut skipped = 0u64;

    while advance(&mut digits, &radices) {
        examined += 1;
        if examined % CANCEL_POLL_INTERVAL == 0 {
            cancel.check()?;
        }
        let targets = std::iter::once(ctx.decimal(improvement)).chain(
            digits
                .iter()
                .enumerate()
                .filter(|(_, d)| **d > 0)
                .map(|(k, d)| ctx.decimal(choices[k][d - 1])),
        );
        let Some(outcome) = compose_moves(start, targets).and_then(|d| ctx.state_index(d)) else {
            skipped += 1;
            continue;
        };
        if ctx.compare(focal, origin, outcome) <= 0 {
            let moves = digits
                .iter()
                .enumerate()
                .filter(|(_, d)| **d > 0)
                .map(|(k, d)| Move {
                    party: opponents[k],
                    from: origin,
                    to: choices[k][d - 1],
                })
                .collect();
            debug!(examined, skipped, "simultaneous sanction found");
            return Ok((
                first_moves,
                Some(Sanction {
                    moves,
                    outcome,
                    simultaneous: true,
                }),
            ));
        }
    }
    debug!(examined, skipped, "no simultaneous sanction");
    Ok((first_moves, None))
}

/// Evaluate one stability concept for `party` at `state`.
pub fn check_stability<M: MoveContext + ?Sized>(
    ctx: &M,
    concept: StabilityConcept,
    party: usize,
    state: usize,
    limits: &SearchLimits,
) -> Result<StabilityCheck, AnalysisError> {
    let uis = improvements(ctx, party, state, None);
    let mut check = StabilityCheck {
        concept,
        party,
        state,
        stable: true,
        responses: Vec::with_capacity(uis.len()),
    };

    if concept == StabilityConcept::Nash {
        check.stable = uis.is_empty();
        check.responses = uis
            .into_iter()
            .map(|improvement| ImprovementResponse {
                improvement,
                opponent_moves: 0,
                sanction: None,
                countered: Vec::new(),
            })
            .collect();
        return Ok(check);
    }

    let depth = limits.depth(ctx.party_count().saturating_sub(1));
    for improvement in uis {
        limits.cancel.check()?;
        let response = match concept {
            StabilityConcept::Sim => {
                let (opponent_moves, sanction) =
                    simultaneous_sanction(ctx, party, state, improvement, &limits.cancel)?;
                ImprovementResponse {
                    improvement,
                    opponent_moves,
                    sanction,
                    countered: Vec::new(),
                }
            }
            _ => {
                let mut search = ChainSearch {
                    ctx,
                    focal: party,
                    origin: state,
                    response: if concept == StabilityConcept::Seq {
                        Response::Improvements
                    } else {
                        Response::AnyMove
                    },
                    countermoves: concept == StabilityConcept::Smr,
                    countered: Vec::new(),
                };
                let opponent_moves = search.first_moves(improvement);
                let sanction = search.search(improvement, &[], &mut Vec::new(), depth);
                ImprovementResponse {
                    improvement,
                    opponent_moves,
                    sanction,
                    countered: search.countered,
                }
            }
        };
        let sanctioned = response.sanction.is_some();
        check.responses.push(response);
        if !sanctioned {
            check.stable = false;
            break;
        }
    }
    Ok(check)
}

/// Whether `party` is stable at `state` under `concept`.
pub fn is_stable<M: MoveContext + ?Sized>(
    ctx: &M,
    concept: StabilityConcept,
    party: usize,
    state: usize,
    limits: &SearchLimits,
) -> Result<bool, AnalysisError> {
    Ok(check_stability(ctx, concept, party, state, limits)?.stable)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Hand-built context: explicit reach lists and payoffs per party.
    pub(crate) struct TableContext {
        pub reach: Vec<Vec<Vec<usize>>>,
        pub payoffs: Vec<Vec<i64>>,
        pub decimals: Vec<u64>,
    }

    impl MoveContext for TableContext {
        fn party_count(&self) -> usize {
            self.reach.len()
        }
        fn reachable_from(&self, party: usize, state: usize) -> &[usize] {
            &self.reach[party][state]
        }
        fn compare(&self, party: usize, from: usize, to: usize) -> i64 {
            self.payoffs[party][to] - self.payoffs[party][from]
        }
        fn decimal(&self, state: usize) -> u64 {
            self.decimals[state]
        }
        fn state_index(&self, decimal: u64) -> Option<usize> {
            let map: HashMap<u64, usize> =
                self.decimals.iter().enumerate().map(|(i, d)| (*d, i)).collect();
            map.get(&decimal).copied()
        }
    }

    /// Prisoner's dilemma: NN=0, YN=1, NY=2, YY=3 ("Y" = confess).
    pub(crate) fn prisoners() -> TableContext {
        TableContext {
            reach: vec![
                vec![vec![1], vec![0], vec![3], vec![2]],
                vec![vec![2], vec![3], vec![0], vec![1]],
            ],
            payoffs: vec![vec![3, 4, 1, 2], vec![3, 1, 4, 2]],
            decimals: vec![0, 1, 2, 3],
        }
    }

    fn stable_states(ctx: &TableContext, concept: StabilityConcept) -> Vec<usize> {
        let limits = SearchLimits::default();
        (0..ctx.decimals.len())
            .filter(|&s| {
                (0..ctx.party_count())
                    .all(|p| is_stable(ctx, concept, p, s, &limits).unwrap())
            })
            .collect()
    }

    #[test]
    fn test_prisoners_dilemma_equilibria() {
        let ctx = prisoners();
        assert_eq!(stable_states(&ctx, StabilityConcept::Nash), vec![3]);
        assert_eq!(stable_states(&ctx, StabilityConcept::Gmr), vec![0, 3]);
        assert_eq!(stable_states(&ctx, StabilityConcept::Seq), vec![0, 3]);
        assert_eq!(stable_states(&ctx, StabilityConcept::Sim), vec![0, 3]);
        assert_eq!(stable_states(&ctx, StabilityConcept::Smr), vec![0, 3]);
    }

    #[test]
    fn test_seq_witness_path() {
        let ctx = prisoners();
        let check = check_stability(&ctx, StabilityConcept::Seq, 0, 0, &SearchLimits::default())
            .unwrap();
        assert!(check.stable);
        let sanction = check.responses[0].sanction.as_ref().unwrap();
        assert_eq!(
            sanction.moves,
            vec![Move {
                party: 1,
                from: 1,
                to: 3
            }]
        );
        assert_eq!(sanction.outcome, 3);
    }

    #[test]
    fn test_sim_combines_moves() {
        let ctx = prisoners();
        let check = check_stability(&ctx, StabilityConcept::Sim, 0, 0, &SearchLimits::default())
            .unwrap();
        let sanction = check.responses[0].sanction.as_ref().unwrap();
        assert!(sanction.simultaneous);
        assert_eq!(sanction.outcome, 3);
        assert_eq!(sanction.moves[0].to, 2);
    }

    #[test]
    fn test_sim_skips_infeasible_combination() {
        let mut ctx = prisoners();
        // Drop YY: the joint confession can no longer sanction anything.
        ctx.decimals = vec![0, 1, 2, 99];
        let check = check_stability(&ctx, StabilityConcept::Sim, 0, 0, &SearchLimits::default())
            .unwrap();
        assert!(!check.stable);
        assert_eq!(check.responses[0].opponent_moves, 1);
    }

    #[test]
    fn test_compose_moves() {
        // Disjoint options: same as summing the deltas.
        assert_eq!(compose_moves(0b0101, [0b0100, 0b0111]), Some(0b0110));
        assert_eq!(compose_moves(0, [1, 2, 4]), Some(7));
        // Both moves change option 0.
        assert_eq!(compose_moves(0b10, [0b11, 0b01]), None);
        assert_eq!(compose_moves(0, [1, 1]), None);
    }

    #[test]
    fn test_sim_disregards_moves_on_a_shared_option() {
        // Both parties can take option 0 from NN. Summing the two deltas
        // would land on NY (state 2), which party 0 dislikes.
        let ctx = TableContext {
            reach: vec![
                vec![vec![1], vec![0], vec![3], vec![2]],
                vec![vec![1], vec![0], Vec::new(), Vec::new()],
            ],
            payoffs: vec![vec![2, 3, 0, 1], vec![0, 1, 0, 0]],
            decimals: vec![0, 1, 2, 3],
        };
        let check = check_stability(&ctx, StabilityConcept::Sim, 0, 0, &SearchLimits::default())
            .unwrap();
        assert!(!check.stable);
        assert_eq!(check.responses[0].opponent_moves, 1);
        assert!(check.responses[0].sanction.is_none());
    }

    fn chain_context() -> TableContext {
        // Party 0 improves 0 -> 1. Party 1 moves 1 -> 2, which still
        // suits party 0; party 2 then moves 2 -> 3, which does not.
        let empty = || vec![Vec::new(); 4];
        let mut reach = vec![empty(), empty(), empty()];
        reach[0][0] = vec![1];
        reach[1][1] = vec![2];
        reach[2][2] = vec![3];
        TableContext {
            reach,
            payoffs: vec![vec![5, 6, 7, 1], vec![0, 0, 0, 0], vec![0, 0, 0, 0]],
            decimals: vec![0, 1, 2, 3],
        }
    }

    #[test]
    fn test_gmr_chain_respects_depth() {
        let ctx = chain_context();
        let check = check_stability(&ctx, StabilityConcept::Gmr, 0, 0, &SearchLimits::default())
            .unwrap();
        assert!(check.stable);
        let sanction = check.responses[0].sanction.as_ref().unwrap();
        assert_eq!(sanction.moves.len(), 2);
        assert_eq!(sanction.moves[1].party, 2);

        let shallow = SearchLimits {
            max_depth: Some(1),
            ..SearchLimits::default()
        };
        assert!(!is_stable(&ctx, StabilityConcept::Gmr, 0, 0, &shallow).unwrap());
    }

    #[test]
    fn test_smr_countermove_defeats_sanction() {
        let empty = || vec![Vec::new(); 4];
        let mut reach = vec![empty(), empty()];
        reach[0][0] = vec![1];
        reach[0][2] = vec![3];
        reach[1][1] = vec![2];
        let ctx = TableContext {
            reach,
            payoffs: vec![vec![5, 6, 2, 9], vec![0, 0, 0, 0]],
            decimals: vec![0, 1, 2, 3],
        };
        let limits = SearchLimits::default();
        assert!(is_stable(&ctx, StabilityConcept::Gmr, 0, 0, &limits).unwrap());
        let smr = check_stability(&ctx, StabilityConcept::Smr, 0, 0, &limits).unwrap();
        assert!(!smr.stable);
        assert_eq!(smr.responses[0].countered[0].countermoves, vec![3]);
    }

    #[test]
    fn test_no_improvements_is_stable_everywhere() {
        let ctx = prisoners();
        for concept in StabilityConcept::ALL {
            let check = check_stability(&ctx, concept, 0, 1, &SearchLimits::default()).unwrap();
            assert!(check.stable, "{concept}");
            assert!(check.responses.is_empty());
        }
    }

    #[test]
    fn test_cancelled_search() {
        let ctx = prisoners();
        let limits = SearchLimits::default();
        limits.cancel.cancel();
        assert_eq!(
            check_stability(&ctx, StabilityConcept::Seq, 0, 0, &limits).unwrap_err(),
            AnalysisError::Cancelled
        );
    }

    #[test]
    fn test_concept_parsing() {
        assert_eq!("SMR".parse::<StabilityConcept>(), Ok(StabilityConcept::Smr));
        assert!("strong".parse::<StabilityConcept>().is_err());
        assert_eq!(StabilityConcept::Gmr.to_string(), "GMR");
    }
}
