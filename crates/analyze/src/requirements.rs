//! Preference requirement trees.
//!
//! A [`Requirement`] states what a party's preferences must look like for
//! some stability outcome to hold. Leaves compare one state with a set of
//! others for a single party; `And`/`Or` combine them. The tree is printed
//! by [`Requirement::render`], evaluated against concrete preferences by
//! [`Requirement::holds`], reduced against known relations by
//! [`Requirement::simplify`] and checked for internal consistency by
//! [`Requirement::check`].

use crate::error::AnalysisError;
use crate::stability::{
    advance, compose_moves, unconsulted_opponents, MoveContext, SearchLimits, StabilityConcept,
};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    /// `preferred` ranks above every state in `less_preferred` for `party`:
    /// strictly when `strict`, otherwise ties are allowed.
    MoreThanFor {
        party: usize,
        party_name: String,
        preferred: usize,
        less_preferred: Vec<usize>,
        strict: bool,
    },
    And(Vec<Requirement>),
    Or(Vec<Requirement>),
}

/// Result of reducing a tree against relations that are already settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "requirement", rename_all = "snake_case")]
pub enum Simplified {
    Always,
    Never,
    Open(Requirement),
}

/// One ordering a satisfying assignment commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PreferenceEdge {
    pub party: usize,
    pub preferred: usize,
    pub less_preferred: usize,
    pub strict: bool,
}

/// The requirement that closed a preference cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub party: usize,
    pub party_name: String,
    pub preferred: usize,
    pub less_preferred: usize,
    pub strict: bool,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} for {} contradicts the other requirements",
            self.preferred + 1,
            if self.strict {
                "more preferred than"
            } else {
                "at least as preferred as"
            },
            self.less_preferred + 1,
            self.party_name
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Consistency {
    /// Some choice of alternatives yields an acyclic preference table.
    Satisfiable { relations: Vec<PreferenceEdge> },
    /// Every choice of alternatives runs into a cycle, reported by the last
    /// conflict found. No conflict means an empty set of alternatives.
    Unsatisfiable { conflict: Option<Conflict> },
}

impl Consistency {
    pub fn is_satisfiable(&self) -> bool {
        matches!(self, Consistency::Satisfiable { .. })
    }
}

fn state_list(states: &[usize]) -> String {
    match states {
        [single] => (single + 1).to_string(),
        _ => format!(
            "[{}]",
            states
                .iter()
                .map(|s| (s + 1).to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

impl Requirement {
    /// `preferred` strictly above each of `less_preferred`.
    pub fn strict(party: usize, party_name: &str, preferred: usize, less_preferred: Vec<usize>) -> Self {
        Requirement::MoreThanFor {
            party,
            party_name: party_name.to_string(),
            preferred,
            less_preferred,
            strict: true,
        }
    }

    /// `preferred` at least as high as each of `less_preferred`.
    pub fn weak(party: usize, party_name: &str, preferred: usize, less_preferred: Vec<usize>) -> Self {
        Requirement::MoreThanFor {
            party,
            party_name: party_name.to_string(),
            preferred,
            less_preferred,
            strict: false,
        }
    }

    /// Conjunction; nested conjunctions are flattened and a single child is
    /// returned as is.
    pub fn all(children: Vec<Requirement>) -> Self {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Requirement::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Requirement::And(flat)
        }
    }

    /// Disjunction, flattened like [`Requirement::all`].
    pub fn any(children: Vec<Requirement>) -> Self {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Requirement::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Requirement::Or(flat)
        }
    }

    /// The requirement that holds exactly when this one does not.
    pub fn negate(&self) -> Self {
        match self {
            Requirement::MoreThanFor {
                party,
                party_name,
                preferred,
                less_preferred,
                strict,
            } => Requirement::any(
                less_preferred
                    .iter()
                    .map(|&other| Requirement::MoreThanFor {
                        party: *party,
                        party_name: party_name.clone(),
                        preferred: other,
                        less_preferred: vec![*preferred],
                        strict: !strict,
                    })
                    .collect(),
            ),
            Requirement::And(children) => {
                Requirement::any(children.iter().map(Requirement::negate).collect())
            }
            Requirement::Or(children) => {
                Requirement::all(children.iter().map(Requirement::negate).collect())
            }
        }
    }

    /// Evaluate against concrete preferences. `prefers(party, a, b)` orders
    /// `a` against `b` (`Greater` means `a` is preferred).
    pub fn holds<F>(&self, prefers: &F) -> bool
    where
        F: Fn(usize, usize, usize) -> Ordering,
    {
        match self {
            Requirement::MoreThanFor {
                party,
                preferred,
                less_preferred,
                strict,
                ..
            } => less_preferred.iter().all(|&b| {
                let ord = prefers(*party, *preferred, b);
                if *strict {
                    ord == Ordering::Greater
                } else {
                    ord != Ordering::Less
                }
            }),
            Requirement::And(children) => children.iter().all(|c| c.holds(prefers)),
            Requirement::Or(children) => children.iter().any(|c| c.holds(prefers)),
        }
    }

    /// Reduce against settled relations. `relation(party, a, b)` returns the
    /// known ordering of `a` against `b`, or `None` while it is still open.
    pub fn simplify<F>(&self, relation: &F) -> Simplified
    where
        F: Fn(usize, usize, usize) -> Option<Ordering>,
    {
        match self {
            Requirement::MoreThanFor {
                party,
                party_name,
                preferred,
                less_preferred,
                strict,
            } => {
                let mut open = Vec::new();
                for &b in less_preferred {
                    match relation(*party, *preferred, b) {
                        None => open.push(b),
                        Some(Ordering::Greater) => {}
                        Some(Ordering::Equal) if !strict => {}
                        Some(_) => return Simplified::Never,
                    }
                }
                if open.is_empty() {
                    Simplified::Always
                } else {
                    Simplified::Open(Requirement::MoreThanFor {
                        party: *party,
                        party_name: party_name.clone(),
                        preferred: *preferred,
                        less_preferred: open,
                        strict: *strict,
                    })
                }
            }
            Requirement::And(children) => {
                let mut open = Vec::new();
                for child in children {
                    match child.simplify(relation) {
                        Simplified::Never => return Simplified::Never,
                        Simplified::Always => {}
                        Simplified::Open(r) => open.push(r),
                    }
                }
                if open.is_empty() {
                    Simplified::Always
                } else {
                    Simplified::Open(Requirement::all(open))
                }
            }
            Requirement::Or(children) => {
                let mut open = Vec::new();
                for child in children {
                    match child.simplify(relation) {
                        Simplified::Always => return Simplified::Always,
                        Simplified::Never => {}
                        Simplified::Open(r) => open.push(r),
                    }
                }
                if open.is_empty() {
                    Simplified::Never
                } else {
                    Simplified::Open(Requirement::any(open))
                }
            }
        }
    }

    /// Look for a choice of alternatives whose orderings are free of
    /// cycles. A cycle is only a contradiction if it contains a strict edge.
    pub fn check(&self) -> Consistency {
        let mut relations = Relations::default();
        let mut conflict = None;
        let root = Pending {
            nodes: std::slice::from_ref(self),
            next: None,
        };
        if satisfy(Some(&root), &mut relations, &mut conflict) {
            Consistency::Satisfiable {
                relations: relations.edges,
            }
        } else {
            Consistency::Unsatisfiable { conflict }
        }
    }

    fn leaf_text(&self) -> String {
        match self {
            Requirement::MoreThanFor {
                party_name,
                preferred,
                less_preferred,
                strict,
                ..
            } => format!(
                "{} must be {} {} for {}",
                preferred + 1,
                if *strict {
                    "more preferred than"
                } else {
                    "at least as preferred as"
                },
                state_list(less_preferred),
                party_name
            ),
            Requirement::And(_) | Requirement::Or(_) => String::new(),
        }
    }

    fn write_tree(&self, out: &mut String, indent: &str, annotate: bool) -> bool {
        let satisfiable = !annotate || self.check().is_satisfiable();
        match self {
            Requirement::MoreThanFor { .. } => {
                out.push_str(indent);
                out.push_str(&self.leaf_text());
                out.push('\n');
                if !satisfiable {
                    out.push_str(&format!("{}IMPOSSIBLE: the stated states cannot be ordered this way\n", indent));
                }
            }
            Requirement::And(children) | Requirement::Or(children) => {
                let word = if matches!(self, Requirement::And(_)) {
                    "AND"
                } else {
                    "OR"
                };
                if children.is_empty() {
                    let text = if word == "AND" { "(always)" } else { "(never)" };
                    out.push_str(&format!("{}{}\n", indent, text));
                }
                let inner = format!("{} |", indent);
                let mut children_ok = true;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push_str(&format!("{}{}\n", indent, word));
                    }
                    children_ok &= child.write_tree(out, &inner, annotate);
                }
                // Mark only where the contradiction first appears.
                if !satisfiable && children_ok {
                    let reason = match self.check() {
                        Consistency::Unsatisfiable {
                            conflict: Some(conflict),
                        } => conflict.to_string(),
                        _ => "no alternative can hold".to_string(),
                    };
                    out.push_str(&format!("{}IMPOSSIBLE: {}\n", indent, reason));
                }
            }
        }
        satisfiable
    }

    /// Indented text form: each level adds ` |`, siblings are separated by
    /// their connective on its own line.
    pub fn render(&self) -> String {
        self.render_indented("")
    }

    /// [`Requirement::render`] nested under `indent`.
    pub fn render_indented(&self, indent: &str) -> String {
        let mut out = String::new();
        self.write_tree(&mut out, indent, false);
        out
    }

    /// Like [`Requirement::render`], with contradictory branches marked
    /// `IMPOSSIBLE`.
    pub fn render_annotated(&self) -> String {
        let mut out = String::new();
        self.write_tree(&mut out, "", true);
        out
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

// ── Consistency checking ─────────────────────────────────────────────

#[derive(Debug, Default)]
struct Relations {
    edges: Vec<PreferenceEdge>,
}

impl Relations {
    /// Is there a path `from` -> `to` for `party`, containing a strict edge
    /// when `need_strict`?
    fn reaches(&self, party: usize, from: usize, to: usize, need_strict: bool) -> bool {
        let mut stack = vec![(from, false)];
        let mut seen: Vec<(usize, bool)> = Vec::new();
        while let Some((at, strict_seen)) = stack.pop() {
            if at == to && (strict_seen || !need_strict) {
                return true;
            }
            if seen.contains(&(at, strict_seen)) {
                continue;
            }
            seen.push((at, strict_seen));
            for e in self
                .edges
                .iter()
                .filter(|e| e.party == party && e.preferred == at)
            {
                stack.push((e.less_preferred, strict_seen || e.strict));
            }
        }
        false
    }

    fn add(&mut self, edge: PreferenceEdge) -> bool {
        if edge.preferred == edge.less_preferred {
            return !edge.strict;
        }
        if self.reaches(edge.party, edge.less_preferred, edge.preferred, !edge.strict) {
            return false;
        }
        self.edges.push(edge);
        true
    }
}

/// Work still to satisfy: the remaining siblings at this level, then the
/// levels above.
struct Pending<'t, 'p> {
    nodes: &'t [Requirement],
    next: Option<&'p Pending<'t, 'p>>,
}

fn satisfy(
    pending: Option<&Pending<'_, '_>>,
    relations: &mut Relations,
    conflict: &mut Option<Conflict>,
) -> bool {
    let Some(p) = pending else {
        return true;
    };
    let Some((node, rest)) = p.nodes.split_first() else {
        return satisfy(p.next, relations, conflict);
    };
    let tail = Pending {
        nodes: rest,
        next: p.next,
    };
    match node {
        Requirement::MoreThanFor {
            party,
            party_name,
            preferred,
            less_preferred,
            strict,
        } => {
            let mark = relations.edges.len();
            for &b in less_preferred {
                let edge = PreferenceEdge {
                    party: *party,
                    preferred: *preferred,
                    less_preferred: b,
                    strict: *strict,
                };
                if !relations.add(edge) {
                    *conflict = Some(Conflict {
                        party: *party,
                        party_name: party_name.clone(),
                        preferred: *preferred,
                        less_preferred: b,
                        strict: *strict,
                    });
                    relations.edges.truncate(mark);
                    return false;
                }
            }
            let ok = satisfy(Some(&tail), relations, conflict);
            if !ok {
                relations.edges.truncate(mark);
            }
            ok
        }
        Requirement::And(children) => {
            let head = Pending {
                nodes: children,
                next: Some(&tail),
            };
            satisfy(Some(&head), relations, conflict)
        }
        Requirement::Or(children) => children.iter().any(|child| {
            let head = Pending {
                nodes: std::slice::from_ref(child),
                next: Some(&tail),
            };
            satisfy(Some(&head), relations, conflict)
        }),
    }
}

// ── Stability concepts as requirement trees ──────────────────────────

struct TreeBuilder<'a, M: ?Sized> {
    ctx: &'a M,
    names: &'a [String],
    concept: StabilityConcept,
    origin: usize,
    limits: &'a SearchLimits,
}

impl<M: MoveContext + ?Sized> TreeBuilder<'_, M> {
    fn name(&self, party: usize) -> &str {
        self.names.get(party).map_or("?", String::as_str)
    }

    /// Where a sanction may end: the focal party is no better off, and for
    /// SMR it also has no countermove to a state it prefers.
    fn outcome(&self, focal: usize, at: usize) -> Requirement {
        let mut worse = vec![at];
        if self.concept == StabilityConcept::Smr {
            worse.extend(
                self.ctx
                    .reachable_from(focal, at)
                    .iter()
                    .copied()
                    .filter(|z| *z != self.origin && *z != at),
            );
        }
        Requirement::weak(focal, self.name(focal), self.origin, worse)
    }

    /// Sanction alternatives for chains of distinct opponents from `at`.
    fn chains(&self, focal: usize, at: usize, consulted: &[usize], depth: usize) -> Vec<Requirement> {
        if depth == 0 {
            return Vec::new();
        }
        let mut alternatives = Vec::new();
        let candidates: Vec<usize> =
            unconsulted_opponents(self.ctx.party_count(), focal, consulted).collect();
        for opponent in candidates {
            let mut next = consulted.to_vec();
            next.push(opponent);
            for &to in self.ctx.reachable_from(opponent, at) {
                let mut ends = vec![self.outcome(focal, to)];
                ends.extend(self.chains(focal, to, &next, depth - 1));
                let end = Requirement::any(ends);
                alternatives.push(if self.concept == StabilityConcept::Seq {
                    Requirement::all(vec![
                        Requirement::strict(opponent, self.name(opponent), to, vec![at]),
                        end,
                    ])
                } else {
                    end
                });
            }
        }
        alternatives
    }

    /// Simultaneous sanction alternatives against the focal move to
    /// `improvement`.
    fn simultaneous(&self, focal: usize, improvement: usize) -> Result<Vec<Requirement>, AnalysisError> {
        let opponents: Vec<usize> = (0..self.ctx.party_count()).filter(|o| *o != focal).collect();
        let choices: Vec<&[usize]> = opponents
            .iter()
            .map(|&o| self.ctx.reachable_from(o, self.origin))
            .collect();
        let radices: Vec<usize> = choices.iter().map(|c| c.len() + 1).collect();
        let mut digits = vec![0usize; opponents.len()];
        let start = self.ctx.decimal(self.origin);

        let mut alternatives = Vec::new();
        while advance(&mut digits, &radices) {
            self.limits.cancel.check()?;
            let moving: Vec<(usize, usize)> = digits
                .iter()
                .enumerate()
                .filter(|(_, d)| **d > 0)
                .map(|(k, d)| (opponents[k], choices[k][d - 1]))
                .collect();
            let targets = std::iter::once(self.ctx.decimal(improvement))
                .chain(moving.iter().map(|&(_, to)| self.ctx.decimal(to)));
            let Some(outcome) = compose_moves(start, targets).and_then(|d| self.ctx.state_index(d))
            else {
                continue;
            };
            let mut terms: Vec<Requirement> = moving
                .iter()
                .map(|&(o, to)| Requirement::strict(o, self.name(o), to, vec![self.origin]))
                .collect();
            terms.push(Requirement::weak(focal, self.name(focal), self.origin, vec![outcome]));
            alternatives.push(Requirement::all(terms));
        }
        Ok(alternatives)
    }
}

/// What one party's preferences must satisfy for it to be stable at
/// `state` under `concept`, given only the conflict's moves. `names` labels
/// the parties of `ctx`.
pub fn party_requirement<M: MoveContext + ?Sized>(
    ctx: &M,
    names: &[String],
    concept: StabilityConcept,
    party: usize,
    state: usize,
    limits: &SearchLimits,
) -> Result<Requirement, AnalysisError> {
    let builder = TreeBuilder {
        ctx,
        names,
        concept,
        origin: state,
        limits,
    };
    let reach = ctx.reachable_from(party, state);
    if reach.is_empty() {
        return Ok(Requirement::And(Vec::new()));
    }
    if concept == StabilityConcept::Nash {
        return Ok(Requirement::weak(party, builder.name(party), state, reach.to_vec()));
    }
    let depth = limits.depth(ctx.party_count().saturating_sub(1));
    let mut per_move = Vec::with_capacity(reach.len());
    for &target in reach {
        limits.cancel.check()?;
        // Either the move is no improvement, or it is sanctioned.
        let mut alternatives = vec![Requirement::weak(party, builder.name(party), state, vec![target])];
        match concept {
            StabilityConcept::Sim => alternatives.extend(builder.simultaneous(party, target)?),
            _ => alternatives.extend(builder.chains(party, target, &[], depth)),
        }
        per_move.push(Requirement::any(alternatives));
    }
    Ok(Requirement::all(per_move))
}

/// The requirements under which `state` is an equilibrium under `concept`:
/// every party's requirement at once.
pub fn concept_requirement<M: MoveContext + ?Sized>(
    ctx: &M,
    names: &[String],
    concept: StabilityConcept,
    state: usize,
    limits: &SearchLimits,
) -> Result<Requirement, AnalysisError> {
    let parts = (0..ctx.party_count())
        .map(|party| party_requirement(ctx, names, concept, party, state, limits))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Requirement::all(parts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stability::is_stable;
    use crate::stability::tests::{prisoners, TableContext};

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("P{}", i)).collect()
    }

    fn prefers(ctx: &TableContext) -> impl Fn(usize, usize, usize) -> Ordering + '_ {
        move |party, a, b| ctx.payoffs[party][a].cmp(&ctx.payoffs[party][b])
    }

    #[test]
    fn test_trees_agree_with_stability() {
        let ctx = prisoners();
        let limits = SearchLimits::default();
        let names = names(2);
        for concept in StabilityConcept::ALL {
            for state in 0..4 {
                let tree = concept_requirement(&ctx, &names, concept, state, &limits).unwrap();
                let expected =
                    (0..2).all(|p| is_stable(&ctx, concept, p, state, &limits).unwrap());
                assert_eq!(tree.holds(&prefers(&ctx)), expected, "{concept} at {state}");
            }
        }
    }

    #[test]
    fn test_trees_agree_across_reorderings() {
        // Every strict ranking of four states for each player.
        let orders = [
            [4, 3, 2, 1],
            [1, 2, 3, 4],
            [3, 4, 1, 2],
            [2, 1, 4, 3],
            [4, 1, 3, 2],
            [1, 4, 2, 3],
        ];
        let limits = SearchLimits::default();
        let names = names(2);
        for a in &orders {
            for b in &orders {
                let mut ctx = prisoners();
                ctx.payoffs = vec![a.to_vec(), b.to_vec()];
                for concept in StabilityConcept::ALL {
                    for state in 0..4 {
                        let tree =
                            concept_requirement(&ctx, &names, concept, state, &limits).unwrap();
                        let expected =
                            (0..2).all(|p| is_stable(&ctx, concept, p, state, &limits).unwrap());
                        assert_eq!(tree.holds(&prefers(&ctx)), expected);
                    }
                }
            }
        }
    }

    #[test]
    fn test_sim_tree_ignores_clashing_moves() {
        // Both parties control option 0; from NN their joint move has no
        // outcome, so party 0's move to YN can never be sanctioned.
        let ctx = TableContext {
            reach: vec![
                vec![vec![1], vec![0], vec![3], vec![2]],
                vec![vec![1], vec![0], Vec::new(), Vec::new()],
            ],
            payoffs: vec![vec![2, 3, 0, 1], vec![0, 1, 0, 0]],
            decimals: vec![0, 1, 2, 3],
        };
        let limits = SearchLimits::default();
        let tree =
            party_requirement(&ctx, &names(2), StabilityConcept::Sim, 0, 0, &limits).unwrap();
        assert!(!is_stable(&ctx, StabilityConcept::Sim, 0, 0, &limits).unwrap());
        assert!(!tree.holds(&prefers(&ctx)));
    }

    #[test]
    fn test_nash_tree_shape() {
        let ctx = prisoners();
        let tree =
            concept_requirement(&ctx, &names(2), StabilityConcept::Nash, 0, &SearchLimits::default())
                .unwrap();
        assert_eq!(
            tree,
            Requirement::And(vec![
                Requirement::weak(0, "P0", 0, vec![1]),
                Requirement::weak(1, "P1", 0, vec![2]),
            ])
        );
        assert_eq!(
            tree.render(),
            " |1 must be at least as preferred as 2 for P0\nAND\n |1 must be at least as preferred as 3 for P1\n"
        );
    }

    #[test]
    fn test_strict_cycle_is_a_conflict() {
        let tree = Requirement::all(vec![
            Requirement::strict(0, "A", 0, vec![1]),
            Requirement::strict(0, "A", 1, vec![2]),
            Requirement::weak(0, "A", 2, vec![0]),
        ]);
        match tree.check() {
            Consistency::Unsatisfiable {
                conflict: Some(conflict),
            } => {
                assert_eq!(conflict.preferred, 2);
                assert_eq!(conflict.less_preferred, 0);
            }
            other => panic!("expected a conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_weak_cycle_allows_ties() {
        let tree = Requirement::all(vec![
            Requirement::weak(0, "A", 0, vec![1]),
            Requirement::weak(0, "A", 1, vec![0]),
        ]);
        assert!(tree.check().is_satisfiable());
        // Other parties keep their own tables.
        let split = Requirement::all(vec![
            Requirement::strict(0, "A", 0, vec![1]),
            Requirement::strict(1, "B", 1, vec![0]),
        ]);
        assert!(split.check().is_satisfiable());
    }

    #[test]
    fn test_checker_backtracks_over_alternatives() {
        let tree = Requirement::all(vec![
            Requirement::strict(0, "A", 0, vec![1]),
            Requirement::any(vec![
                Requirement::strict(0, "A", 1, vec![0]),
                Requirement::strict(0, "A", 0, vec![2]),
            ]),
            Requirement::strict(0, "A", 2, vec![1]),
        ]);
        match tree.check() {
            Consistency::Satisfiable { relations } => {
                assert_eq!(relations.len(), 3);
                assert!(relations.iter().any(|e| e.preferred == 0 && e.less_preferred == 2));
            }
            other => panic!("expected satisfiable, got {:?}", other),
        }
        assert_eq!(
            Requirement::Or(Vec::new()).check(),
            Consistency::Unsatisfiable { conflict: None }
        );
        assert!(Requirement::And(Vec::new()).check().is_satisfiable());
    }

    #[test]
    fn test_negation() {
        let ctx = prisoners();
        let limits = SearchLimits::default();
        let tree = concept_requirement(&ctx, &names(2), StabilityConcept::Seq, 1, &limits).unwrap();
        let p = prefers(&ctx);
        assert_eq!(tree.negate().holds(&p), !tree.holds(&p));
        assert_eq!(
            Requirement::strict(0, "A", 0, vec![1]).negate(),
            Requirement::weak(0, "A", 1, vec![0])
        );
    }

    #[test]
    fn test_simplify_against_fixed_relations() {
        // State 0 fixed above 1; everything involving 2 is open.
        let relation = |_p: usize, a: usize, b: usize| -> Option<Ordering> {
            match (a, b) {
                (0, 1) => Some(Ordering::Greater),
                (1, 0) => Some(Ordering::Less),
                _ if a == b => Some(Ordering::Equal),
                _ => None,
            }
        };
        assert_eq!(
            Requirement::strict(0, "A", 0, vec![1]).simplify(&relation),
            Simplified::Always
        );
        assert_eq!(
            Requirement::weak(0, "A", 1, vec![0]).simplify(&relation),
            Simplified::Never
        );
        assert_eq!(
            Requirement::strict(0, "A", 0, vec![1, 2]).simplify(&relation),
            Simplified::Open(Requirement::strict(0, "A", 0, vec![2]))
        );
        let either = Requirement::any(vec![
            Requirement::weak(0, "A", 1, vec![0]),
            Requirement::weak(0, "A", 2, vec![0]),
        ]);
        assert_eq!(
            either.simplify(&relation),
            Simplified::Open(Requirement::weak(0, "A", 2, vec![0]))
        );
    }

    #[test]
    fn test_annotated_render_marks_contradiction() {
        let tree = Requirement::all(vec![
            Requirement::strict(0, "A", 0, vec![1]),
            Requirement::strict(0, "A", 1, vec![0]),
        ]);
        let text = tree.render_annotated();
        assert!(text.ends_with(
            "IMPOSSIBLE: 2 more preferred than 1 for A contradicts the other requirements\n"
        ));
        assert!(!Requirement::strict(0, "A", 0, vec![1])
            .render_annotated()
            .contains("IMPOSSIBLE"));
    }

    #[test]
    fn test_sim_tree_skips_infeasible_outcomes() {
        let mut ctx = prisoners();
        ctx.decimals = vec![0, 1, 2, 99];
        let tree =
            concept_requirement(&ctx, &names(2), StabilityConcept::Sim, 0, &SearchLimits::default())
                .unwrap();
        // No feasible joint response: each move must simply not improve.
        assert_eq!(
            tree,
            Requirement::And(vec![
                Requirement::weak(0, "P0", 0, vec![1]),
                Requirement::weak(1, "P1", 0, vec![2]),
            ])
        );
    }
}
