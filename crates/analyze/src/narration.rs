//! Plain-text justification of a stability check.

use crate::reachability::ReachabilityMatrices;
use crate::stability::{Sanction, StabilityCheck, StabilityConcept};
use gmcr_core::Party;
use std::fmt::Write;

/// `state 3 (decimal 2, payoff 4)`: 1-based state number, decimal value and
/// the party's payoff there.
pub fn state_snippet(matrices: &ReachabilityMatrices, party: usize, state: usize) -> String {
    let payoff = matrices
        .parties()
        .get(party)
        .map(|p| p.payoff_label(state))
        .unwrap_or_default();
    format!(
        "state {} (decimal {}, payoff {})",
        state + 1,
        matrices.feasibles().decimal[state],
        payoff
    )
}

fn party_name(matrices: &ReachabilityMatrices, party: usize) -> &str {
    matrices.parties().get(party).map_or("?", |p| p.name())
}

fn describe_sanction(matrices: &ReachabilityMatrices, focal: usize, sanction: &Sanction) -> String {
    let step = |m: &crate::stability::Move| {
        format!(
            "{} moving to {}",
            party_name(matrices, m.party),
            state_snippet(matrices, focal, m.to)
        )
    };
    if sanction.simultaneous {
        let moves: Vec<String> = sanction.moves.iter().map(step).collect();
        format!(
            "simultaneous moves ({}) giving a final state of {}",
            moves.join(" and "),
            state_snippet(matrices, focal, sanction.outcome)
        )
    } else {
        let moves: Vec<String> = sanction.moves.iter().map(step).collect();
        moves.join(", then ")
    }
}

/// Narrate a check from the focal party's point of view.
pub fn narrate(matrices: &ReachabilityMatrices, check: &StabilityCheck) -> String {
    let concept = check.concept;
    let name = party_name(matrices, check.party);
    let origin = state_snippet(matrices, check.party, check.state);
    let snip = |s: usize| state_snippet(matrices, check.party, s);
    let mut out = String::new();

    if check.responses.is_empty() {
        let _ = writeln!(
            out,
            "{} is {} stable for {} since they have no UIs from this state.",
            origin, concept, name
        );
        return out;
    }

    let uis: Vec<String> = check.responses.iter().map(|r| snip(r.improvement)).collect();
    if concept == StabilityConcept::Nash {
        let _ = writeln!(
            out,
            "{} is NOT Nash stable for {} since they have UIs available to: {}",
            origin,
            name,
            uis.join(", ")
        );
        return out;
    }

    let _ = writeln!(
        out,
        "From {} {} has UIs available to: {}. Check for sanctioning...\n",
        origin,
        name,
        uis.join(", ")
    );
    for response in &check.responses {
        let target = snip(response.improvement);
        for countered in &response.countered {
            let _ = writeln!(
                out,
                "    The sanction {} can be countermoved to {}.\n",
                describe_sanction(matrices, check.party, &countered.sanction),
                countered
                    .countermoves
                    .iter()
                    .map(|s| snip(*s))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        match &response.sanction {
            Some(sanction) => {
                let _ = writeln!(
                    out,
                    "A move to {} is {} sanctioned for {} by {}.\n",
                    target,
                    concept,
                    name,
                    describe_sanction(matrices, check.party, sanction)
                );
                if concept == StabilityConcept::Smr {
                    let _ = writeln!(
                        out,
                        "    {} remains sanctioned under SMR for {}, since they cannot countermove from {}.\n",
                        target,
                        name,
                        snip(sanction.outcome)
                    );
                }
            }
            None if response.opponent_moves == 0 => {
                let what = match concept {
                    StabilityConcept::Seq | StabilityConcept::Sim => "UIs",
                    _ => "moves",
                };
                let from = if concept == StabilityConcept::Sim {
                    origin.clone()
                } else {
                    target.clone()
                };
                let _ = writeln!(
                    out,
                    "{} is unstable by {} for {}, since their opponents have no {} from {}.\n",
                    origin, concept, name, what, from
                );
            }
            None => {
                let _ = writeln!(
                    out,
                    "{} is unstable by {} for {}, since their opponents have no sanctioning response to {}{}.\n",
                    origin,
                    concept,
                    name,
                    target,
                    if concept == StabilityConcept::Smr {
                        " that cannot be countermoved"
                    } else {
                        ""
                    }
                );
            }
        }
    }
    if check.stable {
        let _ = writeln!(
            out,
            "{} is stable by {} for {}, since all available UIs are sanctioned by other players.",
            origin, concept, name
        );
    }
    out
}
