//! Conversion between [`ConflictDefinition`] and the core [`ConflictModel`].

use crate::error::InterchangeError;
use crate::types::*;
use gmcr_core::{
    Condition, ConflictModel, OptionId, OptionList, RankEntry, Ranking, SimpleCondition,
    PROGRAM_NAME, PROGRAM_VERSION,
};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// A model built from a definition, plus what had to be repaired on the way.
#[derive(Debug, Clone)]
pub struct LoadedConflict {
    pub model: ConflictModel,
    /// The file's coalitions did not partition the decision makers and were
    /// replaced by singletons.
    pub coalitions_reset: bool,
    /// Infeasible conditions dropped as duplicates.
    pub duplicate_infeasibles: usize,
}

/// Parse conflict definition JSON.
pub fn parse_definition(json: &str) -> Result<ConflictDefinition, InterchangeError> {
    Ok(serde_json::from_str(json)?)
}

/// Parse conflict definition JSON and build the model in one step.
pub fn load_conflict(json: &str) -> Result<LoadedConflict, InterchangeError> {
    build_model(&parse_definition(json)?)
}

/// Build a model from a definition.
///
/// Options are regrouped by decision maker after loading, so manual
/// rankings (which name states by their position in the file's feasible
/// state order) are translated to the regrouped order before they are set.
pub fn build_model(def: &ConflictDefinition) -> Result<LoadedConflict, InterchangeError> {
    let mut model = ConflictModel::new();

    let mut ids = Vec::with_capacity(def.options.len());
    for opt in &def.options {
        ids.push(model.add_option(opt.name.clone(), opt.permitted_direction)?);
    }

    for dm_def in &def.decision_makers {
        let dm = model.add_decision_maker(dm_def.name.clone());
        for &idx in &dm_def.options {
            let id = resolve_option(&ids, idx, || format!("decision maker '{}'", dm_def.name))?;
            model.assign_option(dm, id)?;
        }
        let preferences = dm_def
            .preferences
            .iter()
            .map(|c| condition_from_def(c, &ids, &format!("preference of '{}'", dm_def.name)))
            .collect::<Result<Vec<_>, _>>()?;
        model.set_preferences(dm, preferences)?;
    }

    let mut duplicate_infeasibles = 0;
    for cond in &def.infeasibles {
        let cond = condition_from_def(cond, &ids, "infeasible condition")?;
        if !model.add_infeasible(cond)? {
            duplicate_infeasibles += 1;
        }
    }

    let file_feasibles = model.feasibles().decimal.clone();
    model.reorder_options_by_dm();

    let mut coalitions_reset = false;
    if let Some(coalitions) = &def.coalitions {
        let groups: Vec<Vec<usize>> = coalitions.iter().map(CoalitionDef::members).collect();
        if let Err(e) = model.set_coalitions(groups) {
            warn!(error = %e, "coalitions failed to validate; resetting to singletons");
            model.reset_coalitions();
            coalitions_reset = true;
        }
    }

    if def.use_manual_preference_ranking {
        for (dm, dm_def) in def.decision_makers.iter().enumerate() {
            if let Some(entries) = &dm_def.preference_ranking {
                let ranking = ranking_from_def(
                    entries,
                    &dm_def.name,
                    &file_feasibles,
                    &ids,
                    &model,
                )?;
                model.set_ranking(dm, ranking)?;
            }
        }
    }
    // Last, so no later recalculation switches it back off.
    model.set_use_manual_ranking(def.use_manual_preference_ranking);

    info!(
        options = model.options().len(),
        decision_makers = model.decision_makers().len(),
        feasible = model.feasibles().len(),
        "conflict loaded"
    );

    Ok(LoadedConflict {
        model,
        coalitions_reset,
        duplicate_infeasibles,
    })
}

fn resolve_option(
    ids: &[OptionId],
    index: usize,
    context: impl FnOnce() -> String,
) -> Result<OptionId, InterchangeError> {
    ids.get(index)
        .copied()
        .ok_or_else(|| InterchangeError::UnknownOption {
            context: context(),
            index,
            count: ids.len(),
        })
}

fn terms_from_def(
    terms: &[TermDef],
    ids: &[OptionId],
    context: &str,
) -> Result<Vec<(OptionId, bool)>, InterchangeError> {
    terms
        .iter()
        .map(|(idx, taken)| Ok((resolve_option(ids, *idx, || context.to_string())?, bool::from(*taken))))
        .collect()
}

fn condition_from_def(
    def: &ConditionDef,
    ids: &[OptionId],
    context: &str,
) -> Result<Condition, InterchangeError> {
    Ok(match def {
        ConditionDef::Simple(terms) => Condition::simple(terms_from_def(terms, ids, context)?),
        ConditionDef::Compound(c) => Condition::compound(
            c.members
                .iter()
                .map(|m| terms_from_def(m, ids, context))
                .collect::<Result<Vec<_>, _>>()?,
        ),
    })
}

/// Re-encode a decimal state written under the file's option order into
/// the model's current option order.
fn remap_state(decimal: u64, file_order: &[OptionId], options: &OptionList) -> u64 {
    file_order
        .iter()
        .enumerate()
        .filter(|(i, _)| decimal & (1u64 << i) != 0)
        .filter_map(|(_, id)| options.weight(*id))
        .sum()
}

fn ranking_from_def(
    entries: &[RankingEntryDef],
    dm: &str,
    file_feasibles: &[u64],
    file_order: &[OptionId],
    model: &ConflictModel,
) -> Result<Ranking, InterchangeError> {
    let to_index = |ordered: usize| -> Result<usize, InterchangeError> {
        let unknown = || InterchangeError::UnknownRankedState {
            dm: dm.to_string(),
            state: ordered,
            count: file_feasibles.len(),
        };
        let decimal = ordered
            .checked_sub(1)
            .and_then(|i| file_feasibles.get(i))
            .ok_or_else(unknown)?;
        model
            .feasibles()
            .index_of(remap_state(*decimal, file_order, model.options()))
            .ok_or_else(unknown)
    };

    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        out.push(match entry {
            RankingEntryDef::State(s) => RankEntry::State(to_index(*s)?),
            RankingEntryDef::Tied(group) => RankEntry::Tied(
                group
                    .iter()
                    .map(|s| to_index(*s))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        });
    }
    debug!(dm, entries = out.len(), "manual ranking loaded");
    Ok(Ranking(out))
}

fn terms_to_def(cond: &SimpleCondition, index: &HashMap<OptionId, usize>) -> Vec<TermDef> {
    cond.terms
        .iter()
        .filter_map(|(id, taken)| index.get(id).map(|i| (*i, Taken::from(*taken))))
        .collect()
}

fn condition_to_def(cond: &Condition, index: &HashMap<OptionId, usize>) -> ConditionDef {
    match cond {
        Condition::Simple(c) => ConditionDef::Simple(terms_to_def(c, index)),
        Condition::Compound(members) => ConditionDef::Compound(CompoundConditionDef {
            compound: true,
            members: members.iter().map(|m| terms_to_def(m, index)).collect(),
        }),
    }
}

fn ranking_to_def(ranking: &Ranking) -> Vec<RankingEntryDef> {
    ranking
        .entries()
        .iter()
        .map(|e| match e {
            RankEntry::State(s) => RankingEntryDef::State(s + 1),
            RankEntry::Tied(g) => RankingEntryDef::Tied(g.iter().map(|s| s + 1).collect()),
        })
        .collect()
}

/// Export a model as a definition.
///
/// Payoffs are included when the model currently validates; the manual
/// ranking is written only in manual ranking mode.
pub fn to_definition(model: &ConflictModel) -> ConflictDefinition {
    let index: HashMap<OptionId, usize> = model
        .options()
        .iter()
        .enumerate()
        .map(|(i, o)| (o.id, i))
        .collect();
    let snapshot = model.snapshot().ok();

    let decision_makers = model
        .decision_makers()
        .iter()
        .enumerate()
        .map(|(i, dm)| DecisionMakerDef {
            name: dm.name.clone(),
            options: dm.options.iter().filter_map(|id| index.get(id).copied()).collect(),
            preferences: dm
                .preferences
                .iter()
                .map(|c| condition_to_def(c, &index))
                .collect(),
            preference_ranking: if model.use_manual_ranking() {
                dm.ranking.as_ref().map(ranking_to_def)
            } else {
                None
            },
            payoffs: snapshot
                .as_ref()
                .and_then(|s| s.decision_makers().get(i))
                .map(|p| p.payoffs.clone()),
        })
        .collect();

    let groups = model.coalition_groups();
    let coalitions_full = groups
        .iter()
        .map(|group| {
            let members: Vec<_> = group
                .iter()
                .filter_map(|m| model.decision_makers().get(*m))
                .collect();
            let mut options: Vec<usize> = members
                .iter()
                .flat_map(|dm| dm.options.iter().filter_map(|id| index.get(id).copied()))
                .collect();
            options.sort_unstable();
            options.dedup();
            CoalitionSummaryDef {
                name: members
                    .iter()
                    .map(|dm| dm.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                options,
            }
        })
        .collect();

    ConflictDefinition {
        use_manual_preference_ranking: model.use_manual_ranking(),
        options: model
            .options()
            .iter()
            .map(|o| OptionDef {
                name: o.name.clone(),
                permitted_direction: o.permitted_direction,
            })
            .collect(),
        decision_makers,
        infeasibles: model
            .infeasibles()
            .iter()
            .map(|c| condition_to_def(c, &index))
            .collect(),
        coalitions: Some(
            groups
                .into_iter()
                .map(|g| match g.as_slice() {
                    [single] => CoalitionDef::Single(*single),
                    _ => CoalitionDef::Group(g),
                })
                .collect(),
        ),
        coalitions_full,
        program: Some(PROGRAM_NAME.to_string()),
        version: Some(PROGRAM_VERSION.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmcr_core::{ModelError, Party};

    const PRISONERS: &str = r#"{
        "useManualPreferenceRanking": false,
        "options": [
            {"name": "A confesses", "permittedDirection": "both"},
            {"name": "B confesses", "permittedDirection": "both"}
        ],
        "decisionMakers": [
            {"name": "A", "options": [0], "preferences": [[[1, "N"]], [[0, "Y"]]]},
            {"name": "B", "options": [1], "preferences": [[[0, "N"]], [[1, "Y"]]]}
        ],
        "infeasibles": []
    }"#;

    #[test]
    fn test_load_priorities() {
        let loaded = load_conflict(PRISONERS).unwrap();
        assert!(!loaded.coalitions_reset);
        let snap = loaded.model.snapshot().unwrap();
        assert_eq!(snap.state_count(), 4);
        // A: B silent (2) + A confesses (1). NN=2, YN=3, NY=0, YY=1
        assert_eq!(snap.decision_makers()[0].payoffs, vec![2, 3, 0, 1]);
        assert_eq!(snap.effective_parties(true).len(), 2);
    }

    #[test]
    fn test_bad_coalitions_reset() {
        let mut def = parse_definition(PRISONERS).unwrap();
        def.coalitions = Some(vec![CoalitionDef::Single(0)]);
        let loaded = build_model(&def).unwrap();
        assert!(loaded.coalitions_reset);
        assert_eq!(loaded.model.coalition_groups(), vec![vec![0], vec![1]]);
    }

    #[test]
    fn test_unknown_option_index() {
        let mut def = parse_definition(PRISONERS).unwrap();
        def.decision_makers[0].options = vec![5];
        match build_model(&def).unwrap_err() {
            InterchangeError::UnknownOption { index, count, .. } => {
                assert_eq!(index, 5);
                assert_eq!(count, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_manual_ranking_survives_option_regrouping() {
        // Option 0 is uncontrolled, so regrouping moves "b" to the front and
        // every state's decimal value changes.
        let json = r#"{
            "useManualPreferenceRanking": true,
            "options": [
                {"name": "free", "permittedDirection": "both"},
                {"name": "b", "permittedDirection": "both"}
            ],
            "decisionMakers": [
                {"name": "B", "options": [1], "preferences": [], "preferenceRanking": [2, 4, [1, 3]]}
            ],
            "infeasibles": []
        }"#;
        let loaded = load_conflict(json).unwrap();
        let model = &loaded.model;
        assert!(model.use_manual_ranking());
        assert_eq!(model.options().at(0).unwrap().name, "b");
        let snap = model.snapshot().unwrap();
        let b = &snap.decision_makers()[0];
        // File state 2 = "free" taken (YN under file order) -> NY now -> index 2.
        // File state 4 = YY -> index 3. Tied: NN -> 0, NY(file) -> YN now -> 1.
        assert_eq!(
            b.ranking,
            Ranking(vec![
                RankEntry::State(2),
                RankEntry::State(3),
                RankEntry::Tied(vec![0, 1]),
            ])
        );
        assert_eq!(b.payoff_label(2), "4");
    }

    #[test]
    fn test_ranked_state_out_of_range() {
        let json = r#"{
            "useManualPreferenceRanking": true,
            "options": [{"name": "a", "permittedDirection": "both"}],
            "decisionMakers": [{"name": "A", "options": [0], "preferences": [], "preferenceRanking": [0, 1]}],
            "infeasibles": []
        }"#;
        assert!(matches!(
            load_conflict(json).unwrap_err(),
            InterchangeError::UnknownRankedState { state: 0, .. }
        ));
    }

    #[test]
    fn test_too_many_preference_statements() {
        let options: Vec<_> = (0..7)
            .map(|i| serde_json::json!({"name": format!("o{i}"), "permittedDirection": "both"}))
            .collect();
        let mut preferences = Vec::new();
        for i in 0..7 {
            for j in i + 1..7 {
                for (x, y) in [("Y", "Y"), ("Y", "N"), ("N", "Y"), ("N", "N")] {
                    preferences.push(serde_json::json!([[i, x], [j, y]]));
                }
            }
        }
        preferences.truncate(64);
        let json = serde_json::json!({
            "useManualPreferenceRanking": false,
            "options": options,
            "decisionMakers": [
                {"name": "A", "options": [0, 1, 2, 3, 4, 5, 6], "preferences": preferences}
            ],
            "infeasibles": []
        })
        .to_string();
        match load_conflict(&json).unwrap_err() {
            InterchangeError::Model(ModelError::TooManyPreferences { dm, count, max }) => {
                assert_eq!(dm, "A");
                assert_eq!(count, 64);
                assert_eq!(max, 63);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_export_round_trip() {
        let loaded = load_conflict(PRISONERS).unwrap();
        let def = to_definition(&loaded.model);
        assert_eq!(def.program.as_deref(), Some(PROGRAM_NAME));
        assert_eq!(def.decision_makers[1].payoffs, Some(vec![2, 0, 3, 1]));
        assert_eq!(def.coalitions_full[0].name, "A");
        let reloaded = build_model(&def).unwrap();
        assert_eq!(
            reloaded.model.snapshot().unwrap().decision_makers()[1].payoffs,
            vec![2, 0, 3, 1]
        );
    }
}
