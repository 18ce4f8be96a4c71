use std::path::Path;
use std::process;

use gmcr_analyze::{state_snippet, ReachabilityMatrices};
use gmcr_core::Party;

use super::{load_config, load_conflict_file, print_json, resolve_party, state_index};
use crate::{report_error, Globals, OutputFormat};

pub(crate) fn cmd_reachable(file: &Path, party: &str, state: usize, globals: &Globals) {
    let (output, quiet) = (globals.output, globals.quiet);
    let loaded = load_conflict_file(file, globals);
    let config = load_config(globals);

    let snapshot = match loaded.model.snapshot() {
        Ok(s) => s,
        Err(e) => {
            report_error(&format!("model error: {}", e), output, quiet);
            process::exit(1);
        }
    };
    let matrices = match ReachabilityMatrices::build(&snapshot, &config) {
        Ok(m) => m,
        Err(e) => {
            report_error(&format!("analysis error: {}", e), output, quiet);
            process::exit(1);
        }
    };
    let party = resolve_party(&matrices, party, output, quiet);
    let state = state_index(state, matrices.state_count(), output, quiet);

    let result = matrices.reachable(party, state).and_then(|targets| {
        let improvements = matrices.unilateral_improvements(party, state, None)?;
        Ok((targets.to_vec(), improvements))
    });
    let (targets, improvements) = match result {
        Ok(r) => r,
        Err(e) => {
            report_error(&format!("analysis error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    if quiet {
        return;
    }
    let name = matrices.parties()[party].name().to_string();
    match output {
        OutputFormat::Json => {
            let moves: Vec<serde_json::Value> = targets
                .iter()
                .map(|&t| {
                    serde_json::json!({
                        "state": t + 1,
                        "decimal": matrices.feasibles().decimal[t],
                        "yn": snapshot.yn(t),
                        "improvement": improvements.contains(&t),
                    })
                })
                .collect();
            print_json(&serde_json::json!({
                "party": name,
                "from": state + 1,
                "reachable": moves,
            }));
        }
        OutputFormat::Text => {
            println!(
                "{} can move from {}:",
                name,
                state_snippet(&matrices, party, state)
            );
            if targets.is_empty() {
                println!("  (no moves)");
            }
            for t in &targets {
                println!(
                    "  {} {}{}",
                    state_snippet(&matrices, party, *t),
                    snapshot.yn(*t),
                    if improvements.contains(t) { "  UI" } else { "" }
                );
            }
        }
    }
}
