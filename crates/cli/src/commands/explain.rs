use std::path::Path;
use std::process;

use gmcr_analyze::{LogicalSolver, StabilityConcept};

use super::{load_config, load_conflict_file, print_json, resolve_party, state_index};
use crate::{report_error, Globals, OutputFormat};

pub(crate) fn cmd_explain(file: &Path, party: &str, state: usize, concept: &str, globals: &Globals) {
    let (output, quiet) = (globals.output, globals.quiet);
    let concept: StabilityConcept = match concept.parse() {
        Ok(c) => c,
        Err(e) => {
            report_error(&e, output, quiet);
            process::exit(1);
        }
    };

    let loaded = load_conflict_file(file, globals);
    let config = load_config(globals);
    let solver = match LogicalSolver::for_model(&loaded.model, &config) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("analysis error: {}", e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let party = resolve_party(solver.matrices(), party, output, quiet);
    let state = state_index(state, solver.matrices().state_count(), output, quiet);

    match solver.explain(concept, party, state) {
        Ok(explanation) => {
            if quiet {
                return;
            }
            match output {
                OutputFormat::Json => print_json(&explanation),
                OutputFormat::Text => {
                    println!(
                        "{}: {}",
                        concept,
                        if explanation.check.stable { "stable" } else { "unstable" }
                    );
                    println!();
                    print!("{}", explanation.narration);
                }
            }
        }
        Err(e) => {
            let msg = format!("explain error: {}", e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}
