pub(crate) mod equilibria;
pub(crate) mod explain;
pub(crate) mod export;
pub(crate) mod goals;
pub(crate) mod inverse;
pub(crate) mod reachable;

use std::path::Path;
use std::process;

use gmcr_analyze::{AnalysisConfig, ReachabilityMatrices};
use gmcr_core::Party;
use gmcr_interchange::LoadedConflict;
use tracing::{debug, warn};

use crate::{report_error, Globals, OutputFormat};

/// Read and load a conflict definition file, exiting on failure.
pub(crate) fn load_conflict_file(file: &Path, globals: &Globals) -> LoadedConflict {
    let json = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading '{}': {}", file.display(), e);
            report_error(&msg, globals.output, globals.quiet);
            process::exit(1);
        }
    };
    match gmcr_interchange::load_conflict(&json) {
        Ok(loaded) => {
            if loaded.coalitions_reset {
                warn!(file = %file.display(), "coalitions reset to singletons");
            }
            loaded
        }
        Err(e) => {
            let msg = format!("error loading conflict '{}': {}", file.display(), e);
            report_error(&msg, globals.output, globals.quiet);
            process::exit(1);
        }
    }
}

/// The analysis configuration from `--config`, with flag overrides applied.
pub(crate) fn load_config(globals: &Globals) -> AnalysisConfig {
    let mut config = match &globals.config {
        Some(path) => match AnalysisConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                report_error(&e.to_string(), globals.output, globals.quiet);
                process::exit(1);
            }
        },
        None => AnalysisConfig::default(),
    };
    if globals.no_coalitions {
        config.use_coalitions = false;
    }
    debug!(?config, "analysis configuration");
    config
}

/// Resolve a party given by name or 1-based number.
pub(crate) fn resolve_party(
    matrices: &ReachabilityMatrices,
    party: &str,
    output: OutputFormat,
    quiet: bool,
) -> usize {
    let resolved = match party.parse::<usize>() {
        Ok(n) if n >= 1 => matrices.party(n - 1).map(|_| n - 1),
        _ => matrices.party_index(party),
    };
    match resolved {
        Ok(index) => index,
        Err(e) => {
            let names: Vec<&str> = matrices.parties().iter().map(|p| p.name()).collect();
            let msg = format!("{} (parties: {})", e, names.join("; "));
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

/// Convert a 1-based state number to an index, exiting if out of range.
pub(crate) fn state_index(state: usize, count: usize, output: OutputFormat, quiet: bool) -> usize {
    if state == 0 || state > count {
        let msg = format!(
            "state {} is out of range (conflict has {} feasible states)",
            state, count
        );
        report_error(&msg, output, quiet);
        process::exit(1);
    }
    state - 1
}

/// Join 1-based state numbers, or `none`.
pub(crate) fn state_list(states: &[usize]) -> String {
    if states.is_empty() {
        return "none".to_string();
    }
    states
        .iter()
        .map(|s| (s + 1).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
    println!("{}", json);
}
