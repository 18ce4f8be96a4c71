use std::path::Path;
use std::process;

use gmcr_analyze::{Goal, GoalSeeker};

use super::{load_config, load_conflict_file, print_json};
use crate::{report_error, Globals, OutputFormat};

/// Parse `STATE:stable` or `STATE:unstable` with a 1-based state.
fn parse_goal(spec: &str) -> Result<Goal, String> {
    let (state, kind) = spec
        .split_once(':')
        .ok_or_else(|| format!("invalid goal '{}': expected STATE:stable|unstable", spec))?;
    let state: usize = state
        .trim()
        .parse()
        .map_err(|_| format!("invalid goal state '{}'", state))?;
    if state == 0 {
        return Err(format!("invalid goal '{}': states are numbered from 1", spec));
    }
    let stable = match kind.trim().to_ascii_lowercase().as_str() {
        "stable" | "s" => true,
        "unstable" | "u" => false,
        other => {
            return Err(format!(
                "invalid goal kind '{}': expected stable or unstable",
                other
            ))
        }
    };
    Ok(Goal {
        state: state - 1,
        stable,
    })
}

pub(crate) fn cmd_goals(file: &Path, specs: &[String], globals: &Globals) {
    let (output, quiet) = (globals.output, globals.quiet);
    let goals = match specs.iter().map(|s| parse_goal(s)).collect::<Result<Vec<_>, _>>() {
        Ok(g) => g,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let loaded = load_conflict_file(file, globals);
    let config = load_config(globals);
    let result = GoalSeeker::for_model(&loaded.model, goals, &config)
        .and_then(|seeker| Ok((seeker.nash()?, seeker.seq()?)));
    let (nash, seq) = match result {
        Ok(r) => r,
        Err(e) => {
            report_error(&format!("goal error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => print_json(&serde_json::json!({ "nash": nash, "seq": seq })),
        OutputFormat::Text => {
            println!("{}", nash.render());
            println!("{}", seq.render());
        }
    }
}
