use std::path::Path;
use std::process;

use gmcr_analyze::{InverseRequest, InverseSolver, StabilityConcept, VaryRange};
use gmcr_core::{ConflictSnapshot, RankEntry, Ranking};

use super::{load_config, load_conflict_file, print_json, state_index};
use crate::{report_error, Globals, OutputFormat};

pub(crate) struct InverseOptions<'a> {
    pub file: &'a Path,
    pub target: usize,
    pub vary: &'a [String],
    pub symbolic: bool,
    pub filter: Option<&'a str>,
    pub globals: &'a Globals,
}

/// Parse `DM:START:END` (1-based, inclusive) into a decision maker index
/// and a 0-based half-open range. The decision maker is a name or a
/// 1-based number; names may themselves contain colons.
fn parse_vary(spec: &str, snapshot: &ConflictSnapshot) -> Result<(usize, VaryRange), String> {
    let mut parts = spec.rsplitn(3, ':');
    let (Some(end), Some(start), Some(dm)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("invalid vary range '{}': expected DM:START:END", spec));
    };
    let start: usize = start
        .trim()
        .parse()
        .map_err(|_| format!("invalid start position '{}' in '{}'", start, spec))?;
    let end: usize = end
        .trim()
        .parse()
        .map_err(|_| format!("invalid end position '{}' in '{}'", end, spec))?;
    if start == 0 || end < start {
        return Err(format!(
            "invalid vary range '{}': positions are 1-based and START must not exceed END",
            spec
        ));
    }
    let dms = snapshot.decision_makers();
    let dm = dm.trim();
    let index = match dm.parse::<usize>() {
        Ok(n) if n >= 1 && n <= dms.len() => n - 1,
        _ => dms
            .iter()
            .position(|d| d.name == dm)
            .ok_or_else(|| format!("no decision maker named '{}'", dm))?,
    };
    Ok((index, VaryRange::new(start - 1, end)))
}

fn parse_filter(filter: &str) -> Result<Vec<StabilityConcept>, String> {
    filter
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse())
        .collect()
}

fn ranking_text(ranking: &Ranking) -> String {
    let entries: Vec<String> = ranking
        .entries()
        .iter()
        .map(|e| match e {
            RankEntry::State(s) => (s + 1).to_string(),
            RankEntry::Tied(group) => format!(
                "[{}]",
                group
                    .iter()
                    .map(|s| (s + 1).to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        })
        .collect();
    entries.join(" ")
}

pub(crate) fn cmd_inverse(opts: InverseOptions<'_>) {
    let globals = opts.globals;
    let (output, quiet) = (globals.output, globals.quiet);
    let loaded = load_conflict_file(opts.file, globals);
    let config = load_config(globals);

    let snapshot = match loaded.model.snapshot() {
        Ok(s) => s,
        Err(e) => {
            report_error(&format!("model error: {}", e), output, quiet);
            process::exit(1);
        }
    };
    let target = state_index(opts.target, snapshot.state_count(), output, quiet);

    let mut vary = vec![VaryRange::default(); snapshot.decision_makers().len()];
    for spec in opts.vary {
        match parse_vary(spec, &snapshot) {
            Ok((dm, range)) => vary[dm] = range,
            Err(msg) => {
                report_error(&msg, output, quiet);
                process::exit(1);
            }
        }
    }
    let concepts = match opts.filter.map(parse_filter) {
        None => Vec::new(),
        Some(Ok(c)) => c,
        Some(Err(msg)) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let request = InverseRequest {
        target: Some(target),
        vary,
    };
    let solver = match InverseSolver::new(&snapshot, &request, &config) {
        Ok(s) => s,
        Err(e) => {
            report_error(&format!("inverse error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    if opts.symbolic {
        run_symbolic(&solver, &concepts, output, quiet);
    } else {
        run_enumeration(&solver, &concepts, output, quiet);
    }
}

fn run_enumeration(
    solver: &InverseSolver,
    concepts: &[StabilityConcept],
    output: OutputFormat,
    quiet: bool,
) {
    let results = match solver.solve() {
        Ok(r) => r,
        Err(e) => {
            report_error(&format!("inverse error: {}", e), output, quiet);
            process::exit(1);
        }
    };
    let (matching, counts) = results.filter(concepts);
    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "target": results.target + 1,
            "candidates": results.candidates.len(),
            "filter": concepts,
            "counts": counts,
            "matching": matching,
        })),
        OutputFormat::Text => {
            let total = results.candidates.len();
            println!(
                "Target state {}: {} candidate ranking combination(s)",
                results.target + 1,
                total
            );
            for concept in StabilityConcept::ALL {
                println!("  {}: stable in {} of {}", concept, counts.get(concept), total);
            }
            println!();
            let filter_text = if concepts.is_empty() {
                "all candidates".to_string()
            } else {
                concepts
                    .iter()
                    .map(|c| c.label())
                    .collect::<Vec<_>>()
                    .join(" + ")
            };
            println!("Matching {} ({}):", filter_text, matching.len());
            let names = solver.decision_maker_names();
            for candidate in matching {
                let flags: Vec<&str> = StabilityConcept::ALL
                    .iter()
                    .filter(|c| candidate.is(**c))
                    .map(|c| c.label())
                    .collect();
                println!(
                    "  #{} [{}]",
                    candidate.index + 1,
                    if flags.is_empty() {
                        "unstable".to_string()
                    } else {
                        flags.join(", ")
                    }
                );
                for (name, ranking) in names.iter().zip(&candidate.rankings) {
                    println!("      {}: {}", name, ranking_text(ranking));
                }
            }
        }
    }
}

fn run_symbolic(
    solver: &InverseSolver,
    concepts: &[StabilityConcept],
    output: OutputFormat,
    quiet: bool,
) {
    let selected: Vec<StabilityConcept> = if concepts.is_empty() {
        StabilityConcept::ALL.to_vec()
    } else {
        concepts.to_vec()
    };
    let analyses = match selected
        .iter()
        .map(|c| solver.symbolic(*c))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(a) => a,
        Err(e) => {
            report_error(&format!("inverse error: {}", e), output, quiet);
            process::exit(1);
        }
    };
    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => print_json(&analyses),
        OutputFormat::Text => {
            for analysis in &analyses {
                let listing = match analysis.concept {
                    StabilityConcept::Nash => Ok(Some(solver.nash_conditions())),
                    StabilityConcept::Gmr => solver.gmr_conditions().map(Some),
                    StabilityConcept::Seq => solver.seq_conditions().map(Some),
                    _ => Ok(None),
                };
                println!("== {} ==", analysis.concept);
                match listing {
                    Ok(Some(text)) => println!("{}\n", text),
                    Ok(None) => {}
                    Err(e) => {
                        report_error(&format!("inverse error: {}", e), output, quiet);
                        process::exit(1);
                    }
                }
                println!("{}", analysis.render(solver.target()));
            }
        }
    }
}
