use std::path::Path;
use std::process;

use gmcr_analyze::{AnalysisReport, FindingSeverity};

use super::{load_config, load_conflict_file, print_json, state_list};
use crate::{report_error, Globals, OutputFormat};

pub(crate) fn cmd_equilibria(file: &Path, globals: &Globals) {
    let loaded = load_conflict_file(file, globals);
    let config = load_config(globals);

    let report = match gmcr_analyze::analyze(&loaded, &config) {
        Ok(r) => r,
        Err(e) => {
            let msg = format!("analysis error: {}", e);
            report_error(&msg, globals.output, globals.quiet);
            process::exit(1);
        }
    };

    if globals.quiet {
        return;
    }
    match globals.output {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => print!("{}", render_text(&report)),
    }
}

fn render_text(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let (Some(model), Some(eq)) = (&report.model, &report.equilibria) else {
        return out;
    };

    out.push_str(&format!(
        "Conflict: {} option(s), {} part{} ({}), {} feasible state(s)\n\n",
        model.options.len(),
        model.parties.len(),
        if model.parties.len() == 1 { "y" } else { "ies" },
        model.parties.join("; "),
        model.state_count
    ));

    let label_width = model
        .options
        .iter()
        .map(|o| o.chars().count())
        .chain(eq.rows().iter().map(|(label, _)| label.len()))
        .chain(["Decimal".len()])
        .max()
        .unwrap_or(0);
    let cell_width = report
        .states
        .iter()
        .map(|s| s.decimal.to_string().len().max((s.index + 1).to_string().len()))
        .max()
        .unwrap_or(1)
        + 2;

    let row = |label: &str, cells: Vec<String>| -> String {
        let mut line = format!("{:<width$}", label, width = label_width);
        for cell in cells {
            line.push_str(&format!("{:>width$}", cell, width = cell_width));
        }
        line.push('\n');
        line
    };

    out.push_str(&row(
        "State",
        report.states.iter().map(|s| (s.index + 1).to_string()).collect(),
    ));
    out.push_str(&row(
        "Decimal",
        report.states.iter().map(|s| s.decimal.to_string()).collect(),
    ));
    for (i, option) in model.options.iter().enumerate() {
        out.push_str(&row(
            option,
            report
                .states
                .iter()
                .map(|s| s.yn.chars().nth(i).unwrap_or('?').to_string())
                .collect(),
        ));
    }
    out.push('\n');
    for (label, states) in eq.rows() {
        out.push_str(&row(
            label,
            states
                .iter()
                .map(|e| if *e { "E" } else { "." }.to_string())
                .collect(),
        ));
    }

    out.push_str("\nEquilibria:\n");
    for (label, states) in eq.rows() {
        let found: Vec<usize> = states
            .iter()
            .enumerate()
            .filter_map(|(s, e)| e.then_some(s))
            .collect();
        out.push_str(&format!("  {}: {}\n", label, state_list(&found)));
    }

    if !report.findings.is_empty() {
        out.push_str("\nFindings:\n");
        for finding in &report.findings {
            let severity = match finding.severity {
                FindingSeverity::Warning => "warning",
                FindingSeverity::Info => "info",
            };
            out.push_str(&format!("  [{}] {}\n", severity, finding.message));
        }
    }
    out
}
