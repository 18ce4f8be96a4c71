use std::path::Path;
use std::process;

use gmcr_analyze::{visualizer_export, ReachabilityMatrices};

use super::{load_config, load_conflict_file};
use crate::{report_error, Globals, OutputFormat};

pub(crate) fn cmd_export(file: &Path, out: Option<&Path>, globals: &Globals) {
    let (output, quiet) = (globals.output, globals.quiet);
    let loaded = load_conflict_file(file, globals);
    let config = load_config(globals);

    let export = loaded
        .model
        .snapshot()
        .map_err(gmcr_analyze::AnalysisError::from)
        .and_then(|snapshot| ReachabilityMatrices::build(&snapshot, &config))
        .and_then(|matrices| visualizer_export(&loaded.model, &matrices));
    let export = match export {
        Ok(e) => e,
        Err(e) => {
            report_error(&format!("export error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let json = match serde_json::to_string_pretty(&export) {
        Ok(j) => j,
        Err(e) => {
            report_error(&format!("serialization error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    match out {
        None => println!("{}", json),
        Some(path) => {
            if let Err(e) = std::fs::write(path, &json) {
                let msg = format!("error writing '{}': {}", path.display(), e);
                report_error(&msg, output, quiet);
                process::exit(1);
            }
            if !quiet {
                match output {
                    OutputFormat::Text => println!(
                        "Exported {} state(s) to {}",
                        export.nodes.len(),
                        path.display()
                    ),
                    OutputFormat::Json => println!(
                        "{}",
                        serde_json::json!({
                            "output_file": path.display().to_string(),
                            "states": export.nodes.len(),
                        })
                    ),
                }
            }
        }
    }
}
