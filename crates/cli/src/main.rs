mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub(crate) struct Globals {
    pub output: OutputFormat,
    pub quiet: bool,
    pub config: Option<PathBuf>,
    pub no_coalitions: bool,
}

/// Conflict analysis with the Graph Model for Conflict Resolution.
#[derive(Parser)]
#[command(
    name = "gmcr",
    version,
    about = "Graph Model for Conflict Resolution analysis"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Analysis configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Analyze every decision maker alone, ignoring coalitions
    #[arg(long, global = true)]
    no_coalitions: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the equilibria of a conflict under every stability concept
    Equilibria {
        /// Path to the conflict definition JSON file
        file: PathBuf,
    },

    /// Explain why a state is or is not stable for one party
    Explain {
        /// Path to the conflict definition JSON file
        file: PathBuf,
        /// Party name, or its 1-based number
        #[arg(long)]
        party: String,
        /// 1-based state number
        #[arg(long)]
        state: usize,
        /// Stability concept (nash, gmr, seq, sim, smr)
        #[arg(long, default_value = "nash")]
        concept: String,
    },

    /// List the states a party can reach from a state in one move
    Reachable {
        /// Path to the conflict definition JSON file
        file: PathBuf,
        /// Party name, or its 1-based number
        #[arg(long)]
        party: String,
        /// 1-based state number
        #[arg(long)]
        state: usize,
    },

    /// Export the conflict with reachability data for the graph visualizer
    Export {
        /// Path to the conflict definition JSON file
        file: PathBuf,
        /// Output file (default: stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Find the preference rankings that make a target state an equilibrium
    Inverse {
        /// Path to the conflict definition JSON file
        file: PathBuf,
        /// 1-based target state number
        #[arg(long)]
        target: usize,
        /// Ranking positions a decision maker may reorder, as DM:START:END
        /// (1-based, inclusive). Repeat per decision maker.
        #[arg(long)]
        vary: Vec<String>,
        /// Derive the requirements symbolically instead of enumerating
        #[arg(long)]
        symbolic: bool,
        /// Comma-separated concepts the target must satisfy (nash,gmr,seq,sim,smr)
        #[arg(long)]
        filter: Option<String>,
    },

    /// Derive the preference conditions for desired outcomes
    Goals {
        /// Path to the conflict definition JSON file
        file: PathBuf,
        /// STATE:stable or STATE:unstable (1-based). Repeat per goal.
        #[arg(long = "goal", required = true)]
        goals: Vec<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("GMCR_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let globals = Globals {
        output: cli.output,
        quiet: cli.quiet,
        config: cli.config,
        no_coalitions: cli.no_coalitions,
    };

    match cli.command {
        Commands::Equilibria { file } => {
            commands::equilibria::cmd_equilibria(&file, &globals);
        }
        Commands::Explain {
            file,
            party,
            state,
            concept,
        } => {
            commands::explain::cmd_explain(&file, &party, state, &concept, &globals);
        }
        Commands::Reachable { file, party, state } => {
            commands::reachable::cmd_reachable(&file, &party, state, &globals);
        }
        Commands::Export { file, out } => {
            commands::export::cmd_export(&file, out.as_deref(), &globals);
        }
        Commands::Inverse {
            file,
            target,
            vary,
            symbolic,
            filter,
        } => {
            commands::inverse::cmd_inverse(commands::inverse::InverseOptions {
                file: &file,
                target,
                vary: &vary,
                symbolic,
                filter: filter.as_deref(),
                globals: &globals,
            });
        }
        Commands::Goals { file, goals } => {
            commands::goals::cmd_goals(&file, &goals, &globals);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
