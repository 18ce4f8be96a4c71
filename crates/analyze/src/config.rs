//! Analysis configuration, read from TOML.
//!
//! ```toml
//! use_coalitions = true
//! max_sanction_depth = 2
//! max_candidates = 1000000
//! parallel = true
//! ```

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MAX_CANDIDATES: u64 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Analyze coalitions as single parties. When off, every decision maker
    /// stands alone.
    pub use_coalitions: bool,
    /// Cap on the number of opponent moves in a sanction chain. Unset means
    /// one move per opponent.
    pub max_sanction_depth: Option<usize>,
    /// Largest number of candidate rankings the inverse solver will evaluate.
    pub max_candidates: u64,
    /// Spread per-party and per-candidate work over the rayon pool.
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            use_coalitions: true,
            max_sanction_depth: None,
            max_candidates: DEFAULT_MAX_CANDIDATES,
            parallel: true,
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, AnalysisError> {
        toml::from_str(content).map_err(|e| AnalysisError::Config(e.to_string()))
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::Config(format!("could not read '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }
}
