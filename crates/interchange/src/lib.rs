//! gmcr-interchange: the conflict definition file format.
//!
//! Provides typed serde structs for the conflict definition JSON and the
//! conversions between a definition and a [`gmcr_core::ConflictModel`].
//! Every consumer (CLI, analysis export) reads and writes conflicts through
//! this crate.

pub mod convert;
pub mod error;
pub mod types;

pub use convert::{build_model, load_conflict, parse_definition, to_definition, LoadedConflict};
pub use error::InterchangeError;
pub use types::*;
