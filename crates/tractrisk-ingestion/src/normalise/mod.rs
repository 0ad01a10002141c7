//! Identifier normalisation.
//!
//! Independently sourced tables spell the same tract differently
//! (`1400000US21111012300`, ` 21111012300 `, `21111012300.0`) and label
//! their columns differently (`Tract ID`, `tractid`). Both are reduced to
//! one canonical form here before anything is joined.

pub mod field_name;
pub mod tract_id;

pub use field_name::{dedupe_names, normalise_field_name};
pub use tract_id::{IdentifierNormaliser, CENSUS_TRACT_PREFIX, DEFAULT_JOIN_KEY};
