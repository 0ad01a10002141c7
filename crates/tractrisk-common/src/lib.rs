//! tractrisk-common - Shared types, errors, and scoring profiles used across all tractrisk crates.

pub mod error;
pub mod entities;
pub mod index_config;

// Re-export commonly used types
pub use error::{Result, TractRiskError};
pub use entities::{Dataset, FieldValue, GeometryRegistry, RawTable, RegistryEntry};
pub use index_config::{DuplicatePolicy, IndexConfig, MissingValuePolicy, OutputConfig, OutputFormat, ScoringOptions};
