//! tractrisk-ranker - Composite risk index engine.
//! Joins normalised datasets onto the tract registry and scores every
//! tract with a weighted mean of the selected fields.

pub mod weights;
pub mod table;
pub mod join;
pub mod scorer;
pub mod aggregate;
pub mod export;

pub use aggregate::{aggregate, AggregateOptions, AggregateOutcome, Diagnostic, ScoreStatus, UndefinedReason};
pub use table::{OutputRow, OutputTable, RISK_INDEX_COLUMN, TRACT_ID_COLUMN};
pub use weights::WeightMap;
