//! Weighted aggregation: registry + datasets + weights → scored table.
//!
//! `aggregate` is a pure function of its inputs. It borrows everything
//! immutably, builds a fresh [`OutputTable`] and reports every non-fatal
//! data problem as a [`Diagnostic`] instead of failing. The only hard error
//! is a weighted column holding text.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};
use tractrisk_common::{Dataset, DuplicatePolicy, GeometryRegistry, IndexConfig, MissingValuePolicy, Result};
use tractrisk_ingestion::IdentifierNormaliser;

use crate::join::{duplicate_ids, keyed_rows, left_join, resolve_duplicates};
use crate::scorer::{composite_score, WeightedColumn};
use crate::table::OutputTable;
use crate::weights::WeightMap;

/// Knobs that shape a run besides the weights themselves.
#[derive(Debug, Clone, Default)]
pub struct AggregateOptions {
    pub normaliser: IdentifierNormaliser,
    pub missing_values: MissingValuePolicy,
    pub duplicates: DuplicatePolicy,
}

impl AggregateOptions {
    pub fn from_profile(profile: &IndexConfig, normaliser: IdentifierNormaliser) -> Self {
        Self {
            normaliser,
            missing_values: profile.scoring.missing_values,
            duplicates: profile.scoring.duplicates,
        }
    }
}

/// Why no tract could be scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    /// The weight map has no entries at all.
    EmptyWeightMap,
    /// Every weight is zero, negative or not finite.
    NoPositiveWeights,
    /// No positively weighted field exists in the joined table.
    NoMatchingColumns,
}

/// Non-fatal conditions met during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Dataset has no join key column; it was left out of the join.
    MissingJoinKey { dataset: String },
    /// Dataset repeats identifiers; `resolution` says what was done.
    DuplicateIdentifiers {
        dataset: String,
        ids: Vec<String>,
        resolution: DuplicatePolicy,
    },
    /// Dataset rows whose identifier is not a registry tract (or is blank).
    UnmatchedRows { dataset: String, count: usize },
    /// The composite score is undefined for every tract.
    NoValidWeightedColumns { reason: UndefinedReason },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingJoinKey { dataset } => {
                write!(f, "dataset '{dataset}' has no tract identifier column and was skipped")
            }
            Diagnostic::DuplicateIdentifiers { dataset, ids, resolution } => {
                let action = match resolution {
                    DuplicatePolicy::Reject => "dataset skipped",
                    DuplicatePolicy::KeepFirst => "kept first row",
                    DuplicatePolicy::Mean => "rows averaged",
                };
                write!(f, "dataset '{dataset}' repeats {} identifier(s) ({action})", ids.len())
            }
            Diagnostic::UnmatchedRows { dataset, count } => {
                write!(f, "{count} row(s) of dataset '{dataset}' match no tract")
            }
            Diagnostic::NoValidWeightedColumns { reason } => {
                write!(f, "no valid weighted columns ({reason:?}); risk index undefined")
            }
        }
    }
}

/// Whether the run produced scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScoreStatus {
    /// Scores computed from these columns (rows may still be unscored).
    Computed { columns: Vec<String> },
    /// No tract has a score.
    Undefined { reason: UndefinedReason },
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateOutcome {
    pub table: OutputTable,
    pub status: ScoreStatus,
    pub diagnostics: Vec<Diagnostic>,
}

impl AggregateOutcome {
    pub fn is_score_defined(&self) -> bool {
        matches!(self.status, ScoreStatus::Computed { .. })
    }

    /// Number of tracts that received a score.
    pub fn scored_count(&self) -> usize {
        self.table.rows().iter().filter(|r| r.risk_index.is_some()).count()
    }
}

/// Resolve the weight map against the joined table.
fn valid_columns(table: &OutputTable, weights: &WeightMap) -> std::result::Result<Vec<WeightedColumn>, UndefinedReason> {
    if weights.is_empty() {
        return Err(UndefinedReason::EmptyWeightMap);
    }
    if weights.active().next().is_none() {
        return Err(UndefinedReason::NoPositiveWeights);
    }

    let columns: Vec<WeightedColumn> = weights
        .active()
        .filter_map(|(name, weight)| match table.column_index(name) {
            Some(index) => Some(WeightedColumn {
                name: name.to_string(),
                index,
                weight,
            }),
            None => {
                debug!(field = name, "Weighted field not in joined table, ignored");
                None
            }
        })
        .collect();

    let total: f64 = columns.iter().map(|c| c.weight).sum();
    if columns.is_empty() || total == 0.0 {
        return Err(UndefinedReason::NoMatchingColumns);
    }
    Ok(columns)
}

/// Join `datasets` (in the given order) onto `registry` and score every
/// tract with the weighted mean of the fields in `weights`.
///
/// The output has exactly one row per registry entry, in registry order.
pub fn aggregate(
    registry: &GeometryRegistry,
    datasets: &[&Dataset],
    weights: &WeightMap,
    options: &AggregateOptions,
) -> Result<AggregateOutcome> {
    let mut table = OutputTable::from_registry(registry);
    let mut diagnostics = Vec::new();
    let join_key = options.normaliser.join_key.as_str();

    for dataset in datasets {
        let Some(key_idx) = dataset.column_index(join_key) else {
            warn!(dataset = %dataset.name, join_key, "Dataset skipped: no join key");
            diagnostics.push(Diagnostic::MissingJoinKey {
                dataset: dataset.name.clone(),
            });
            continue;
        };

        let keyed = keyed_rows(dataset, key_idx, &options.normaliser);
        let dups = duplicate_ids(&keyed.rows);
        if !dups.is_empty() {
            warn!(dataset = %dataset.name, duplicates = dups.len(), policy = ?options.duplicates, "Duplicate tract identifiers");
            diagnostics.push(Diagnostic::DuplicateIdentifiers {
                dataset: dataset.name.clone(),
                ids: dups,
                resolution: options.duplicates,
            });
        }
        let Some(rows) = resolve_duplicates(keyed.rows, options.duplicates) else {
            continue;
        };

        let report = left_join(&mut table, dataset, key_idx, &rows);
        for (from, to) in &report.renamed {
            debug!(dataset = %dataset.name, from = %from, to = %to, "Renamed colliding column");
        }
        let unmatched = report.unmatched + keyed.blank_keys;
        if unmatched > 0 {
            diagnostics.push(Diagnostic::UnmatchedRows {
                dataset: dataset.name.clone(),
                count: unmatched,
            });
        }
        debug!(dataset = %dataset.name, matched = report.matched, unmatched, columns = report.columns.len(), "Joined dataset");
    }

    let columns = match valid_columns(&table, weights) {
        Ok(columns) => columns,
        Err(reason) => {
            warn!(?reason, "Risk index undefined for all tracts");
            diagnostics.push(Diagnostic::NoValidWeightedColumns { reason });
            return Ok(AggregateOutcome {
                table,
                status: ScoreStatus::Undefined { reason },
                diagnostics,
            });
        }
    };

    for row in table.rows_mut() {
        row.risk_index = composite_score(&row.tract_id, &row.values, &columns, options.missing_values)?;
    }

    let outcome = AggregateOutcome {
        status: ScoreStatus::Computed {
            columns: columns.iter().map(|c| c.name.clone()).collect(),
        },
        table,
        diagnostics,
    };
    info!(
        tracts = outcome.table.len(),
        scored = outcome.scored_count(),
        fields = columns.len(),
        "Risk index computed"
    );
    Ok(outcome)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
